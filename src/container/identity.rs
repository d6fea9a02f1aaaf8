//! Container naming scheme
//!
//! Every container managed by Ichijiku is named `{namespace}_{service}_{index}`.
//! The name is the only thing used to decide which service owns a container.

use crate::error::{IchijikuError, Result};
use regex::Regex;

/// Build the container name for a service replica
pub fn container_name(namespace: &str, service: &str, index: u32) -> String {
    format!("{}_{}_{}", namespace, service, index)
}

/// Reduce a directory name to the characters allowed in a namespace
pub fn sanitize_namespace(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Extract the replica index from the trailing `_`-separated segment of a name
pub fn parse_index(name: &str) -> Result<u32> {
    let suffix = name.rsplit('_').next().unwrap_or(name);
    let index: u32 = suffix.parse().map_err(|e: std::num::ParseIntError| {
        IchijikuError::InvalidIndex {
            name: name.to_string(),
            message: e.to_string(),
        }
    })?;

    if index == 0 {
        return Err(IchijikuError::InvalidIndex {
            name: name.to_string(),
            message: "index must be positive".to_string(),
        });
    }

    Ok(index)
}

/// Compiled matcher for the container names of one service
#[derive(Debug, Clone)]
pub struct IdentityPredicate {
    pattern: Regex,
}

impl IdentityPredicate {
    /// Compile the predicate for `{namespace}_{service}_<digits>`
    pub fn compile(namespace: &str, service: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"^{}_{}_[0-9]+$",
            regex::escape(namespace),
            regex::escape(service)
        ))
        .map_err(|e| IchijikuError::Config(format!("Invalid service name {}: {}", service, e)))?;

        Ok(Self { pattern })
    }

    /// Returns true if the container name belongs to this service
    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}
