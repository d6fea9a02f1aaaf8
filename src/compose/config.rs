//! Fig file configuration types

use crate::error::{IchijikuError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Fig file: a map of service name to service configuration
pub type FigConfig = HashMap<String, ServiceConfig>;

/// Service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Image name
    #[serde(default)]
    pub image: Option<String>,
    /// Build context path
    #[serde(default)]
    pub build: Option<String>,
    /// Command to run
    #[serde(default)]
    pub command: Option<CommandConfig>,
    /// Port publications
    #[serde(default)]
    pub ports: Vec<String>,
    /// Volume mounts
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Links to other services, `service` or `service:alias`
    #[serde(default)]
    pub links: Vec<String>,
    /// Environment variables
    #[serde(default)]
    pub environment: Option<EnvironmentConfig>,
    /// Network mode
    #[serde(default)]
    pub net: Option<String>,
    /// Working directory
    #[serde(default, alias = "workdir")]
    pub working_dir: Option<String>,
    /// Entrypoint
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Hostname
    #[serde(default)]
    pub hostname: Option<String>,
    /// User
    #[serde(default)]
    pub user: Option<String>,
    /// Memory limit
    #[serde(default)]
    pub mem_limit: Option<String>,
    /// Privileged mode
    #[serde(default)]
    pub privileged: bool,
    /// Extra flags passed to the runtime as-is
    #[serde(default)]
    pub run_flags: Option<CommandConfig>,
}

/// Command configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandConfig {
    /// Shell-quoted string
    Shell(String),
    /// Exec form array
    Exec(Vec<String>),
}

impl CommandConfig {
    /// Split into arguments, honoring shell quoting in the string form
    pub fn to_args(&self) -> Result<Vec<String>> {
        match self {
            CommandConfig::Shell(s) => shell_words::split(s).map_err(|e| {
                IchijikuError::Config(format!("Cannot split command '{}': {}", s, e))
            }),
            CommandConfig::Exec(arr) => Ok(arr.clone()),
        }
    }
}

/// Environment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvironmentConfig {
    /// Array of KEY=value strings
    Array(Vec<String>),
    /// Map of key to value
    Map(HashMap<String, Option<String>>),
}

impl EnvironmentConfig {
    /// Resolve to a sorted key/value map
    ///
    /// Array entries without `=` and map entries without a value are dropped.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        match self {
            EnvironmentConfig::Array(arr) => {
                for item in arr {
                    if let Some((key, value)) = item.split_once('=') {
                        env.insert(key.to_string(), value.to_string());
                    }
                }
            }
            EnvironmentConfig::Map(map) => {
                for (key, value) in map {
                    if let Some(v) = value {
                        env.insert(key.clone(), v.clone());
                    }
                }
            }
        }

        env
    }
}

/// Split a link entry into target service and alias
///
/// `db` links to service `db` under alias `db`; `db:database` uses alias
/// `database`.
pub fn parse_link(entry: &str) -> (&str, &str) {
    match entry.split_once(':') {
        Some((target, alias)) if !alias.is_empty() => (target, alias),
        Some((target, _)) => (target, target),
        None => (entry, entry),
    }
}
