//! Services: desired state plus the containers currently backing it

use super::config::{parse_link, ServiceConfig};
use crate::container::{Container, IdentityPredicate};
use crate::error::Result;

/// Directed dependency edge to another service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Target service name
    pub target: String,
    /// Alias used inside linked containers
    pub alias: String,
}

/// A named desired-state template for one or more containers
#[derive(Debug, Clone)]
pub struct Service {
    /// Service name
    pub name: String,
    /// Namespace scoping all container names
    pub namespace: String,
    /// Desired state from the fig file
    pub config: ServiceConfig,
    /// Links to other services
    pub links: Vec<Link>,
    /// Containers found by the last reconciliation
    pub containers: Vec<Container>,
    identity: IdentityPredicate,
}

impl Service {
    /// Initialize a service from its configuration
    pub fn new(namespace: &str, name: &str, config: ServiceConfig) -> Result<Self> {
        let identity = IdentityPredicate::compile(namespace, name)?;
        let links = config
            .links
            .iter()
            .map(|entry| {
                let (target, alias) = parse_link(entry);
                Link {
                    target: target.to_string(),
                    alias: alias.to_string(),
                }
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            config,
            links,
            containers: Vec::new(),
            identity,
        })
    }

    /// Returns true if the container name belongs to this service
    pub fn matches_container(&self, name: &str) -> bool {
        self.identity.matches(name)
    }

    /// Returns true if this service links directly to `other`
    pub fn links_to(&self, other: &str) -> bool {
        self.links.iter().any(|link| link.target == other)
    }

    /// Image to run: the configured image, or the tag built from `build`
    pub fn image(&self) -> String {
        self.config
            .image
            .clone()
            .unwrap_or_else(|| self.build_tag())
    }

    /// Tag for images built from this service's context
    pub fn build_tag(&self) -> String {
        format!("{}/{}", self.namespace, self.name).to_lowercase()
    }

    /// Containers sorted by index
    pub fn sorted_containers(&self) -> Vec<&Container> {
        let mut containers: Vec<&Container> = self.containers.iter().collect();
        containers.sort_by_key(|c| c.index);
        containers
    }

    /// Indices of the current containers, ascending
    pub fn indices(&self) -> Vec<u32> {
        self.sorted_containers().iter().map(|c| c.index).collect()
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
