//! Container instances owned by a service

use super::identity::{container_name, parse_index};
use super::ps::RuntimeRecord;
use crate::error::Result;

/// One runtime container belonging to a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Container name, always `{namespace}_{service}_{index}`
    pub name: String,
    /// Replica index, unique within the owning service
    pub index: u32,
    /// Name of the owning service
    pub service: String,
    /// Last observed status
    pub status: Option<String>,
    /// Last observed published ports
    pub ports: Option<String>,
    /// Last observed command
    pub command: Option<String>,
}

impl Container {
    /// Create a fresh container at the given index
    pub fn new(namespace: &str, service: &str, index: u32) -> Self {
        Self {
            name: container_name(namespace, service, index),
            index,
            service: service.to_string(),
            status: None,
            ports: None,
            command: None,
        }
    }

    /// Rebuild a container from a `ps` record, taking the index from its name
    pub fn from_record(service: &str, record: RuntimeRecord) -> Result<Self> {
        let index = parse_index(&record.name)?;

        Ok(Self {
            name: record.name,
            index,
            service: service.to_string(),
            status: Some(record.status),
            ports: Some(record.ports),
            command: Some(record.command),
        })
    }

    /// Check if the last observed status reports the container as running
    pub fn is_running(&self) -> bool {
        self.status
            .as_deref()
            .map(|s| s.starts_with("Up"))
            .unwrap_or(false)
    }
}
