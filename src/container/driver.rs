//! Container runtime driver interface
//!
//! The orchestrator never talks to the container runtime directly. Every
//! operation goes through a [`RuntimeDriver`], which makes it possible to swap
//! the docker CLI for an in-memory fake in tests.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;
use tokio_stream::Stream;

/// Stream of whole output lines from a runtime process
pub type LineStream = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// Link from a new container to one linked container instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAlias {
    /// Name of the linked container
    pub container: String,
    /// Alias visible inside the new container
    pub alias: String,
}

/// Everything the runtime needs to create and start one container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSpec {
    /// Container name
    pub name: String,
    /// Image name or build tag
    pub image: String,
    /// Command arguments
    pub command: Vec<String>,
    /// Port publications
    pub ports: Vec<String>,
    /// Volume mounts
    pub volumes: Vec<String>,
    /// Environment variables
    pub environment: BTreeMap<String, String>,
    /// One entry per linked container instance
    pub links: Vec<LinkAlias>,
    /// Network mode
    pub net: Option<String>,
    /// Working directory
    pub working_dir: Option<String>,
    /// Entrypoint override
    pub entrypoint: Option<String>,
    /// Hostname
    pub hostname: Option<String>,
    /// User
    pub user: Option<String>,
    /// Memory limit
    pub mem_limit: Option<String>,
    /// Privileged mode
    pub privileged: bool,
    /// Extra runtime flags passed through verbatim
    pub run_flags: Vec<String>,
}

/// Operations the orchestrator needs from a container runtime
#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    /// List all containers, one table row per line
    async fn list(&self) -> Result<LineStream>;

    /// Create and start a container, returning its runtime identity
    async fn run(&self, spec: &RunSpec) -> Result<String>;

    /// Start an existing container
    async fn start(&self, name: &str) -> Result<()>;

    /// Stop a running container
    async fn stop(&self, name: &str) -> Result<()>;

    /// Kill a running container
    async fn kill(&self, name: &str) -> Result<()>;

    /// Remove a container, killing it first if needed
    async fn force_remove(&self, name: &str) -> Result<()>;

    /// Build an image from a context directory
    async fn build(&self, tag: &str, context: &str) -> Result<()>;

    /// Follow combined stdout and stderr of a container
    async fn follow_logs(&self, name: &str, timestamps: bool) -> Result<LineStream>;
}
