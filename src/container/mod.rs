//! Container management module
//!
//! This module provides the container side of orchestration: the naming
//! scheme that ties containers to services, the runtime driver interface,
//! and the reader that turns live runtime state into records.

pub mod docker;
pub mod driver;
pub mod identity;
pub mod ps;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

pub use docker::DockerDriver;
pub use driver::{LineStream, LinkAlias, RunSpec, RuntimeDriver};
pub use identity::{container_name, parse_index, sanitize_namespace, IdentityPredicate};
pub use ps::{list_runtime_containers, parse_ps_line, RuntimeRecord};
pub use runtime::Container;
