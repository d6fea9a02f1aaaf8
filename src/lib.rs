//! Ichijiku - fig-like orchestration of docker containers
//!
//! Ichijiku reads a fig file describing a set of services and keeps the
//! container runtime in line with it. It provides:
//!
//! - Stable container naming (`{project}_{service}_{index}`)
//! - Reconciliation of services against live runtime state
//! - Gap-filling scaling of service replicas
//! - Startup ordering by service links
//! - Merged, color-coded logs from many containers

pub mod compose;
pub mod container;
pub mod error;
pub mod logs;

pub use error::{IchijikuError, Result};
