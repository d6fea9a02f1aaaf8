//! Fig-style service orchestration
//!
//! This module turns a fig file into services, reconciles them against the
//! containers the runtime reports, and drives scaling and startup order.

pub mod config;
pub mod orchestrator;
pub mod parser;
pub mod scale;
pub mod schedule;
pub mod service;

pub use config::{FigConfig, ServiceConfig};
pub use orchestrator::Orchestrator;
pub use parser::FigParser;
pub use scale::{compute_scale_plan, parse_scale_arg, ScalePlan};
pub use schedule::order_by_dependency;
pub use service::{Link, Service};
