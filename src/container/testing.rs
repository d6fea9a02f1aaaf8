//! In-memory runtime driver for tests

use super::driver::{LineStream, RunSpec, RuntimeDriver};
use crate::error::{IchijikuError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Scripted [`RuntimeDriver`] that records every call
#[derive(Default)]
pub struct FakeDriver {
    ps_lines: Vec<String>,
    logs: HashMap<String, Vec<String>>,
    failures: Vec<(String, Option<String>)>,
    calls: Mutex<Vec<String>>,
    runs: Mutex<Vec<RunSpec>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ps_lines(mut self, lines: &[&str]) -> Self {
        self.ps_lines = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Add a `ps` row for a running container with no published ports
    pub fn with_container(mut self, name: &str) -> Self {
        self.ps_lines.push(format!(
            "0123456789ab  image  \"cmd\"  1 minute ago  Up 1 minute  {}",
            name
        ));
        self
    }

    pub fn with_logs(mut self, name: &str, lines: &[&str]) -> Self {
        self.logs
            .insert(name.to_string(), lines.iter().map(|l| l.to_string()).collect());
        self
    }

    /// Fail every call of an operation
    pub fn fail_on(mut self, op: &str) -> Self {
        self.failures.push((op.to_string(), None));
        self
    }

    /// Fail an operation only for one target
    pub fn fail_on_target(mut self, op: &str, target: &str) -> Self {
        self.failures.push((op.to_string(), Some(target.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn runs(&self) -> Vec<RunSpec> {
        self.runs.lock().unwrap().clone()
    }

    fn record(&self, op: &str, target: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", op, target).trim_end().to_string());

        let failed = self.failures.iter().any(|(failing_op, failing_target)| {
            failing_op == op && failing_target.as_deref().map_or(true, |t| t == target)
        });

        if failed {
            return Err(IchijikuError::Runtime {
                command: format!("fake {} {}", op, target),
                message: "scripted failure".to_string(),
            });
        }

        Ok(())
    }

    fn stream(lines: Vec<String>) -> LineStream {
        Box::pin(tokio_stream::iter(lines.into_iter().map(Ok)))
    }
}

#[async_trait]
impl RuntimeDriver for FakeDriver {
    async fn list(&self) -> Result<LineStream> {
        self.record("list", "")?;
        Ok(Self::stream(self.ps_lines.clone()))
    }

    async fn run(&self, spec: &RunSpec) -> Result<String> {
        self.record("run", &spec.name)?;
        self.runs.lock().unwrap().push(spec.clone());
        Ok(format!("id-{}", spec.name))
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.record("start", name)
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.record("stop", name)
    }

    async fn kill(&self, name: &str) -> Result<()> {
        self.record("kill", name)
    }

    async fn force_remove(&self, name: &str) -> Result<()> {
        self.record("rm", name)
    }

    async fn build(&self, tag: &str, _context: &str) -> Result<()> {
        self.record("build", tag)
    }

    async fn follow_logs(&self, name: &str, timestamps: bool) -> Result<LineStream> {
        self.record("logs", name)?;
        let lines = self.logs.get(name).cloned().unwrap_or_default();
        let lines = if timestamps {
            lines
                .into_iter()
                .map(|l| format!("2014-06-01T12:00:00Z {}", l))
                .collect()
        } else {
            lines
        };
        Ok(Self::stream(lines))
    }
}
