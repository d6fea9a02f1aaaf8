//! Runtime driver backed by the docker CLI

use super::driver::{LineStream, RunSpec, RuntimeDriver};
use crate::error::{IchijikuError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

/// Default docker binary
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

type ExitFuture = Pin<Box<dyn Future<Output = io::Result<ExitStatus>> + Send>>;

/// Render the `docker run` arguments for a container
pub fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        format!("--name={}", spec.name),
    ];

    for volume in &spec.volumes {
        args.push(format!("--volume={}", volume));
    }
    for port in &spec.ports {
        args.push(format!("--publish={}", port));
    }
    for (key, value) in &spec.environment {
        args.push(format!("--env={}={}", key, value));
    }
    for link in &spec.links {
        args.push(format!("--link={}:{}", link.container, link.alias));
    }

    let optional = [
        ("net", &spec.net),
        ("workdir", &spec.working_dir),
        ("entrypoint", &spec.entrypoint),
        ("hostname", &spec.hostname),
        ("user", &spec.user),
        ("memory", &spec.mem_limit),
    ];
    for (flag, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            args.push(format!("--{}={}", flag, value));
        }
    }
    if spec.privileged {
        args.push("--privileged".to_string());
    }

    args.extend(spec.run_flags.iter().cloned());
    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

/// Lines of a child process, failing at the end if the process failed
struct ChildLines {
    command: String,
    lines: LineStream,
    exit: Option<ExitFuture>,
}

impl Stream for ChildLines {
    type Item = io::Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(line) = ready!(this.lines.as_mut().poll_next(cx)) {
            return Poll::Ready(Some(line));
        }

        let Some(exit) = this.exit.as_mut() else {
            return Poll::Ready(None);
        };
        let status = ready!(exit.as_mut().poll(cx));
        this.exit = None;

        match status {
            Ok(status) if status.success() => Poll::Ready(None),
            Ok(status) => Poll::Ready(Some(Err(io::Error::new(
                io::ErrorKind::Other,
                format!("`{}` exited with {}", this.command, status),
            )))),
            Err(e) => Poll::Ready(Some(Err(e))),
        }
    }
}

/// Runtime driver that shells out to `docker`
#[derive(Debug, Clone)]
pub struct DockerDriver {
    binary: String,
}

impl Default for DockerDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerDriver {
    /// Create a driver using `docker` from `PATH`
    pub fn new() -> Self {
        Self::with_binary(DEFAULT_DOCKER_BINARY)
    }

    /// Create a driver using a specific binary
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command_line(&self, args: &[String]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    fn runtime_error(command: &str, message: impl ToString) -> IchijikuError {
        IchijikuError::Runtime {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Run a command to completion and return its trimmed stdout
    async fn exec(&self, args: Vec<String>) -> Result<String> {
        let command = self.command_line(&args);
        debug!("{}", command);

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Self::runtime_error(&command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(Self::runtime_error(&command, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Spawn a command and stream its output line by line
    fn spawn_lines(&self, args: Vec<String>, merge_stderr: bool) -> Result<LineStream> {
        let command = self.command_line(&args);
        debug!("{}", command);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if merge_stderr {
                Stdio::piped()
            } else {
                Stdio::inherit()
            })
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Self::runtime_error(&command, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Self::runtime_error(&command, "stdout was not captured"))?;
        let mut lines: LineStream = Box::pin(LinesStream::new(BufReader::new(stdout).lines()));

        if merge_stderr {
            if let Some(stderr) = child.stderr.take() {
                let stderr = LinesStream::new(BufReader::new(stderr).lines());
                lines = Box::pin(lines.merge(stderr));
            }
        }

        Ok(Box::pin(ChildLines {
            command,
            lines,
            exit: Some(Box::pin(async move { child.wait().await })),
        }))
    }
}

#[async_trait]
impl RuntimeDriver for DockerDriver {
    async fn list(&self) -> Result<LineStream> {
        self.spawn_lines(vec!["ps".to_string(), "-a".to_string()], false)
    }

    async fn run(&self, spec: &RunSpec) -> Result<String> {
        self.exec(run_args(spec)).await
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.exec(vec!["start".to_string(), name.to_string()]).await?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.exec(vec!["stop".to_string(), name.to_string()]).await?;
        Ok(())
    }

    async fn kill(&self, name: &str) -> Result<()> {
        self.exec(vec!["kill".to_string(), name.to_string()]).await?;
        Ok(())
    }

    async fn force_remove(&self, name: &str) -> Result<()> {
        self.exec(vec!["rm".to_string(), "-f".to_string(), name.to_string()])
            .await?;
        Ok(())
    }

    async fn build(&self, tag: &str, context: &str) -> Result<()> {
        self.exec(vec![
            "build".to_string(),
            format!("--tag={}", tag),
            context.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn follow_logs(&self, name: &str, timestamps: bool) -> Result<LineStream> {
        let mut args = vec!["logs".to_string(), "-f".to_string()];
        if timestamps {
            args.push("-t".to_string());
        }
        args.push(name.to_string());

        self.spawn_lines(args, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::driver::LinkAlias;

    #[test]
    fn test_run_args_minimal() {
        let spec = RunSpec {
            name: "myapp_web_1".to_string(),
            image: "nginx".to_string(),
            ..Default::default()
        };

        assert_eq!(run_args(&spec), vec!["run", "-d", "--name=myapp_web_1", "nginx"]);
    }

    #[test]
    fn test_run_args_full() {
        let mut spec = RunSpec {
            name: "myapp_web_2".to_string(),
            image: "myapp/web".to_string(),
            command: vec!["python".to_string(), "app.py".to_string()],
            ports: vec!["8000:8000".to_string()],
            volumes: vec![".:/code".to_string()],
            links: vec![LinkAlias {
                container: "myapp_db_1".to_string(),
                alias: "db_1".to_string(),
            }],
            working_dir: Some("/code".to_string()),
            user: Some(String::new()),
            privileged: true,
            run_flags: vec!["--rm=false".to_string()],
            ..Default::default()
        };
        spec.environment.insert("DEBUG".to_string(), "1".to_string());

        assert_eq!(
            run_args(&spec),
            vec![
                "run",
                "-d",
                "--name=myapp_web_2",
                "--volume=.:/code",
                "--publish=8000:8000",
                "--env=DEBUG=1",
                "--link=myapp_db_1:db_1",
                "--workdir=/code",
                "--privileged",
                "--rm=false",
                "myapp/web",
                "python",
                "app.py",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_runtime_error() {
        let driver = DockerDriver::with_binary("/nonexistent/ichijiku-docker");

        let err = driver.stop("myapp_web_1").await.unwrap_err();
        match err {
            IchijikuError::Runtime { command, .. } => {
                assert_eq!(command, "/nonexistent/ichijiku-docker stop myapp_web_1");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
