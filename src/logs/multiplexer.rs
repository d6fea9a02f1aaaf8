//! Fan-in of container log streams
//!
//! Each container gets one forwarding task and one color for its whole
//! lifetime. Tasks send whole, formatted lines into a single channel, which
//! one consumer drains in arrival order.

use super::palette::ColorPicker;
use crate::container::{Container, RuntimeDriver};
use crate::error::Result;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// Capacity of the shared log channel
pub const LOG_CHANNEL_CAPACITY: usize = 1024;

/// Width the stream prefix is right-aligned to
const PREFIX_WIDTH: usize = 15;

/// Create the shared channel that log lines are multiplexed onto
pub fn log_channel() -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
    mpsc::channel(LOG_CHANNEL_CAPACITY)
}

/// Prefix for the container at `position` within its service
pub fn log_prefix(service: &str, position: usize) -> String {
    format!("{}_{}", service, position + 1)
}

/// Streams logs of many containers into one channel
pub struct LogMultiplexer {
    driver: Arc<dyn RuntimeDriver>,
    palette: Arc<ColorPicker>,
    timestamps: bool,
}

impl LogMultiplexer {
    /// Create a multiplexer drawing colors from `palette`
    pub fn new(driver: Arc<dyn RuntimeDriver>, palette: Arc<ColorPicker>) -> Self {
        Self {
            driver,
            palette,
            timestamps: false,
        }
    }

    /// Ask the runtime to prefix each line with its timestamp
    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Start one forwarding task per container
    ///
    /// Containers are prefixed by their service name and their position among
    /// that service's entries in `containers`. Opening a stream fails fast:
    /// tasks already started keep running. Tasks end when their stream ends.
    pub async fn stream_logs(
        &self,
        containers: &[&Container],
        sink: &mpsc::Sender<String>,
    ) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::with_capacity(containers.len());
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for container in containers {
            let lines = self
                .driver
                .follow_logs(&container.name, self.timestamps)
                .await?;
            let position = positions.entry(container.service.as_str()).or_insert(0);
            let prefix = log_prefix(&container.service, *position);
            *position += 1;
            let color = self.palette.next();
            let reset = self.palette.reset();
            let sink = sink.clone();
            let name = container.name.clone();

            debug!("Following logs of {} as {}", name, prefix);

            handles.push(tokio::spawn(async move {
                let mut lines = lines;
                while let Some(line) = lines.next().await {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("Log stream of {} failed: {}", name, e);
                            break;
                        }
                    };

                    let formatted = format!(
                        "{}{:>width$}  | {}{}",
                        color,
                        prefix,
                        line,
                        reset,
                        width = PREFIX_WIDTH
                    );
                    if sink.send(formatted).await.is_err() {
                        break;
                    }
                }
                debug!("Log stream of {} ended", name);
            }));
        }

        Ok(handles)
    }
}

/// Write every line from the channel until all senders are gone
pub async fn drain<W: Write>(mut rx: mpsc::Receiver<String>, mut out: W) -> Result<usize> {
    let mut count = 0;
    while let Some(line) = rx.recv().await {
        writeln!(out, "{}", line)?;
        out.flush()?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::FakeDriver;
    use crate::logs::palette::{ColorCode, PALETTE};

    fn multiplexer(driver: FakeDriver) -> LogMultiplexer {
        LogMultiplexer::new(Arc::new(driver), Arc::new(ColorPicker::new()))
    }

    #[test]
    fn test_log_prefix() {
        assert_eq!(log_prefix("web", 0), "web_1");
        assert_eq!(log_prefix("web", 4), "web_5");
    }

    #[tokio::test]
    async fn test_stream_logs_formats_lines() {
        let driver = FakeDriver::new().with_logs("myapp_web_3", &["listening on :80"]);
        let container = Container::new("myapp", "web", 3);

        let (tx, rx) = log_channel();
        let handles = multiplexer(driver)
            .stream_logs(&[&container], &tx)
            .await
            .unwrap();
        drop(tx);
        for handle in handles {
            handle.await.unwrap();
        }

        let mut out = Vec::new();
        assert_eq!(drain(rx, &mut out).await.unwrap(), 1);

        let expected = format!(
            "{}          web_1  | listening on :80{}\n",
            ColorCode::foreground(PALETTE[0]),
            ColorCode::reset()
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_stream_logs_keeps_per_stream_order_and_color() {
        let driver = FakeDriver::new()
            .with_logs("myapp_web_1", &["w1", "w2", "w3"])
            .with_logs("myapp_db_1", &["d1", "d2"]);
        let web = Container::new("myapp", "web", 1);
        let db = Container::new("myapp", "db", 1);

        let (tx, mut rx) = log_channel();
        multiplexer(driver)
            .stream_logs(&[&web, &db], &tx)
            .await
            .unwrap();
        drop(tx);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(lines.len(), 5);

        let web_color = ColorCode::foreground(PALETTE[0]).to_string();
        let db_color = ColorCode::foreground(PALETTE[1]).to_string();

        let web_lines: Vec<&String> = lines.iter().filter(|l| l.contains("web_1  |")).collect();
        assert_eq!(web_lines.len(), 3);
        assert!(web_lines.iter().all(|l| l.starts_with(&web_color)));
        assert!(web_lines[0].contains("| w1") && web_lines[2].contains("| w3"));

        // Positional prefix: db's only container is db_1.
        let db_lines: Vec<&String> = lines.iter().filter(|l| l.contains("db_1  |")).collect();
        assert_eq!(db_lines.len(), 2);
        assert!(db_lines.iter().all(|l| l.starts_with(&db_color)));
        assert!(db_lines[0].contains("| d1") && db_lines[1].contains("| d2"));
    }

    #[tokio::test]
    async fn test_prefix_uses_position_not_index() {
        let driver = FakeDriver::new().with_logs("myapp_web_7", &["hello"]);
        let first = Container::new("myapp", "web", 2);
        let second = Container::new("myapp", "web", 7);

        let (tx, mut rx) = log_channel();
        multiplexer(driver)
            .stream_logs(&[&first, &second], &tx)
            .await
            .unwrap();
        drop(tx);

        let line = rx.recv().await.unwrap();
        assert!(line.contains("web_2  | hello"));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_timestamps_are_requested() {
        let driver = FakeDriver::new().with_logs("myapp_web_1", &["ready"]);
        let container = Container::new("myapp", "web", 1);

        let (tx, mut rx) = log_channel();
        multiplexer(driver)
            .timestamps(true)
            .stream_logs(&[&container], &tx)
            .await
            .unwrap();
        drop(tx);

        let line = rx.recv().await.unwrap();
        assert!(line.contains("| 2014-06-01T12:00:00Z ready"));
    }

    #[tokio::test]
    async fn test_open_failure_is_returned() {
        let driver = FakeDriver::new().fail_on_target("logs", "myapp_db_1");
        let web = Container::new("myapp", "web", 1);
        let db = Container::new("myapp", "db", 1);

        let (tx, _rx) = log_channel();
        let result = multiplexer(driver).stream_logs(&[&web, &db], &tx).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_many_streams_wrap_colors() {
        let mut driver = FakeDriver::new();
        let containers: Vec<Container> = (1..=8).map(|i| Container::new("myapp", "worker", i)).collect();
        for c in &containers {
            driver = driver.with_logs(&c.name, &["tick"]);
        }
        let refs: Vec<&Container> = containers.iter().collect();

        let (tx, mut rx) = log_channel();
        multiplexer(driver).stream_logs(&refs, &tx).await.unwrap();
        drop(tx);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        assert_eq!(lines.len(), 8);

        let seventh = lines.iter().find(|l| l.contains("worker_7  |")).unwrap();
        assert!(seventh.starts_with(&ColorCode::foreground(PALETTE[0]).to_string()));
    }
}
