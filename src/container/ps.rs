//! Runtime state reader
//!
//! Parses the tabular output of `docker ps -a` into [`RuntimeRecord`]s. Columns
//! are separated by runs of two or more spaces; empty columns collapse into
//! their neighbours, so the name and ports columns are told apart by position.

use super::driver::RuntimeDriver;
use crate::error::{IchijikuError, Result};
use regex::Regex;
use std::sync::OnceLock;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

/// Buffer between the `ps` reader task and its consumer
const RECORD_CHANNEL_CAPACITY: usize = 64;

/// One row of runtime state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeRecord {
    /// Container name (first alias only)
    pub name: String,
    /// Published ports
    pub ports: String,
    /// Status text
    pub status: String,
    /// Command text
    pub command: String,
}

fn field_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s{2,}").expect("static regex is valid"))
}

/// Parse one `ps` row, returning `None` for rows of an unknown shape
pub fn parse_ps_line(line: &str) -> Option<RuntimeRecord> {
    let fields: Vec<&str> = field_separator().split(line).collect();

    let (name, ports) = if fields.len() >= 7 {
        if fields[6].is_empty() {
            (fields[5], "")
        } else {
            (fields[6], fields[5])
        }
    } else if fields.len() == 6 {
        if fields[5].is_empty() {
            (fields[4], "")
        } else {
            (fields[5], "")
        }
    } else {
        return None;
    };

    let name = name.split(',').next().unwrap_or(name);

    Some(RuntimeRecord {
        name: name.to_string(),
        ports: ports.to_string(),
        status: fields[4].to_string(),
        command: fields[2].to_string(),
    })
}

/// Query the runtime for all containers
///
/// The query runs on a background task that forwards records as they are
/// parsed. A read failure is forwarded as the last item. The receiver ends
/// when the runtime's output ends; it cannot be restarted, so call again for
/// a fresh view.
pub async fn list_runtime_containers(
    driver: &dyn RuntimeDriver,
) -> Result<mpsc::Receiver<Result<RuntimeRecord>>> {
    let mut lines = driver.list().await?;
    let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let _ = tx
                        .send(Err(IchijikuError::Runtime {
                            command: "ps".to_string(),
                            message: e.to_string(),
                        }))
                        .await;
                    break;
                }
            };

            let Some(record) = parse_ps_line(&line) else {
                tracing::trace!("Skipping ps line: {}", line);
                continue;
            };

            if tx.send(Ok(record)).await.is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testing::FakeDriver;

    #[test]
    fn test_parse_line_with_ports() {
        let line = "4c01db0b339c  nginx:latest  \"nginx -g 'daemon of\"  2 hours ago  Up 2 hours  0.0.0.0:8080->80/tcp  myapp_web_1";
        let record = parse_ps_line(line).unwrap();

        assert_eq!(record.name, "myapp_web_1");
        assert_eq!(record.ports, "0.0.0.0:8080->80/tcp");
        assert_eq!(record.status, "Up 2 hours");
        assert_eq!(record.command, "\"nginx -g 'daemon of\"");
    }

    #[test]
    fn test_parse_line_with_empty_seventh_field() {
        let line = "4c01db0b339c  redis  \"redis-server\"  5 minutes ago  Up 5 minutes  80/tcp  ";
        let record = parse_ps_line(line).unwrap();

        assert_eq!(record.name, "80/tcp");
        assert_eq!(record.ports, "");
        assert_eq!(record.status, "Up 5 minutes");
    }

    #[test]
    fn test_parse_line_without_ports() {
        let line = "d9b100f2f636  postgres:9.3  \"postgres\"  3 days ago  Exited (0) 2 days ago  myapp_db_1";
        let record = parse_ps_line(line).unwrap();

        assert_eq!(record.name, "myapp_db_1");
        assert_eq!(record.ports, "");
        assert_eq!(record.status, "Exited (0) 2 days ago");
        assert_eq!(record.command, "\"postgres\"");
    }

    #[test]
    fn test_parse_line_six_fields_empty_name() {
        let line = "d9b100f2f636  postgres  \"postgres\"  3 days ago  myapp_db_2  ";
        let record = parse_ps_line(line).unwrap();

        assert_eq!(record.name, "myapp_db_2");
        assert_eq!(record.status, "myapp_db_2");
    }

    #[test]
    fn test_parse_line_truncates_aliases() {
        let line = "4c01db0b339c  nginx  \"nginx\"  2 hours ago  Up 2 hours  80/tcp  myapp_web_1,myapp_proxy_1/web";
        let record = parse_ps_line(line).unwrap();

        assert_eq!(record.name, "myapp_web_1");
        assert_eq!(record.ports, "80/tcp");
    }

    #[test]
    fn test_parse_line_skips_short_rows() {
        assert!(parse_ps_line("").is_none());
        assert!(parse_ps_line("garbage").is_none());
        assert!(parse_ps_line("a  b  c  d  e").is_none());
    }

    #[tokio::test]
    async fn test_list_runtime_containers() {
        let driver = FakeDriver::new().with_ps_lines(&[
            "CONTAINER ID  IMAGE  COMMAND  CREATED  STATUS  PORTS  NAMES",
            "d9b100f2f636  postgres  \"postgres\"  3 days ago  Up 3 days  myapp_db_1",
            "short line",
            "4c01db0b339c  nginx  \"nginx\"  2 hours ago  Up 2 hours  80/tcp  myapp_web_1",
        ]);

        let mut rx = list_runtime_containers(&driver).await.unwrap();
        let mut names = Vec::new();
        while let Some(record) = rx.recv().await {
            names.push(record.unwrap().name);
        }

        assert_eq!(names, vec!["NAMES", "myapp_db_1", "myapp_web_1"]);
    }

    #[tokio::test]
    async fn test_list_runtime_containers_driver_failure() {
        let driver = FakeDriver::new().fail_on("list");

        let err = list_runtime_containers(&driver).await.unwrap_err();
        assert!(matches!(err, crate::IchijikuError::Runtime { .. }));
    }
}
