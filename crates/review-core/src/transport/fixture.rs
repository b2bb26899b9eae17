//! Fixture replay transport
//!
//! Re-emits the `data:` lines of a canned file as an SSE stream, paced the
//! way the live backend paces them. A development double, not a format.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};

use super::{ByteStream, ReviewTransport};
use crate::error::TransportError;

/// Pacing between replayed records
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureTiming {
    /// Before the first record
    pub initial_delay: Duration,
    /// After a `start` record
    pub start_delay: Duration,
    /// After a content record whose chunk is a lone newline
    pub newline_delay: Duration,
    /// After any other record
    pub content_delay: Duration,
    /// Divides every delay; 2.0 replays twice as fast
    pub speed: f64,
}

impl FixtureTiming {
    /// No pacing at all
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            start_delay: Duration::ZERO,
            newline_delay: Duration::ZERO,
            content_delay: Duration::ZERO,
            speed: 1.0,
        }
    }

    /// Saturates at `Duration::MAX` when a tiny speed overflows the division
    fn scaled(&self, delay: Duration) -> Duration {
        if self.speed > 0.0 {
            Duration::try_from_secs_f64(delay.as_secs_f64() / self.speed)
                .unwrap_or(Duration::MAX)
        } else {
            delay
        }
    }

    /// Delay that follows a record of this payload
    fn after(&self, payload: &Value) -> Duration {
        let delay = match payload.get("type").and_then(|t| t.as_str()) {
            Some("start") => self.start_delay,
            _ if payload.get("chunk").and_then(|c| c.as_str()) == Some("\n") => {
                self.newline_delay
            }
            _ => self.content_delay,
        };
        self.scaled(delay)
    }
}

impl Default for FixtureTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            start_delay: Duration::from_millis(1000),
            newline_delay: Duration::from_millis(200),
            content_delay: Duration::from_millis(50),
            speed: 1.0,
        }
    }
}

/// Replays a fixture file for any session key
pub struct FixtureTransport {
    path: PathBuf,
    timing: FixtureTiming,
}

impl FixtureTransport {
    pub fn new(path: impl Into<PathBuf>, timing: FixtureTiming) -> Self {
        Self {
            path: path.into(),
            timing,
        }
    }
}

fn record(payload: &str) -> Bytes {
    Bytes::from(format!("event: message\ndata: {}\n\n", payload))
}

#[async_trait::async_trait]
impl ReviewTransport for FixtureTransport {
    async fn open(&self, session_key: &str) -> Result<ByteStream, TransportError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TransportError::Fixture(format!("{}: {}", self.path.display(), e)))?;

        let lines: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("data:"))
            .map(str::to_string)
            .collect();
        info!(
            "Replaying fixture {} ({} data lines) for {}",
            self.path.display(),
            lines.len(),
            session_key
        );

        let (tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let timing = self.timing.clone();

        tokio::spawn(async move {
            let greeting = serde_json::json!({"type": "connection", "chunk": "SSE连接已建立"});
            let opening = format!(":ok\n\nevent: message\ndata: {}\n\n", greeting);
            if tx.send(Bytes::from(opening)).is_err() {
                return;
            }
            tokio::time::sleep(timing.scaled(timing.initial_delay)).await;

            for (index, line) in lines.iter().enumerate() {
                let payload = line["data:".len()..].trim();
                let delay = match serde_json::from_str::<Value>(payload) {
                    Ok(value) => {
                        if tx.send(record(payload)).is_err() {
                            debug!("Fixture reader dropped, stopping replay");
                            return;
                        }
                        timing.after(&value)
                    }
                    Err(e) => {
                        warn!("Skipping invalid fixture line {}: {}", index + 1, e);
                        timing.scaled(timing.content_delay)
                    }
                };
                tokio::time::sleep(delay).await;
            }

            let closing = serde_json::json!({"type": "end", "chunk": "数据传输完成"});
            let _ = tx.send(record(&closing.to_string()));
            info!("Fixture replay complete");
        });

        Ok(UnboundedReceiverStream::new(rx).map(Ok).boxed())
    }
}
