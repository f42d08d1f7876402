//! File-backed broker: one JSON-encoded delivery per line.
//!
//! The producer appends to the spool and a later consumer run replays it, so
//! the two sides can run as separate processes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bench_consumer::{BrokerSource, SourceError};
use bench_core::{AttributeCarrier, BrokerKind, OutboundMessage, RawDelivery};
use bench_producer::{BrokerSink, SinkError};
use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::debug;

use super::FailureInjector;

pub struct SpoolSink {
    kind: BrokerKind,
    carrier: AttributeCarrier,
    path: PathBuf,
    file: Mutex<File>,
    failures: Arc<FailureInjector>,
}

impl SpoolSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn open(
        path: impl AsRef<Path>,
        kind: BrokerKind,
        fail_first_attempts: u32,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open spool {}", path.display()))?;

        Ok(Self {
            kind,
            carrier: kind.default_carrier(),
            path,
            file: Mutex::new(file),
            failures: Arc::new(FailureInjector::new(fail_first_attempts)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BrokerSink for SpoolSink {
    fn kind(&self) -> BrokerKind {
        self.kind
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        self.failures.check()?;

        let delivery = RawDelivery::from_outbound(message, self.carrier, Some(Utc::now()));
        let mut line = serde_json::to_string(&delivery)
            .map_err(|e| SinkError::Rejected(format!("Failed to encode delivery: {e}")))?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| SinkError::Transient(format!("Failed to append to spool: {e}")))?;
        file.flush()
            .await
            .map_err(|e| SinkError::Transient(format!("Failed to flush spool: {e}")))?;
        Ok(())
    }
}

pub struct SpoolSource {
    lines: Lines<BufReader<File>>,
    batch_size: usize,
    line_no: usize,
}

impl SpoolSource {
    pub async fn open(path: impl AsRef<Path>, batch_size: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open spool {}", path.display()))?;

        Ok(Self {
            lines: BufReader::new(file).lines(),
            batch_size: batch_size.max(1),
            line_no: 0,
        })
    }
}

#[async_trait]
impl BrokerSource for SpoolSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<RawDelivery>>, SourceError> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while batch.len() < self.batch_size {
            let Some(line) = self.lines.next_line().await? else {
                break;
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let delivery: RawDelivery =
                serde_json::from_str(&line).map_err(|e| SourceError::Decode {
                    line: self.line_no,
                    reason: e.to_string(),
                })?;
            batch.push(delivery);
        }

        if batch.is_empty() {
            debug!("Spool drained after {} line(s)", self.line_no);
            return Ok(None);
        }
        Ok(Some(batch))
    }
}
