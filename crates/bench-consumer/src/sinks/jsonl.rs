use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::ForwardError;
use crate::forwarder::CollectorSink;

/// Appends one JSON line per record to a file.
pub struct JsonlCollectorSink {
    path: PathBuf,
    name: String,
    file: Mutex<File>,
}

impl JsonlCollectorSink {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
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
            .with_context(|| format!("Failed to open collector file {}", path.display()))?;

        Ok(Self {
            name: path.display().to_string(),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CollectorSink for JsonlCollectorSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, mut payload: String) -> Result<(), ForwardError> {
        payload.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
