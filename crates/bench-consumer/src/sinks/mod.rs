//! Collector sink implementations and target selection.

mod http;
mod jsonl;
mod stdout;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;

use crate::forwarder::CollectorSink;

pub use http::HttpCollectorSink;
pub use jsonl::JsonlCollectorSink;
pub use stdout::StdoutCollectorSink;

/// Where collector records go.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CollectorTarget {
    #[default]
    Stdout,
    /// Append JSON lines to a file.
    Jsonl(PathBuf),
    /// POST each record to an `http(s)://host:port/path` endpoint.
    Http(String),
}

impl CollectorTarget {
    pub async fn build(&self) -> Result<Arc<dyn CollectorSink>> {
        Ok(match self {
            CollectorTarget::Stdout => Arc::new(StdoutCollectorSink),
            CollectorTarget::Jsonl(path) => Arc::new(JsonlCollectorSink::open(path).await?),
            CollectorTarget::Http(url) => Arc::new(HttpCollectorSink::new(url)?),
        })
    }
}

impl std::fmt::Display for CollectorTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectorTarget::Stdout => write!(f, "stdout"),
            CollectorTarget::Jsonl(path) => write!(f, "{}", path.display()),
            CollectorTarget::Http(url) => write!(f, "{url}"),
        }
    }
}

impl FromStr for CollectorTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("Empty collector target");
        }
        if s == "-" || s.eq_ignore_ascii_case("stdout") {
            return Ok(CollectorTarget::Stdout);
        }
        if s.starts_with("http://") || s.starts_with("https://") {
            return Ok(CollectorTarget::Http(s.to_string()));
        }
        Ok(CollectorTarget::Jsonl(PathBuf::from(s.strip_prefix("file://").unwrap_or(s))))
    }
}
