//! Error types for the consumer side.

use thiserror::Error;

/// Failure to hand a record to the collector.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("Failed to serialize collector record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Collector I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Collector unreachable: {0}")]
    Transport(String),

    #[error("Collector returned non-success response: {0}")]
    Status(String),
}

/// Failure to pull deliveries from a broker.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed delivery at line {line}: {reason}")]
    Decode { line: usize, reason: String },

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}
