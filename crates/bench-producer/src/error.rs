//! Error types for the producer side.

use bench_core::{BrokerKind, TestRunId};
use thiserror::Error;

/// Errors reported by a broker sink for a single send attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Any failure the next attempt may not hit again (throttling, timeouts, dropped connections).
    #[error("Transient send failure: {0}")]
    Transient(String),

    /// The sink refused the message outright; retrying will not help.
    #[error("Message rejected by sink: {0}")]
    Rejected(String),
}

impl SinkError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

/// Terminal failure of a whole benchmark run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("An error occurred executing run {test_run_id}: {failed_groups}/{total_groups} group(s) failed to dispatch")]
    GroupsFailed {
        test_run_id: TestRunId,
        failed_groups: usize,
        total_groups: usize,
    },

    #[error("An error occurred executing run {test_run_id}: {broker} cannot fan out over {total_units} groups")]
    UngroupedFanOut {
        test_run_id: TestRunId,
        broker: BrokerKind,
        total_units: u32,
    },

    #[error("An error occurred executing run {test_run_id}: {reason}")]
    TaskFailed {
        test_run_id: TestRunId,
        reason: String,
    },
}
