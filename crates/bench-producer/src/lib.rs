//! Producer side of the broker latency benchmark harness.
//!
//! A benchmark request is turned into a test run, split into dispatch groups
//! and pushed through a [`BrokerSink`]:
//!
//! ```text
//! LoadEntryPoint ──► FanOutOrchestrator ──► (N ×) send_with_retry ──► BrokerSink
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bench_producer::{FanOutOrchestrator, LoadEntryPoint, DEFAULT_WAIT_TIMEOUT};
//!
//! let entry = LoadEntryPoint::new(FanOutOrchestrator::new(sink));
//! let (status, response) = entry
//!     .handle(r#"{"NumberOfMessages":5,"WorkTime":50}"#, DEFAULT_WAIT_TIMEOUT)
//!     .await;
//! ```

pub mod args;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod orchestrator;
pub mod sink;

#[cfg(test)]
mod test_support;

pub use args::{parse_duration, DispatchArgs, LoadArgs};
pub use dispatcher::{send_with_retry, SendOutcome, DEFAULT_MAX_ATTEMPTS};
pub use entry::{rejection, status, LoadEntryPoint, RunHandle, RunStatus, DEFAULT_WAIT_TIMEOUT};
pub use error::{OrchestrationError, SinkError};
pub use orchestrator::{FanOutOrchestrator, FanOutReport, GroupReport, DEFAULT_PAYLOAD};
pub use sink::BrokerSink;
