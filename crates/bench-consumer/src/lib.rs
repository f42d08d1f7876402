//! Consumer side of the broker latency benchmark harness.
//!
//! Every delivery pulled from a broker becomes one [`CollectorRecord`]
//! carrying the end-to-end latency of that message:
//!
//! - [`BrokerSource`] - pulls raw deliveries in batches
//! - [`Normalizer`] - measures latency, simulates the requested work, builds the record
//! - [`CollectorForwarder`] - serializes the record and submits it once to a [`CollectorSink`]
//!
//! [`run_consumer`] wires the three together.
//!
//! [`CollectorRecord`]: bench_core::CollectorRecord

pub mod args;
pub mod error;
pub mod forwarder;
pub mod normalizer;
pub mod sinks;
pub mod source;

#[cfg(test)]
mod test_support;

pub use args::CollectorArgs;
pub use error::{ForwardError, SourceError};
pub use forwarder::{CollectorForwarder, CollectorSink};
pub use normalizer::{Clock, Normalizer, SystemClock};
pub use sinks::{CollectorTarget, HttpCollectorSink, JsonlCollectorSink, StdoutCollectorSink};
pub use source::{run_consumer, BrokerSource, ConsumerStats, DEFAULT_CONCURRENCY};
