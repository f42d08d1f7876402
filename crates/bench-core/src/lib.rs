//! Core types for the broker latency benchmark harness.
//!
//! This crate holds the schema shared by the producer and consumer sides:
//!
//! - [`TestRunId`], [`GroupId`], [`InstanceId`], [`ExecutionId`] - correlation identifiers
//! - [`BrokerKind`] - the backend a message travels through, and what it calls its groups
//! - [`DispatchGroup`] / [`OutboundMessage`] - producer-side load units
//! - [`RawDelivery`] / [`InboundMessage`] - consumer-side deliveries
//! - [`CollectorRecord`] - the normalized telemetry unit sent to the collector
//! - [`BenchmarkRequest`] / [`BenchmarkResponse`] - the load request contract
//!
//! # Architecture
//!
//! ```text
//! bench-core (this crate)
//!    │
//!    ├─── bench-producer   (fan-out, dispatch, retry)
//!    │
//!    └─── bench-consumer   (normalization, collector forwarding)
//! ```

pub mod broker;
pub mod delivery;
pub mod ids;
pub mod message;
pub mod record;
pub mod request;

// Re-exports for convenience
pub use broker::{AttributeCarrier, BrokerKind, CloudProvider};
pub use delivery::{InboundMessage, NormalizeError, RawDelivery};
pub use ids::{ExecutionId, GroupId, InstanceId, TestRunId};
pub use message::{envelope_keys, DispatchGroup, OutboundMessage};
pub use record::{CollectorRecord, MessageIdValue, RecordProperties, LANGUAGE};
pub use request::{
    BenchmarkRequest, BenchmarkResponse, RequestError, MAX_GROUPS, MAX_MESSAGES_PER_GROUP,
};
