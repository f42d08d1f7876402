//! Broker latency benchmark harness.
//!
//! Generates synthetic load against a message broker and turns every
//! delivery into one comparable telemetry record, so end-to-end latency and
//! delivery reliability can be compared across transports.
//!
//! # Crates
//!
//! - `bench_core` - shared data model
//! - `bench_producer` - fan-out, dispatch and retry
//! - `bench_consumer` - normalization and collector forwarding
//!
//! This crate adds configuration, the local broker adapters and the commands
//! behind the `latency-bench` binary.
//!
//! # CLI Usage
//!
//! ```bash
//! # Produce and consume in one process, records to stdout
//! latency-bench run --messages 100 --groups 4 --work-time 50
//!
//! # Split producer and consumer through a spool file
//! latency-bench produce --broker service-bus --spool spool.jsonl --messages 100 --groups 4
//! latency-bench consume --broker service-bus --spool spool.jsonl --collector records.jsonl
//! ```

pub mod broker;
pub mod commands;
pub mod config;
pub mod context;

pub use commands::{consume_spool, produce_to_spool, run_loopback, RunSummary};
pub use config::BenchConfig;
pub use context::BenchContext;
