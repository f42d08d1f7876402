//! The normalized telemetry record sent to the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::CloudProvider;
use crate::ids::{ExecutionId, InstanceId, TestRunId};

/// Value of the `Language` property on every record from this harness.
pub const LANGUAGE: &str = "rust";

/// Message id as reported to the collector.
///
/// Sequence numbers are integers; brokers that only expose their own message
/// id (e.g. `{session}/{n}`) report a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageIdValue {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for MessageIdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageIdValue::Number(n) => write!(f, "{n}"),
            MessageIdValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<u32> for MessageIdValue {
    fn from(n: u32) -> Self {
        MessageIdValue::Number(u64::from(n))
    }
}

impl PartialEq<u64> for MessageIdValue {
    fn eq(&self, other: &u64) -> bool {
        matches!(self, MessageIdValue::Number(n) if n == other)
    }
}

/// Per-message measurements carried in `Properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordProperties {
    pub instance_id: InstanceId,
    pub execution_id: ExecutionId,
    pub elapsed_time_ms: f64,
    pub client_enqueue_time_utc: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_enqueued_time: Option<DateTime<Utc>>,
    pub message_id: MessageIdValue,
    pub dequeued_time: DateTime<Utc>,
    pub language: String,
}

/// One message's end-to-end delivery, as seen by the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CollectorRecord {
    pub cloud_provider: CloudProvider,
    pub test_run: TestRunId,
    pub trigger: String,
    pub message_processed_time: DateTime<Utc>,
    pub properties: RecordProperties,
}

impl CollectorRecord {
    /// Serialize to the collector wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Broker-to-consumer latency, when the broker reported its own enqueue time.
    pub fn broker_to_consumer_ms(&self) -> Option<f64> {
        self.properties.system_enqueued_time.map(|system| {
            (self.properties.dequeued_time - system).num_microseconds().unwrap_or(i64::MAX) as f64
                / 1000.0
        })
    }

    /// Producer-to-broker latency, when the broker reported its own enqueue time.
    pub fn producer_to_broker_ms(&self) -> Option<f64> {
        self.properties.system_enqueued_time.map(|system| {
            (system - self.properties.client_enqueue_time_utc)
                .num_microseconds()
                .unwrap_or(i64::MAX) as f64
                / 1000.0
        })
    }
}
