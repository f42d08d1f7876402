//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bench_core::{
    CloudProvider, CollectorRecord, ExecutionId, InstanceId, MessageIdValue, RawDelivery,
    RecordProperties, TestRunId, LANGUAGE,
};
use chrono::Utc;

use crate::error::{ForwardError, SourceError};
use crate::forwarder::CollectorSink;
use crate::source::BrokerSource;

#[derive(Default)]
pub(crate) struct MemoryCollectorSink {
    fail: bool,
    calls: AtomicU32,
    payloads: Mutex<Vec<String>>,
}

impl MemoryCollectorSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl CollectorSink for MemoryCollectorSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn submit(&self, payload: String) -> Result<(), ForwardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ForwardError::Status("503 Service Unavailable".to_string()));
        }
        self.payloads.lock().unwrap().push(payload);
        Ok(())
    }
}

/// Replays pre-built batches, then reports the source as drained.
pub(crate) struct VecSource {
    batches: VecDeque<Vec<RawDelivery>>,
}

impl VecSource {
    pub fn new(batches: Vec<Vec<RawDelivery>>) -> Self {
        Self {
            batches: batches.into(),
        }
    }
}

#[async_trait]
impl BrokerSource for VecSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<RawDelivery>>, SourceError> {
        Ok(self.batches.pop_front())
    }
}

pub(crate) fn sample_record(message_id: u64) -> CollectorRecord {
    let now = Utc::now();
    CollectorRecord {
        cloud_provider: CloudProvider::Azure,
        test_run: TestRunId::from("abc"),
        trigger: "ServiceBus".to_string(),
        message_processed_time: now,
        properties: RecordProperties {
            instance_id: InstanceId::process(),
            execution_id: ExecutionId::generate(),
            elapsed_time_ms: 1.25,
            client_enqueue_time_utc: now,
            system_enqueued_time: None,
            message_id: MessageIdValue::Number(message_id),
            dequeued_time: now,
            language: LANGUAGE.to_string(),
        },
    }
}
