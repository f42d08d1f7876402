//! Conversion of inbound deliveries into collector records.

use std::sync::Arc;
use std::time::Duration;

use bench_core::{
    BrokerKind, CollectorRecord, ExecutionId, InboundMessage, InstanceId, RecordProperties,
    LANGUAGE,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Builds one [`CollectorRecord`] per inbound message.
///
/// Latency is captured the moment normalization starts. The simulated work
/// requested by the producer runs afterwards, so it shows up only in
/// `MessageProcessedTime` and never in `ElapsedTimeMs`.
#[derive(Clone)]
pub struct Normalizer {
    broker: BrokerKind,
    instance_id: InstanceId,
    clock: Arc<dyn Clock>,
}

impl Normalizer {
    pub fn new(broker: BrokerKind) -> Self {
        Self {
            broker,
            instance_id: InstanceId::process(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_instance_id(mut self, instance_id: InstanceId) -> Self {
        self.instance_id = instance_id;
        self
    }

    pub fn broker(&self) -> BrokerKind {
        self.broker
    }

    pub async fn normalize(&self, msg: &InboundMessage) -> CollectorRecord {
        let dequeued_time = self.clock.now();
        let elapsed_time_ms = elapsed_ms(msg.client_enqueue_time_utc, dequeued_time);

        tracing::info!(
            target: "bench::metrics",
            metric = "messageProcessTimeMs",
            value = elapsed_time_ms,
            test_run_id = %msg.test_run_id,
            message_id = %msg.message_id,
            partition_id = msg.partition_id.as_deref().unwrap_or(""),
            trigger = self.broker.trigger_label(),
            enqueued_time = %msg.client_enqueue_time_str(),
            dequeued_time = %dequeued_time.to_rfc3339(),
            language = LANGUAGE,
            "messageProcessTimeMs"
        );

        if let Some(work_time_ms) = msg.consumer_work_time_ms {
            debug!(
                "Simulating {}ms of work for message {}",
                work_time_ms, msg.message_id
            );
            tokio::time::sleep(Duration::from_millis(u64::from(work_time_ms))).await;
        }

        CollectorRecord {
            cloud_provider: self.broker.cloud_provider(),
            test_run: msg.test_run_id.clone(),
            trigger: self.broker.trigger_label().to_string(),
            message_processed_time: self.clock.now(),
            properties: RecordProperties {
                instance_id: self.instance_id.clone(),
                execution_id: ExecutionId::generate(),
                elapsed_time_ms,
                client_enqueue_time_utc: msg.client_enqueue_time_utc,
                system_enqueued_time: msg.system_enqueued_time,
                message_id: msg.message_id.clone(),
                dequeued_time,
                language: LANGUAGE.to_string(),
            },
        }
    }
}

/// Fractional milliseconds from `from` to `to`. Negative under clock skew.
fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1000.0,
        None => delta.num_milliseconds() as f64,
    }
}
