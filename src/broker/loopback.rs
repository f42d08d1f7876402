//! In-process broker backed by a bounded tokio channel.

use std::sync::Arc;

use async_trait::async_trait;
use bench_consumer::{BrokerSource, SourceError};
use bench_core::{AttributeCarrier, BrokerKind, OutboundMessage, RawDelivery};
use bench_producer::{BrokerSink, SinkError};
use chrono::Utc;
use tokio::sync::mpsc;

use super::FailureInjector;

/// Largest batch handed out by [`LoopbackSource::next_batch`].
const MAX_BATCH: usize = 256;

/// Create a connected sink/source pair emulating `kind`.
///
/// The source reports itself drained once every clone of the sink is dropped
/// and the channel is empty.
pub fn loopback_channel(
    kind: BrokerKind,
    capacity: usize,
    fail_first_attempts: u32,
) -> (LoopbackSink, LoopbackSource) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let sink = LoopbackSink {
        kind,
        carrier: kind.default_carrier(),
        tx,
        failures: Arc::new(FailureInjector::new(fail_first_attempts)),
    };
    (sink, LoopbackSource { rx })
}

#[derive(Clone)]
pub struct LoopbackSink {
    kind: BrokerKind,
    carrier: AttributeCarrier,
    tx: mpsc::Sender<RawDelivery>,
    failures: Arc<FailureInjector>,
}

#[async_trait]
impl BrokerSink for LoopbackSink {
    fn kind(&self) -> BrokerKind {
        self.kind
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        self.failures.check()?;
        let delivery = RawDelivery::from_outbound(message, self.carrier, Some(Utc::now()));
        self.tx
            .send(delivery)
            .await
            .map_err(|_| SinkError::Rejected("loopback channel closed".to_string()))
    }
}

pub struct LoopbackSource {
    rx: mpsc::Receiver<RawDelivery>,
}

#[async_trait]
impl BrokerSource for LoopbackSource {
    async fn next_batch(&mut self) -> Result<Option<Vec<RawDelivery>>, SourceError> {
        let Some(first) = self.rx.recv().await else {
            return Ok(None);
        };

        let mut batch = vec![first];
        while batch.len() < MAX_BATCH {
            match self.rx.try_recv() {
                Ok(delivery) => batch.push(delivery),
                Err(_) => break,
            }
        }
        Ok(Some(batch))
    }
}
