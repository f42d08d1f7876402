//! Pull loop that drives deliveries from a broker into the collector.
//!
//! ```text
//! BrokerSource ──► InboundMessage::from_delivery ──► Normalizer ──► CollectorForwarder
//!  (batches)        (malformed → dropped)            (≤ concurrency in flight)
//! ```

use async_trait::async_trait;
use bench_core::{AttributeCarrier, InboundMessage, RawDelivery};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::forwarder::CollectorForwarder;
use crate::normalizer::Normalizer;

/// Default number of deliveries normalized at once.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Trait for pulling deliveries from a broker.
#[async_trait]
pub trait BrokerSource: Send {
    /// Next batch of deliveries, or `None` once the source is drained or closed.
    async fn next_batch(&mut self) -> Result<Option<Vec<RawDelivery>>, SourceError>;
}

/// Counters for one consumer run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub received: u64,
    pub forwarded: u64,
    /// Deliveries that could not be read as benchmark messages.
    pub dropped: u64,
    pub forward_failures: u64,
}

enum Processed {
    Forwarded,
    Dropped,
    ForwardFailed,
}

/// Drain `source`, normalizing and forwarding every delivery.
///
/// Malformed deliveries are logged and counted, never retried. Up to
/// `concurrency` deliveries of a batch are in flight at once.
pub async fn run_consumer(
    source: &mut dyn BrokerSource,
    carrier: AttributeCarrier,
    normalizer: &Normalizer,
    forwarder: &CollectorForwarder,
    concurrency: usize,
) -> Result<ConsumerStats, SourceError> {
    let concurrency = concurrency.max(1);
    let mut stats = ConsumerStats::default();

    info!(
        "Consuming {} deliveries (carrier: {:?}, concurrency: {}) into {}",
        normalizer.broker(),
        carrier,
        concurrency,
        forwarder.sink_name()
    );

    while let Some(batch) = source.next_batch().await? {
        debug!("Received batch of {} deliveries", batch.len());
        stats.received += batch.len() as u64;

        let outcomes: Vec<Processed> = stream::iter(batch)
            .map(|delivery| process(delivery, carrier, normalizer, forwarder))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Processed::Forwarded => stats.forwarded += 1,
                Processed::Dropped => stats.dropped += 1,
                Processed::ForwardFailed => stats.forward_failures += 1,
            }
        }
    }

    info!(
        "Source drained: {} received, {} forwarded, {} dropped, {} forward failure(s)",
        stats.received, stats.forwarded, stats.dropped, stats.forward_failures
    );
    Ok(stats)
}

async fn process(
    delivery: RawDelivery,
    carrier: AttributeCarrier,
    normalizer: &Normalizer,
    forwarder: &CollectorForwarder,
) -> Processed {
    let inbound = match InboundMessage::from_delivery(&delivery, carrier) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!(
                "Dropping delivery {}: {}",
                delivery.broker_message_id.as_deref().unwrap_or("<unknown>"),
                e
            );
            return Processed::Dropped;
        }
    };

    let record = normalizer.normalize(&inbound).await;
    match forwarder.forward(&record).await {
        Ok(()) => Processed::Forwarded,
        Err(e) => {
            warn!(
                "Failed to forward record for message {} of run {}: {}",
                inbound.message_id, inbound.test_run_id, e
            );
            Processed::ForwardFailed
        }
    }
}
