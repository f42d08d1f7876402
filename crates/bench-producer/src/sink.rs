//! BrokerSink trait definition.

use async_trait::async_trait;
use bench_core::{BrokerKind, OutboundMessage};

use crate::error::SinkError;

/// Trait for handing messages to a broker.
///
/// One implementation exists per backend. The handle is built once at process
/// start and shared by every dispatch task, so implementations must be safe to
/// call concurrently and keep no per-message state.
#[async_trait]
pub trait BrokerSink: Send + Sync {
    /// The backend this sink publishes to.
    fn kind(&self) -> BrokerKind;

    /// Make one attempt at publishing `message`.
    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError>;
}
