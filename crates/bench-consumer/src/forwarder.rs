//! Hand-off of collector records to the external telemetry collector.

use std::sync::Arc;

use async_trait::async_trait;
use bench_core::CollectorRecord;
use tracing::trace;

use crate::error::ForwardError;

/// Trait for collector endpoints.
///
/// Receives already-serialized records. Implementations make exactly one
/// attempt per call.
#[async_trait]
pub trait CollectorSink: Send + Sync {
    /// Short label used in log output.
    fn name(&self) -> &str;

    async fn submit(&self, payload: String) -> Result<(), ForwardError>;
}

/// Serializes records and submits them to a [`CollectorSink`].
///
/// No retry: a failed submission is reported to the caller and the record is
/// lost.
#[derive(Clone)]
pub struct CollectorForwarder {
    sink: Arc<dyn CollectorSink>,
}

impl CollectorForwarder {
    pub fn new(sink: Arc<dyn CollectorSink>) -> Self {
        Self { sink }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub async fn forward(&self, record: &CollectorRecord) -> Result<(), ForwardError> {
        let payload = record.to_json()?;
        self.sink.submit(payload).await?;
        trace!(
            "Forwarded record for message {} of run {} to {}",
            record.properties.message_id,
            record.test_run,
            self.sink.name()
        );
        Ok(())
    }
}
