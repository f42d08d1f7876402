use async_trait::async_trait;

use crate::error::ForwardError;
use crate::forwarder::CollectorSink;

/// Prints one JSON line per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutCollectorSink;

#[async_trait]
impl CollectorSink for StdoutCollectorSink {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn submit(&self, payload: String) -> Result<(), ForwardError> {
        println!("{payload}");
        Ok(())
    }
}
