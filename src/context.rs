//! Process-wide state shared by the commands.

use std::sync::Arc;

use anyhow::Context;
use bench_consumer::{CollectorForwarder, Normalizer};
use bench_core::{AttributeCarrier, BrokerKind};
use bench_producer::{BrokerSink, FanOutOrchestrator, LoadEntryPoint, DEFAULT_PAYLOAD};
use bytes::Bytes;
use tracing::info;

use crate::config::BenchConfig;

/// Built once at startup from the resolved configuration.
///
/// Holds the message payload so it is read from disk only once, and hands out
/// the producer and consumer components wired to that configuration.
pub struct BenchContext {
    config: BenchConfig,
    payload: Bytes,
}

impl BenchContext {
    pub async fn new(config: BenchConfig) -> anyhow::Result<Self> {
        let payload = match &config.payload_file {
            Some(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .with_context(|| format!("Failed to read payload file {}", path.display()))?;
                info!("Loaded {} byte payload from {}", bytes.len(), path.display());
                Bytes::from(bytes)
            }
            None => Bytes::from_static(DEFAULT_PAYLOAD.as_bytes()),
        };

        Ok(Self { config, payload })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn broker(&self) -> BrokerKind {
        self.config.broker
    }

    pub fn carrier(&self) -> AttributeCarrier {
        self.config.broker.default_carrier()
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn entry_point(&self, sink: Arc<dyn BrokerSink>) -> LoadEntryPoint {
        LoadEntryPoint::new(
            FanOutOrchestrator::new(sink)
                .with_max_attempts(self.config.max_attempts)
                .with_payload(self.payload.clone()),
        )
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.config.broker)
    }

    pub async fn forwarder(&self) -> anyhow::Result<CollectorForwarder> {
        let sink = self
            .config
            .consumer
            .collector
            .build()
            .await
            .with_context(|| format!("Failed to open collector {}", self.config.consumer.collector))?;
        Ok(CollectorForwarder::new(sink))
    }
}
