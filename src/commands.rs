//! The three ways of running the harness.
//!
//! - [`run_loopback`] - producer and consumer in one process over an in-memory channel
//! - [`produce_to_spool`] - producer only, appending deliveries to a spool file
//! - [`consume_spool`] - consumer only, replaying a spool file

use std::sync::Arc;

use anyhow::Context;
use bench_consumer::{run_consumer, ConsumerStats};
use bench_core::{BenchmarkRequest, BenchmarkResponse};
use bench_producer::{rejection, LoadEntryPoint};
use serde::Serialize;
use tracing::info;

use crate::broker::{loopback_channel, SpoolSink, SpoolSource};
use crate::context::BenchContext;

/// Outcome of a command, printed as JSON by the binary.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: u16,
    pub response: BenchmarkResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<ConsumerStats>,
}

impl RunSummary {
    pub fn is_error(&self) -> bool {
        self.response.is_error()
    }
}

/// Start `request` on `entry` and wait for it as configured.
async fn dispatch(
    ctx: &BenchContext,
    entry: LoadEntryPoint,
    request: &BenchmarkRequest,
) -> (u16, BenchmarkResponse) {
    let started = entry.start(request);
    // The running task keeps its own handle on the sink; dropping ours lets
    // the sink close as soon as dispatch finishes.
    drop(entry);

    match started {
        Ok(mut handle) => handle.wait(ctx.config().wait_timeout).await.into_response(),
        Err(e) => rejection(&e),
    }
}

/// Produce and consume in one process through the loopback channel.
///
/// Returns once every dispatched message has been consumed, even if the wait
/// for the producer timed out first.
pub async fn run_loopback(
    ctx: &BenchContext,
    request: &BenchmarkRequest,
) -> anyhow::Result<RunSummary> {
    let config = ctx.config();
    let (sink, mut source) = loopback_channel(
        ctx.broker(),
        config.loopback.capacity,
        config.loopback.fail_first_attempts,
    );

    let normalizer = ctx.normalizer();
    let forwarder = ctx.forwarder().await?;
    let carrier = ctx.carrier();
    let concurrency = config.consumer.concurrency;
    let consumer = tokio::spawn(async move {
        run_consumer(&mut source, carrier, &normalizer, &forwarder, concurrency).await
    });

    let (status, response) = dispatch(ctx, ctx.entry_point(Arc::new(sink)), request).await;
    info!("Producer returned status {}; draining consumer", status);

    let stats = consumer.await.context("Consumer task failed")??;

    Ok(RunSummary {
        status,
        response,
        consumer: Some(stats),
    })
}

/// Dispatch `request` into the configured spool file.
pub async fn produce_to_spool(
    ctx: &BenchContext,
    request: &BenchmarkRequest,
) -> anyhow::Result<RunSummary> {
    let config = ctx.config();
    let sink = SpoolSink::open(&config.spool.path, ctx.broker(), config.spool.fail_first_attempts)
        .await?;
    info!("Spooling {} deliveries to {}", ctx.broker(), sink.path().display());

    let (status, response) = dispatch(ctx, ctx.entry_point(Arc::new(sink)), request).await;

    Ok(RunSummary {
        status,
        response,
        consumer: None,
    })
}

/// Replay the configured spool file through the consumer pipeline.
pub async fn consume_spool(ctx: &BenchContext) -> anyhow::Result<ConsumerStats> {
    let config = ctx.config();
    let mut source = SpoolSource::open(&config.spool.path, config.spool.batch_size).await?;
    let forwarder = ctx.forwarder().await?;

    let stats = run_consumer(
        &mut source,
        ctx.carrier(),
        &ctx.normalizer(),
        &forwarder,
        config.consumer.concurrency,
    )
    .await
    .with_context(|| format!("Failed to consume spool {}", config.spool.path.display()))?;

    Ok(stats)
}
