//! Command-line interface for the broker latency benchmark harness
//!
//! # Usage Examples
//!
//! ## Single process
//! ```bash
//! # 4 sessions x 100 messages, 50ms simulated work per message
//! latency-bench run --broker service-bus --messages 100 --groups 4 --work-time 50
//!
//! # Raw request body, records appended to a file
//! latency-bench run --request '{"NumberOfMessages":5,"WorkTime":50}' --collector records.jsonl
//! ```
//!
//! ## Separate producer and consumer
//! ```bash
//! latency-bench produce --broker sqs --spool spool.jsonl --messages 1000 --groups 10
//! latency-bench consume --broker sqs --spool spool.jsonl --collector http://localhost:8080/records
//! ```
//!
//! Settings can also come from a TOML file passed with `--config`; flags win.

use std::path::PathBuf;

use bench_consumer::CollectorArgs;
use bench_core::BrokerKind;
use bench_producer::{DispatchArgs, LoadArgs};
use broker_latency_bench::{consume_spool, produce_to_spool, run_loopback, BenchConfig, BenchContext};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "latency-bench")]
#[command(about = "Measure end-to-end message latency across message brokers")]
#[command(long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "BENCH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce and consume in one process over an in-memory channel
    Run {
        /// Broker to emulate
        #[arg(long, env = "BENCH_BROKER")]
        broker: Option<BrokerKind>,

        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        dispatch: DispatchArgs,

        #[command(flatten)]
        collector: CollectorArgs,

        /// Fail this many send attempts before the channel accepts messages
        #[arg(long)]
        fail_first_attempts: Option<u32>,
    },

    /// Send load into a spool file
    Produce {
        /// Broker to emulate
        #[arg(long, env = "BENCH_BROKER")]
        broker: Option<BrokerKind>,

        /// Spool file to append to
        #[arg(long, env = "BENCH_SPOOL")]
        spool: Option<PathBuf>,

        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        dispatch: DispatchArgs,

        /// Fail this many send attempts before the spool accepts messages
        #[arg(long)]
        fail_first_attempts: Option<u32>,
    },

    /// Replay a spool file through the consumer pipeline
    Consume {
        /// Broker to emulate
        #[arg(long, env = "BENCH_BROKER")]
        broker: Option<BrokerKind>,

        /// Spool file to read
        #[arg(long, env = "BENCH_SPOOL")]
        spool: Option<PathBuf>,

        /// Deliveries read from the spool per batch
        #[arg(long)]
        batch_size: Option<usize>,

        #[command(flatten)]
        collector: CollectorArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = BenchConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            broker,
            load,
            dispatch,
            collector,
            fail_first_attempts,
        } => {
            if let Some(broker) = broker {
                config.broker = broker;
            }
            if let Some(n) = fail_first_attempts {
                config.loopback.fail_first_attempts = n;
            }
            config.apply_dispatch_args(&dispatch);
            config.apply_collector_args(&collector);

            let request = load.to_request()?;
            let ctx = BenchContext::new(config).await?;
            let summary = run_loopback(&ctx, &request).await?;

            eprintln!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.is_error() {
                anyhow::bail!("Benchmark run failed with status {}", summary.status);
            }
        }
        Commands::Produce {
            broker,
            spool,
            load,
            dispatch,
            fail_first_attempts,
        } => {
            if let Some(broker) = broker {
                config.broker = broker;
            }
            if let Some(spool) = spool {
                config.spool.path = spool;
            }
            if let Some(n) = fail_first_attempts {
                config.spool.fail_first_attempts = n;
            }
            config.apply_dispatch_args(&dispatch);

            let request = load.to_request()?;
            let ctx = BenchContext::new(config).await?;
            let summary = produce_to_spool(&ctx, &request).await?;

            println!("{}", serde_json::to_string_pretty(&summary)?);
            if summary.is_error() {
                anyhow::bail!("Benchmark run failed with status {}", summary.status);
            }
        }
        Commands::Consume {
            broker,
            spool,
            batch_size,
            collector,
        } => {
            if let Some(broker) = broker {
                config.broker = broker;
            }
            if let Some(spool) = spool {
                config.spool.path = spool;
            }
            if let Some(batch_size) = batch_size {
                config.spool.batch_size = batch_size;
            }
            config.apply_collector_args(&collector);

            let ctx = BenchContext::new(config).await?;
            let stats = consume_spool(&ctx).await?;

            eprintln!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
