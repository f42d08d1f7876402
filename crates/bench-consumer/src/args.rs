//! CLI argument definitions for the consumer side.

use clap::Args;

use crate::sinks::CollectorTarget;

/// Collector and normalization settings. Unset values fall back to the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct CollectorArgs {
    /// Collector target: "stdout", a JSONL file path, or an http(s):// endpoint
    #[arg(long, env = "BENCH_COLLECTOR")]
    pub collector: Option<CollectorTarget>,

    /// Deliveries normalized concurrently
    #[arg(long, env = "BENCH_CONSUMER_CONCURRENCY")]
    pub concurrency: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        collector: CollectorArgs,
    }

    #[test]
    fn test_collector_flags() {
        let cli = TestCli::parse_from([
            "test",
            "--collector",
            "records.jsonl",
            "--concurrency",
            "8",
        ]);
        assert_eq!(
            cli.collector.collector,
            Some(CollectorTarget::Jsonl(PathBuf::from("records.jsonl")))
        );
        assert_eq!(cli.collector.concurrency, Some(8));
    }

    #[test]
    fn test_flags_are_optional() {
        let cli = TestCli::parse_from(["test"]);
        assert!(cli.collector.collector.is_none());
        assert!(cli.collector.concurrency.is_none());
    }
}
