//! Configuration file support.
//!
//! Every setting has a default, so the file is optional and may name only the
//! keys it wants to change. CLI flags are applied on top of the loaded file.
//!
//! ```toml
//! broker = "service-bus"
//! max_attempts = 10
//! wait_timeout = "2m"
//! payload_file = "payload.txt"
//!
//! [consumer]
//! concurrency = 16
//! collector = "records.jsonl"
//!
//! [loopback]
//! capacity = 1024
//!
//! [spool]
//! path = "spool.jsonl"
//! batch_size = 100
//! fail_first_attempts = 0
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use bench_consumer::{CollectorArgs, CollectorTarget, DEFAULT_CONCURRENCY};
use bench_core::BrokerKind;
use bench_producer::{parse_duration, DispatchArgs, DEFAULT_MAX_ATTEMPTS, DEFAULT_WAIT_TIMEOUT};
use serde::{Deserialize, Deserializer};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    /// Broker the adapters emulate; decides grouping, trigger label and attribute carrier.
    #[serde(deserialize_with = "from_str")]
    pub broker: BrokerKind,
    pub max_attempts: u32,
    #[serde(deserialize_with = "duration")]
    pub wait_timeout: Duration,
    /// File whose contents are sent as every message body.
    pub payload_file: Option<PathBuf>,
    pub consumer: ConsumerConfig,
    pub loopback: LoopbackConfig,
    pub spool: SpoolConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsumerConfig {
    pub concurrency: usize,
    #[serde(deserialize_with = "from_str")]
    pub collector: CollectorTarget,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopbackConfig {
    /// Deliveries buffered in the channel before senders wait.
    pub capacity: usize,
    /// Send attempts to fail before the channel starts accepting.
    pub fail_first_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpoolConfig {
    pub path: PathBuf,
    /// Deliveries handed to the consumer per batch.
    pub batch_size: usize,
    pub fail_first_attempts: u32,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            broker: BrokerKind::Loopback,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            payload_file: None,
            consumer: ConsumerConfig::default(),
            loopback: LoopbackConfig::default(),
            spool: SpoolConfig::default(),
        }
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            collector: CollectorTarget::Stdout,
        }
    }
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            fail_first_attempts: 0,
        }
    }
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("spool.jsonl"),
            batch_size: 100,
            fail_first_attempts: 0,
        }
    }
}

impl BenchConfig {
    /// Load a TOML configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn apply_dispatch_args(&mut self, args: &DispatchArgs) {
        if let Some(max_attempts) = args.max_attempts {
            self.max_attempts = max_attempts;
        }
        if let Some(wait_timeout) = args.wait_timeout {
            self.wait_timeout = wait_timeout;
        }
        if let Some(payload_file) = &args.payload_file {
            self.payload_file = Some(payload_file.clone());
        }
    }

    pub fn apply_collector_args(&mut self, args: &CollectorArgs) {
        if let Some(collector) = &args.collector {
            self.consumer.collector = collector.clone();
        }
        if let Some(concurrency) = args.concurrency {
            self.consumer.concurrency = concurrency;
        }
    }
}

fn from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(|e| serde::de::Error::custom(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = BenchConfig::from_toml("").unwrap();
        assert_eq!(config, BenchConfig::default());
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.wait_timeout, Duration::from_secs(120));
        assert_eq!(config.broker, BrokerKind::Loopback);
    }

    #[test]
    fn test_full_file() {
        let config = BenchConfig::from_toml(
            r#"
broker = "pubsub"
max_attempts = 3
wait_timeout = "90s"
payload_file = "body.txt"

[consumer]
concurrency = 4
collector = "http://collector:8080/records"

[loopback]
capacity = 8

[spool]
path = "/tmp/spool.jsonl"
batch_size = 25
fail_first_attempts = 2
"#,
        )
        .unwrap();

        assert_eq!(config.broker, BrokerKind::PubSub);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.wait_timeout, Duration::from_secs(90));
        assert_eq!(config.payload_file, Some(PathBuf::from("body.txt")));
        assert_eq!(config.consumer.concurrency, 4);
        assert_eq!(
            config.consumer.collector,
            CollectorTarget::Http("http://collector:8080/records".to_string())
        );
        assert_eq!(config.loopback.capacity, 8);
        assert_eq!(config.loopback.fail_first_attempts, 0);
        assert_eq!(config.spool.batch_size, 25);
        assert_eq!(config.spool.fail_first_attempts, 2);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(BenchConfig::from_toml(r#"broker = "carrier-pigeon""#).is_err());
        assert!(BenchConfig::from_toml(r#"wait_timeout = "soon""#).is_err());
        assert!(BenchConfig::from_toml("retries = 3").is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = BenchConfig::from_toml("max_attempts = 3\nwait_timeout = \"1h\"").unwrap();

        config.apply_dispatch_args(&DispatchArgs {
            max_attempts: Some(7),
            wait_timeout: None,
            payload_file: None,
        });
        config.apply_collector_args(&CollectorArgs {
            collector: None,
            concurrency: Some(2),
        });

        assert_eq!(config.max_attempts, 7);
        assert_eq!(config.wait_timeout, Duration::from_secs(3600));
        assert_eq!(config.consumer.concurrency, 2);
        assert_eq!(config.consumer.collector, CollectorTarget::Stdout);
    }

    #[test]
    fn test_load_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_attempts = \"many\"").unwrap();

        let err = BenchConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));

        assert!(BenchConfig::load(Path::new("/nonexistent/bench.toml")).is_err());
    }
}
