//! CLI argument definitions for the producer side.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use bench_core::{BenchmarkRequest, RequestError};
use clap::Args;

/// The load to generate.
#[derive(Args, Clone, Debug)]
pub struct LoadArgs {
    /// Raw JSON benchmark request, e.g. '{"NumberOfMessages":5,"WorkTime":50}'.
    /// Takes precedence over the individual count flags.
    #[arg(long, env = "BENCH_REQUEST")]
    pub request: Option<String>,

    /// Messages to send per group
    #[arg(long = "messages", env = "BENCH_MESSAGES_PER_GROUP", default_value = "10")]
    pub messages_per_group: u32,

    /// Number of dispatch groups (sessions / partitions / message groups)
    #[arg(long, env = "BENCH_GROUPS", default_value = "1")]
    pub groups: u32,

    /// Simulated consumer work time per message in milliseconds
    #[arg(long = "work-time", env = "BENCH_WORK_TIME_MS")]
    pub work_time_ms: Option<i64>,
}

impl LoadArgs {
    pub fn to_request(&self) -> Result<BenchmarkRequest, RequestError> {
        match &self.request {
            Some(body) => BenchmarkRequest::from_json(body),
            None => {
                let request =
                    BenchmarkRequest::new(self.messages_per_group, self.groups, self.work_time_ms);
                request.validate()?;
                Ok(request)
            }
        }
    }
}

/// Dispatch tuning. Unset values fall back to the config file, then to defaults.
#[derive(Args, Clone, Debug, Default)]
pub struct DispatchArgs {
    /// Send attempts per message before giving up
    #[arg(long, env = "BENCH_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// How long to wait for the run before reporting it as still running (e.g. "90s", "2m")
    #[arg(long, env = "BENCH_WAIT_TIMEOUT", value_parser = parse_duration)]
    pub wait_timeout: Option<Duration>,

    /// File whose contents are sent as every message body
    #[arg(long, env = "BENCH_PAYLOAD_FILE")]
    pub payload_file: Option<PathBuf>,
}

/// Parse duration string like "30m", "1h", "90s".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix('h') {
        (stripped, 3600)
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, 60)
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, 1)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid duration: {s}"))?;

    let secs = num
        .checked_mul(multiplier)
        .with_context(|| format!("Duration out of range: {s}"))?;
    Ok(Duration::from_secs(secs))
}
