//! Fan-out of a benchmark run over independent dispatch groups.
//!
//! The fan-out width matches the broker's own concurrency unit (session,
//! partition, message group) so each group can later be measured on its own
//! for per-partition skew.
//!
//! ```text
//!                    fan(total_units, per_unit_count)
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          ▼                      ▼                      ▼
//!   ┌─────────────┐        ┌─────────────┐        ┌─────────────┐
//!   │  group 1    │        │  group 2    │        │  group N    │
//!   │ msgs 1..=n  │        │ msgs 1..=n  │        │ msgs 1..=n  │
//!   └──────┬──────┘        └──────┬──────┘        └──────┬──────┘
//!          │ send_with_retry      │                      │
//!          ▼                      ▼                      ▼
//!                            BrokerSink
//! ```
//!
//! A message that exhausts its retries does not stop its siblings, but it
//! marks its group as failed, and any failed group fails the whole run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bench_core::{BrokerKind, DispatchGroup, GroupId, TestRunId};
use bytes::Bytes;
use tracing::{debug, error, info, trace};

use crate::dispatcher::{send_with_retry, SendOutcome, DEFAULT_MAX_ATTEMPTS};
use crate::error::OrchestrationError;
use crate::sink::BrokerSink;

/// Body sent when no payload file is configured.
pub const DEFAULT_PAYLOAD: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud \
exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor in \
reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur.";

/// Dispatch results of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub group_id: GroupId,
    pub message_count: u32,
    pub delivered: u32,
    /// Messages dropped after running out of attempts.
    pub exhausted: u32,
    /// Messages the sink refused without retry.
    pub rejected: u32,
    /// Send attempts across all messages of the group.
    pub attempts: u64,
}

impl GroupReport {
    fn new(group: &DispatchGroup) -> Self {
        Self {
            group_id: group.group_id.clone(),
            message_count: group.message_count,
            delivered: 0,
            exhausted: 0,
            rejected: 0,
            attempts: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.delivered == self.message_count
    }
}

/// Dispatch results of a whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    pub test_run_id: TestRunId,
    pub groups: Vec<GroupReport>,
    pub duration: Duration,
}

impl FanOutReport {
    pub fn delivered(&self) -> u64 {
        self.groups.iter().map(|g| u64::from(g.delivered)).sum()
    }

    pub fn dropped(&self) -> u64 {
        self.groups
            .iter()
            .map(|g| u64::from(g.exhausted + g.rejected))
            .sum()
    }

    pub fn attempts(&self) -> u64 {
        self.groups.iter().map(|g| g.attempts).sum()
    }

    pub fn failed_groups(&self) -> usize {
        self.groups.iter().filter(|g| !g.succeeded()).count()
    }

    /// Calculate messages per second.
    pub fn messages_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.delivered() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Splits a run into dispatch groups and drives them concurrently.
pub struct FanOutOrchestrator {
    sink: Arc<dyn BrokerSink>,
    max_attempts: u32,
    payload: Bytes,
}

impl FanOutOrchestrator {
    pub fn new(sink: Arc<dyn BrokerSink>) -> Self {
        Self {
            sink,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            payload: Bytes::from_static(DEFAULT_PAYLOAD.as_bytes()),
        }
    }

    /// Set the per-message attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the body sent with every message.
    pub fn with_payload(mut self, payload: Bytes) -> Self {
        self.payload = payload;
        self
    }

    pub fn broker(&self) -> BrokerKind {
        self.sink.kind()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Generate and dispatch `total_units × per_unit_count` messages.
    ///
    /// One task is spawned per group and all of them are awaited. The run
    /// succeeds only if every group delivered every message. Brokers without
    /// groups accept a single unit, since their messages carry nothing but
    /// the message id to tell groups apart.
    pub async fn fan(
        &self,
        total_units: u32,
        per_unit_count: u32,
        test_run_id: TestRunId,
        work_time_ms: Option<u32>,
    ) -> Result<FanOutReport, OrchestrationError> {
        let start = Instant::now();
        let broker = self.broker();
        let unit = broker.group_unit();

        if !broker.is_grouped() && total_units > 1 {
            return Err(OrchestrationError::UngroupedFanOut {
                test_run_id,
                broker,
                total_units,
            });
        }

        info!(
            "Run {}: dispatching {} {}(s) x {} message(s) to {} (max attempts: {})",
            test_run_id, total_units, unit, per_unit_count, broker, self.max_attempts
        );

        let mut handles = Vec::with_capacity(total_units as usize);
        for _ in 0..total_units {
            let group = DispatchGroup::new(test_run_id.clone(), per_unit_count, work_time_ms);
            trace!("Kicked off message creation for {} {}...", unit, group.group_id);

            handles.push(tokio::spawn(dispatch_group(
                group,
                Arc::clone(&self.sink),
                broker.is_grouped(),
                self.max_attempts,
                self.payload.clone(),
            )));
        }

        let mut groups = Vec::with_capacity(handles.len());
        let mut task_failures = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(report) => groups.push(report),
                Err(e) => {
                    error!("Dispatch task for run {} failed: {}", test_run_id, e);
                    task_failures.push(e.to_string());
                }
            }
        }

        let report = FanOutReport {
            test_run_id: test_run_id.clone(),
            groups,
            duration: start.elapsed(),
        };

        if !task_failures.is_empty() {
            return Err(OrchestrationError::TaskFailed {
                test_run_id,
                reason: task_failures.join("; "),
            });
        }

        let failed_groups = report.failed_groups();
        if failed_groups > 0 {
            for group in report.groups.iter().filter(|g| !g.succeeded()) {
                error!(
                    "Run {}: {} {} delivered {}/{} message(s) ({} exhausted, {} rejected)",
                    test_run_id,
                    unit,
                    group.group_id,
                    group.delivered,
                    group.message_count,
                    group.exhausted,
                    group.rejected
                );
            }
            return Err(OrchestrationError::GroupsFailed {
                test_run_id,
                failed_groups,
                total_groups: report.groups.len(),
            });
        }

        info!(
            "Run {}: dispatched {} message(s) in {:?} ({:.2} msg/sec, {} attempt(s))",
            report.test_run_id,
            report.delivered(),
            report.duration,
            report.messages_per_second(),
            report.attempts()
        );

        Ok(report)
    }
}

/// Expand one group into messages and send them one after another.
async fn dispatch_group(
    group: DispatchGroup,
    sink: Arc<dyn BrokerSink>,
    tag_group: bool,
    max_attempts: u32,
    payload: Bytes,
) -> GroupReport {
    let unit = sink.kind().group_unit();
    let mut report = GroupReport::new(&group);

    for message in group.messages(tag_group, &payload) {
        let message_id = message.broker_message_id();
        let outcome = send_with_retry(message, sink.as_ref(), max_attempts).await;
        report.attempts += u64::from(outcome.attempts());

        match outcome {
            SendOutcome::Delivered { attempts } => {
                report.delivered += 1;
                trace!(
                    "Posted message {} for {} '{}' in {} attempt(s)",
                    message_id,
                    unit,
                    group.group_id,
                    attempts
                );
            }
            SendOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                report.exhausted += 1;
                error!(
                    "Unable to post message {} to {} '{}' after {} attempt(s). Giving up: {}",
                    message_id, unit, group.group_id, attempts, last_error
                );
            }
            SendOutcome::Unexpected { attempts, error } => {
                report.rejected += 1;
                error!(
                    "Message {} for {} '{}' rejected on attempt {}: {}",
                    message_id, unit, group.group_id, attempts, error
                );
            }
        }
    }

    debug!(
        "{} {} finished: {}/{} delivered",
        unit, group.group_id, report.delivered, report.message_count
    );
    report
}
