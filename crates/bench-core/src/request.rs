//! Benchmark request and response contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::broker::BrokerKind;
use crate::ids::TestRunId;

/// Upper bound on `NumberOfGroups`; each group is one spawned task.
pub const MAX_GROUPS: u32 = 10_000;

/// Upper bound on messages per group; a group's messages are built up front.
pub const MAX_MESSAGES_PER_GROUP: u32 = 1_000_000;

/// Errors raised while reading a benchmark request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Invalid request body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("NumberOfMessages must be at least 1")]
    NoMessages,

    #[error("NumberOfGroups must be at least 1")]
    NoGroups,

    #[error("NumberOfGroups must be at most {max}, got {0}", max = MAX_GROUPS)]
    TooManyGroups(u32),

    #[error("NumberOfMessages must be at most {max}, got {0}", max = MAX_MESSAGES_PER_GROUP)]
    TooManyMessages(u32),

    #[error("{broker} has no groups; NumberOfGroups must be 1, got {groups}")]
    GroupsUnsupported { broker: BrokerKind, groups: u32 },
}

fn default_groups() -> u32 {
    1
}

/// A request to generate load.
///
/// Every broker names its fields after its own concurrency unit, so the
/// per-broker spellings are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRequest {
    /// Messages per group.
    #[serde(
        rename = "NumberOfMessages",
        alias = "NumberOfMessagesPerGroup",
        alias = "NumberOfMessagesPerSession",
        alias = "NumberOfMessagesPerPartition"
    )]
    pub messages_per_group: u32,

    #[serde(
        rename = "NumberOfGroups",
        alias = "NumberOfPartitions",
        alias = "NumberOfSessions",
        default = "default_groups"
    )]
    pub groups: u32,

    /// Simulated consumer work time in milliseconds.
    #[serde(rename = "WorkTime", default, skip_serializing_if = "Option::is_none")]
    pub work_time_ms: Option<i64>,
}

impl BenchmarkRequest {
    pub fn new(messages_per_group: u32, groups: u32, work_time_ms: Option<i64>) -> Self {
        Self {
            messages_per_group,
            groups,
            work_time_ms,
        }
    }

    /// Parse and validate a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        let request: BenchmarkRequest = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.messages_per_group == 0 {
            return Err(RequestError::NoMessages);
        }
        if self.groups == 0 {
            return Err(RequestError::NoGroups);
        }
        if self.messages_per_group > MAX_MESSAGES_PER_GROUP {
            return Err(RequestError::TooManyMessages(self.messages_per_group));
        }
        if self.groups > MAX_GROUPS {
            return Err(RequestError::TooManyGroups(self.groups));
        }
        Ok(())
    }

    /// [`validate`](Self::validate), plus the broker's own limits.
    ///
    /// Brokers without groups number one flat sequence of messages, so a
    /// second group would repeat its message ids within the run.
    pub fn validate_for(&self, broker: BrokerKind) -> Result<(), RequestError> {
        self.validate()?;
        if !broker.is_grouped() && self.groups > 1 {
            return Err(RequestError::GroupsUnsupported {
                broker,
                groups: self.groups,
            });
        }
        Ok(())
    }

    /// Work time to stamp on messages; non-positive values mean no simulated work.
    pub fn effective_work_time_ms(&self) -> Option<u32> {
        self.work_time_ms
            .filter(|ms| *ms > 0)
            .map(|ms| u32::try_from(ms).unwrap_or(u32::MAX))
    }

    pub fn total_messages(&self) -> u64 {
        u64::from(self.messages_per_group) * u64::from(self.groups)
    }
}

/// Body returned to the benchmark caller.
///
/// Serializes as `{"TestRunId": "..."}` or `{"Error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkResponse {
    TestRunId(TestRunId),
    Error(String),
}

impl BenchmarkResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, BenchmarkResponse::Error(_))
    }
}
