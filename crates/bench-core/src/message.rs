//! Producer-side load units.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::ids::{GroupId, TestRunId};

/// Attribute names of the outbound envelope.
///
/// The envelope travels next to the payload (as broker properties or inside a
/// JSON body) and is what the consumer reads back to correlate a delivery.
pub mod envelope_keys {
    pub const TEST_RUN_ID: &str = "TestRunId";
    pub const MESSAGE_ID: &str = "MessageId";
    pub const GROUP_ID: &str = "GroupId";
    pub const ENQUEUE_TIME_UTC: &str = "EnqueueTimeUtc";
    pub const WORK_TIME: &str = "workTime";
    /// Body field holding the opaque payload when the envelope is carried in the body.
    pub const CONTENT: &str = "Content";
}

/// A logical partition of the requested load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchGroup {
    pub group_id: GroupId,
    pub test_run_id: TestRunId,
    pub message_count: u32,
    /// Simulated consumer work time, only set when positive.
    pub work_time_ms: Option<u32>,
}

impl DispatchGroup {
    pub fn new(test_run_id: TestRunId, message_count: u32, work_time_ms: Option<u32>) -> Self {
        Self {
            group_id: GroupId::generate(),
            test_run_id,
            message_count,
            work_time_ms: work_time_ms.filter(|ms| *ms > 0),
        }
    }

    /// Expand the group into its messages.
    ///
    /// Message ids run from 1 to `message_count`. Each message is stamped with
    /// the wall-clock time at which it is constructed. When `tag_group` is false
    /// the messages carry no `GroupId`.
    pub fn messages(&self, tag_group: bool, payload: &Bytes) -> Vec<OutboundMessage> {
        (1..=self.message_count)
            .map(|message_id| OutboundMessage {
                test_run_id: self.test_run_id.clone(),
                group_id: tag_group.then(|| self.group_id.clone()),
                message_id,
                enqueue_time_utc: Utc::now(),
                consumer_work_time_ms: self.work_time_ms,
                payload: payload.clone(),
            })
            .collect()
    }
}

/// One message ready to be handed to a broker sink.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub test_run_id: TestRunId,
    pub group_id: Option<GroupId>,
    /// 1-based sequence number, unique within the group.
    pub message_id: u32,
    pub enqueue_time_utc: DateTime<Utc>,
    pub consumer_work_time_ms: Option<u32>,
    pub payload: Bytes,
}

impl OutboundMessage {
    /// Broker-level message id, `{group}/{message}` for grouped messages.
    ///
    /// Session-ordered queues de-duplicate on this value.
    pub fn broker_message_id(&self) -> String {
        match &self.group_id {
            Some(group) => format!("{}/{}", group, self.message_id),
            None => self.message_id.to_string(),
        }
    }

    /// Correlation id used by brokers that support one.
    pub fn correlation_id(&self) -> Option<&GroupId> {
        self.group_id.as_ref()
    }

    /// Envelope attributes attached to the payload.
    pub fn envelope(&self) -> BTreeMap<String, Value> {
        let mut attrs = BTreeMap::new();
        attrs.insert(
            envelope_keys::TEST_RUN_ID.to_string(),
            Value::String(self.test_run_id.to_string()),
        );
        attrs.insert(
            envelope_keys::MESSAGE_ID.to_string(),
            Value::from(self.message_id),
        );
        if let Some(group) = &self.group_id {
            attrs.insert(
                envelope_keys::GROUP_ID.to_string(),
                Value::String(group.to_string()),
            );
        }
        attrs.insert(
            envelope_keys::ENQUEUE_TIME_UTC.to_string(),
            Value::String(
                self.enqueue_time_utc
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
        );
        if let Some(work_time) = self.consumer_work_time_ms.filter(|ms| *ms > 0) {
            attrs.insert(envelope_keys::WORK_TIME.to_string(), Value::from(work_time));
        }
        attrs
    }
}
