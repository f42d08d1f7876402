//! Scripted sinks shared by the unit tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bench_core::{BrokerKind, DispatchGroup, GroupId, OutboundMessage, TestRunId};
use bytes::Bytes;

use crate::error::SinkError;
use crate::sink::BrokerSink;

enum Behavior {
    FailFirst(u32),
    AlwaysFail,
    Reject,
    /// Every message of the first group seen fails; other groups succeed.
    PoisonFirstGroup,
    Slow(Duration),
}

pub(crate) struct ScriptedSink {
    behavior: Behavior,
    kind: BrokerKind,
    attempts: AtomicU32,
    delivered: Mutex<Vec<OutboundMessage>>,
    poisoned_group: Mutex<Option<GroupId>>,
}

impl ScriptedSink {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            kind: BrokerKind::ServiceBus,
            attempts: AtomicU32::new(0),
            delivered: Mutex::new(Vec::new()),
            poisoned_group: Mutex::new(None),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(Behavior::FailFirst(0))
    }

    pub fn failing_first(n: u32) -> Self {
        Self::new(Behavior::FailFirst(n))
    }

    pub fn always_failing() -> Self {
        Self::new(Behavior::AlwaysFail)
    }

    pub fn rejecting() -> Self {
        Self::new(Behavior::Reject)
    }

    pub fn poisoning_first_group() -> Self {
        Self::new(Behavior::PoisonFirstGroup)
    }

    pub fn slow(delay: Duration) -> Self {
        Self::new(Behavior::Slow(delay))
    }

    pub fn with_kind(mut self, kind: BrokerKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<OutboundMessage> {
        self.delivered.lock().unwrap().clone()
    }

    fn record(&self, message: &OutboundMessage) {
        self.delivered.lock().unwrap().push(message.clone());
    }
}

#[async_trait]
impl BrokerSink for ScriptedSink {
    fn kind(&self) -> BrokerKind {
        self.kind
    }

    async fn send(&self, message: &OutboundMessage) -> Result<(), SinkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.behavior {
            Behavior::FailFirst(n) if attempt <= *n => {
                Err(SinkError::Transient(format!("scripted failure {attempt}")))
            }
            Behavior::FailFirst(_) => {
                self.record(message);
                Ok(())
            }
            Behavior::AlwaysFail => Err(SinkError::Transient("broker unavailable".to_string())),
            Behavior::Reject => Err(SinkError::Rejected("message too large".to_string())),
            Behavior::PoisonFirstGroup => {
                let group = message.group_id.clone();
                let poisoned = {
                    let mut slot = self.poisoned_group.lock().unwrap();
                    if slot.is_none() {
                        *slot = group.clone();
                    }
                    *slot == group
                };
                if poisoned {
                    Err(SinkError::Transient("partition offline".to_string()))
                } else {
                    self.record(message);
                    Ok(())
                }
            }
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                self.record(message);
                Ok(())
            }
        }
    }
}

pub(crate) fn sample_message(message_id: u32) -> OutboundMessage {
    let group = DispatchGroup::new(TestRunId::from("abc"), message_id, None);
    group
        .messages(true, &Bytes::from_static(b"payload"))
        .pop()
        .unwrap()
}
