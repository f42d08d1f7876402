//! Local broker adapters.
//!
//! Real broker SDKs live outside this repository. These adapters stand in
//! for them so the harness can run end to end on one machine. Each one
//! emulates a chosen [`BrokerKind`](bench_core::BrokerKind): messages are
//! shaped with that broker's attribute carrier, and the consumer reports
//! that broker's trigger label.

pub mod loopback;
pub mod spool;

use std::sync::atomic::{AtomicU32, Ordering};

use bench_producer::SinkError;

pub use loopback::{loopback_channel, LoopbackSink, LoopbackSource};
pub use spool::{SpoolSink, SpoolSource};

/// Fails the first `n` send attempts made through an adapter, then lets
/// everything through.
#[derive(Debug, Default)]
pub struct FailureInjector {
    remaining: AtomicU32,
}

impl FailureInjector {
    pub fn new(fail_first_attempts: u32) -> Self {
        Self {
            remaining: AtomicU32::new(fail_first_attempts),
        }
    }

    /// Consume one injected failure, if any are left.
    pub fn check(&self) -> Result<(), SinkError> {
        let tripped = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(SinkError::Transient("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }
}
