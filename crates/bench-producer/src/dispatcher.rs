//! Single-message dispatch with a bounded retry budget.
//!
//! Retries are issued back to back: no backoff, no jitter. A message that runs
//! out of attempts is dropped; the benchmark only sees it as a missing sample
//! on the consumer side.

use bench_core::OutboundMessage;

use crate::error::SinkError;
use crate::sink::BrokerSink;

/// Default number of attempts per message.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Result of dispatching one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The sink accepted the message.
    Delivered { attempts: u32 },
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last_error: SinkError },
    /// The sink returned a non-retryable error; no further attempts were made.
    Unexpected { attempts: u32, error: SinkError },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            SendOutcome::Delivered { attempts }
            | SendOutcome::Exhausted { attempts, .. }
            | SendOutcome::Unexpected { attempts, .. } => *attempts,
        }
    }
}

/// Send `message` through `sink`, retrying immediately on transient failures.
///
/// Makes at most `max_attempts` attempts (at least one, even when
/// `max_attempts` is 0). The attempt counter is local to the call.
pub async fn send_with_retry(
    message: OutboundMessage,
    sink: &dyn BrokerSink,
    max_attempts: u32,
) -> SendOutcome {
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match sink.send(&message).await {
            Ok(()) => return SendOutcome::Delivered { attempts },
            Err(error) if !error.is_retryable() => {
                return SendOutcome::Unexpected { attempts, error };
            }
            Err(error) => {
                tracing::debug!(
                    "Error posting message {} (attempt {}/{}): {}. Retrying...",
                    message.broker_message_id(),
                    attempts,
                    max_attempts,
                    error
                );
                if attempts >= max_attempts {
                    return SendOutcome::Exhausted {
                        attempts,
                        last_error: error,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_message, ScriptedSink};

    #[tokio::test]
    async fn test_first_success_makes_one_attempt() {
        let sink = ScriptedSink::succeeding();
        let outcome = send_with_retry(sample_message(1), &sink, DEFAULT_MAX_ATTEMPTS).await;

        assert_eq!(outcome, SendOutcome::Delivered { attempts: 1 });
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn test_success_on_third_attempt_stops_retrying() {
        let sink = ScriptedSink::failing_first(2);
        let outcome = send_with_retry(sample_message(1), &sink, DEFAULT_MAX_ATTEMPTS).await;

        assert_eq!(outcome, SendOutcome::Delivered { attempts: 3 });
        assert_eq!(sink.attempts(), 3);
    }

    #[tokio::test]
    async fn test_always_failing_sink_exhausts_exactly_max_attempts() {
        let sink = ScriptedSink::always_failing();
        let outcome = send_with_retry(sample_message(1), &sink, 10).await;

        assert!(matches!(
            outcome,
            SendOutcome::Exhausted { attempts: 10, .. }
        ));
        assert!(!outcome.is_delivered());
        assert_eq!(sink.attempts(), 10);
    }

    #[tokio::test]
    async fn test_zero_budget_still_tries_once() {
        let sink = ScriptedSink::always_failing();
        let outcome = send_with_retry(sample_message(1), &sink, 0).await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn test_rejection_is_not_retried() {
        let sink = ScriptedSink::rejecting();
        let outcome = send_with_retry(sample_message(1), &sink, 10).await;

        assert!(matches!(
            outcome,
            SendOutcome::Unexpected { attempts: 1, .. }
        ));
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn test_calls_share_no_retry_state() {
        let sink = ScriptedSink::failing_first(2);
        let first = send_with_retry(sample_message(1), &sink, 10).await;
        let second = send_with_retry(sample_message(2), &sink, 10).await;

        assert_eq!(first.attempts(), 3);
        // The sink's failures are spent; the second call starts its own count at 1.
        assert_eq!(second.attempts(), 1);
    }
}
