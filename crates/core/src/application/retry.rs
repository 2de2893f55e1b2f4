// Retry logic: bounded retry-by-resubmission
use crate::domain::{Message, QueueConfig};
use std::time::Duration;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-admit the message after `delay`
    Retry(Duration),
    /// Retries exhausted, drop the message
    GiveUp,
}

/// Retry policy
///
/// A message is delivered at most `retry_limit + 1` times: the first attempt
/// plus `retry_limit` resubmissions, each after a fixed `retry_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    retry_limit: u32,
    retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(retry_limit: u32, retry_delay: Duration) -> Self {
        Self {
            retry_limit,
            retry_delay,
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(config.retry_limit, config.retry_delay)
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    /// Decide what happens to a message whose handler just failed
    pub fn should_retry(&self, message: &Message) -> RetryDecision {
        if message.attempts >= self.retry_limit {
            warn!(
                message_id = %message.id,
                attempts = message.attempts,
                retry_limit = self.retry_limit,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        RetryDecision::Retry(self.retry_delay)
    }

    /// Bump the attempt counter before resubmission
    pub fn prepare_for_retry(&self, message: &mut Message) {
        message.attempts += 1;

        info!(
            message_id = %message.id,
            attempt = message.attempts,
            "Message prepared for retry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retry_until_limit() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let mut msg = Message::new_test("mail_job", json!({}));

        assert_eq!(
            policy.should_retry(&msg),
            RetryDecision::Retry(Duration::from_millis(10))
        );
        policy.prepare_for_retry(&mut msg);
        assert_eq!(msg.attempts, 1);

        assert!(matches!(policy.should_retry(&msg), RetryDecision::Retry(_)));
        policy.prepare_for_retry(&mut msg);
        assert_eq!(msg.attempts, 2);

        assert_eq!(policy.should_retry(&msg), RetryDecision::GiveUp);
    }

    #[test]
    fn test_zero_limit_never_retries() {
        let policy = RetryPolicy::new(0, Duration::from_secs(5));
        let msg = Message::new_test("mail_job", json!({}));
        assert_eq!(policy.should_retry(&msg), RetryDecision::GiveUp);
    }

    #[test]
    fn test_from_config() {
        let config = QueueConfig::default().with_retry(4, Duration::from_millis(250));
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.retry_limit(), 4);
    }
}
