// Job Handler Port
// A Job is the single consumer bound to one message type

use crate::domain::{JobPayload, MessageId, MessageType};
use async_trait::async_trait;
use thiserror::Error;

/// Per-delivery context handed to a job.
///
/// Built by the worker, not inherited from the enqueuing caller (which has
/// long returned by the time the handler runs).
#[derive(Debug, Clone)]
pub struct JobContext {
    pub message_id: MessageId,
    pub message_type: MessageType,
    /// 1-based delivery attempt
    pub attempt: u32,
}

/// Handler errors. Logged by the worker and fed into the retry policy;
/// they never reach the code that enqueued the message.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Job failed: {0}")]
    Failed(String),
}

impl From<serde_json::Error> for JobError {
    fn from(e: serde_json::Error) -> Self {
        JobError::InvalidPayload(e.to_string())
    }
}

/// Job trait
///
/// Implementations:
/// - MailJob: sends login/register mails through a `Mailer`
/// - MockJob: scripted behavior for tests
#[async_trait]
pub trait Job: Send + Sync {
    /// Human-readable label used in logs
    fn name(&self) -> &str;

    /// Routing key; at most one job per type may be registered
    fn message_type(&self) -> MessageType;

    /// Process one message payload
    async fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<(), JobError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock job behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Fail the first N calls, then succeed
        FailTimes(usize),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Sleep, then succeed (keeps a worker busy)
        Sleep(Duration),
    }

    /// Mock Job for testing: records every payload it receives
    pub struct MockJob {
        name: String,
        message_type: MessageType,
        behavior: MockBehavior,
        calls: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    impl MockJob {
        pub fn new(message_type: &str, behavior: MockBehavior) -> Self {
            Self::named(message_type, message_type, behavior)
        }

        pub fn named(name: &str, message_type: &str, behavior: MockBehavior) -> Self {
            Self {
                name: name.to_string(),
                message_type: MessageType::new(message_type),
                behavior,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success(message_type: &str) -> Self {
            Self::new(message_type, MockBehavior::Success)
        }

        pub fn new_fail(message_type: &str, message: impl Into<String>) -> Self {
            Self::new(message_type, MockBehavior::Fail(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn payloads(&self) -> Vec<serde_json::Value> {
            self.calls.lock().unwrap().clone()
        }

        /// Poll until at least `n` calls were recorded or `timeout` elapses
        pub async fn wait_for_calls(&self, n: usize, timeout: Duration) -> bool {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                if self.call_count() >= n {
                    return true;
                }
                if tokio::time::Instant::now() >= deadline {
                    return false;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &str {
            &self.name
        }

        fn message_type(&self) -> MessageType {
            self.message_type.clone()
        }

        async fn handle(&self, _ctx: &JobContext, payload: &JobPayload) -> Result<(), JobError> {
            let call_index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(payload.as_value().clone());
                calls.len()
            };

            match &self.behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(JobError::Failed(msg.clone())),
                MockBehavior::FailTimes(n) if call_index <= *n => {
                    Err(JobError::Failed(format!("scripted failure {}", call_index)))
                }
                MockBehavior::FailTimes(_) => Ok(()),
                MockBehavior::Panic(msg) => panic!("{}", msg),
                MockBehavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(())
                }
            }
        }
    }
}
