// Mailer Port (consumed by MailJob)

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_login_mail(&self, email: &str, full_name: &str) -> Result<(), MailError>;

    async fn send_register_mail(&self, email: &str, full_name: &str) -> Result<(), MailError>;
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Which template a recorded mail used
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SentKind {
        Login,
        Register,
    }

    /// Records sent mails; optionally fails every delivery
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<(SentKind, String)>>,
        fail: bool,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        pub fn sent(&self) -> Vec<(SentKind, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn record(&self, kind: SentKind, email: &str) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Delivery("smtp unavailable".to_string()));
            }
            self.sent.lock().unwrap().push((kind, email.to_string()));
            Ok(())
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_login_mail(&self, email: &str, _full_name: &str) -> Result<(), MailError> {
            self.record(SentKind::Login, email)
        }

        async fn send_register_mail(&self, email: &str, _full_name: &str) -> Result<(), MailError> {
            self.record(SentKind::Register, email)
        }
    }
}
