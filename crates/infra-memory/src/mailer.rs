// Log-only Mailer
// Stands in for SMTP in development: every mail becomes a structured log line

use async_trait::async_trait;
use courier_core::port::{MailError, Mailer};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }

    fn check_recipient(email: &str) -> Result<(), MailError> {
        if email.contains('@') {
            Ok(())
        } else {
            Err(MailError::InvalidRecipient(email.to_string()))
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_login_mail(&self, email: &str, full_name: &str) -> Result<(), MailError> {
        Self::check_recipient(email)?;
        info!(email, full_name, template = "login", "Mail delivered");
        Ok(())
    }

    async fn send_register_mail(&self, email: &str, full_name: &str) -> Result<(), MailError> {
        Self::check_recipient(email)?;
        info!(email, full_name, template = "register", "Mail delivered");
        Ok(())
    }
}
