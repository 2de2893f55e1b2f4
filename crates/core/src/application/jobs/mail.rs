// MailJob: login / register notification mails

use crate::domain::{JobPayload, MessageType};
use crate::port::{Job, JobContext, JobError, Mailer};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const MAIL_JOB_NAME: &str = "mail_job";
pub const MAIL_JOB_TYPE: &str = "mail_job";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailKind {
    #[serde(rename = "mail_login")]
    Login,
    #[serde(rename = "mail_register")]
    Register,
}

/// Payload published by the auth flows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailPayload {
    #[serde(rename = "type")]
    pub kind: MailKind,
    pub email: String,
    pub full_name: String,
}

impl MailPayload {
    pub fn login(email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            kind: MailKind::Login,
            email: email.into(),
            full_name: full_name.into(),
        }
    }

    pub fn register(email: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            kind: MailKind::Register,
            email: email.into(),
            full_name: full_name.into(),
        }
    }
}

pub struct MailJob {
    mailer: Arc<dyn Mailer>,
}

impl MailJob {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn routing_key() -> MessageType {
        MessageType::new(MAIL_JOB_TYPE)
    }
}

#[async_trait]
impl Job for MailJob {
    fn name(&self) -> &str {
        MAIL_JOB_NAME
    }

    fn message_type(&self) -> MessageType {
        MailJob::routing_key()
    }

    async fn handle(&self, ctx: &JobContext, payload: &JobPayload) -> Result<(), JobError> {
        let mail: MailPayload = payload.decode()?;
        if mail.email.trim().is_empty() {
            return Err(JobError::InvalidPayload("email must not be empty".to_string()));
        }

        let sent = match mail.kind {
            MailKind::Login => self.mailer.send_login_mail(&mail.email, &mail.full_name).await,
            MailKind::Register => {
                self.mailer
                    .send_register_mail(&mail.email, &mail.full_name)
                    .await
            }
        };
        sent.map_err(|e| JobError::Failed(e.to_string()))?;

        info!(
            message_id = %ctx.message_id,
            kind = ?mail.kind,
            attempt = ctx.attempt,
            "Mail sent"
        );
        Ok(())
    }
}
