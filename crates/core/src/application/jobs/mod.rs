// Built-in jobs

pub mod mail;

pub use mail::{MailJob, MailKind, MailPayload, MAIL_JOB_TYPE};
