// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid message type: {0}")]
    InvalidMessageType(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
