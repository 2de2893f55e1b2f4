// Central Error Types for the Application

use crate::domain::MessageType;
use std::time::Duration;
use thiserror::Error;

/// Admission errors returned synchronously by the task queue.
///
/// Handler failures never show up here; they stay behind the worker boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue is not running")]
    NotRunning,

    #[error("Queue is already running")]
    AlreadyRunning,

    #[error("Queue has been stopped and cannot be restarted")]
    Stopped,

    #[error("No job registered for message type: {0}")]
    NoHandlerRegistered(MessageType),

    #[error("Queue is full (capacity {0})")]
    QueueFull(usize),

    #[error("Enqueue cancelled by caller")]
    Cancelled,

    #[error("Timed out after {0:?} waiting for queue workers to stop")]
    ShutdownTimeout(Duration),
}

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Auth error: {0}")]
    Auth(#[from] crate::port::AuthError),

    #[error("Chat error: {0}")]
    Chat(#[from] crate::port::ChatError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
