// Port Layer - Interfaces for external collaborators

pub mod chat_service;
pub mod id_provider; // For deterministic testing
pub mod job_handler;
pub mod mailer;
pub mod publisher;
pub mod time_provider;
pub mod token_verifier;
pub mod transport;

// Re-exports
pub use chat_service::{ChatError, ChatService, CreateRoomRequest, SendMessageRequest};
pub use id_provider::IdProvider;
pub use job_handler::{Job, JobContext, JobError};
pub use mailer::{MailError, Mailer};
pub use publisher::MessagePublisher;
pub use time_provider::TimeProvider;
pub use token_verifier::{AuthError, Claims, TokenVerifier};
pub use transport::{FrameSink, FrameSource, TransportError};
