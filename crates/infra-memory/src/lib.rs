// Courier Infrastructure - In-process Adapters
// Implements: TokenVerifier, ChatService, Mailer

pub mod chat_service;
pub mod mailer;
pub mod token_table;

pub use chat_service::{InMemoryChatService, StoredMessage};
pub use mailer::LogMailer;
pub use token_table::TokenTable;
