// Application Layer - Use Cases and Concurrency Services

pub mod jobs;
pub mod queue;
pub mod realtime;
pub mod retry;

// Re-exports
pub use jobs::{MailJob, MailPayload};
pub use queue::{shutdown_channel, InMemoryQueue, ShutdownSender, ShutdownToken};
pub use realtime::{run_connection, BroadcastReport, Connection, Dispatcher, Hub};
pub use retry::{RetryDecision, RetryPolicy};
