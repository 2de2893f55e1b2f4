// Worker - message processing loop

use super::{QueueCounters, Shared, ShutdownToken};
use crate::application::retry::RetryDecision;
use crate::domain::Message;
use crate::port::{Job, JobContext, JobError};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// How one delivery attempt ended
enum Outcome {
    Succeeded,
    Failed(JobError),
    Panicked(String),
}

/// One slot of the worker pool
pub(super) struct Worker {
    id: usize,
    shared: Arc<Shared>,
}

impl Worker {
    pub(super) fn new(id: usize, shared: Arc<Shared>) -> Self {
        Self { id, shared }
    }

    /// Run until the stop signal is observed
    pub(super) async fn run(self, mut shutdown: ShutdownToken) {
        info!(worker_id = self.id, "Queue worker started");

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = shutdown.wait() => None,
                message = self.shared.next_message() => message,
            };

            match next {
                Some(message) => self.process(message, &mut shutdown).await,
                None => break,
            }
        }

        info!(worker_id = self.id, "Queue worker stopping");
    }

    async fn process(&self, message: Message, shutdown: &mut ShutdownToken) {
        let Some(job) = self.shared.job_for(&message.message_type) else {
            // jobs are never unregistered, so this only guards against misuse
            error!(
                message_id = %message.id,
                message_type = %message.message_type,
                "No job found for message type"
            );
            QueueCounters::bump(&self.shared.counters.dropped);
            return;
        };

        info!(
            worker_id = self.id,
            message_id = %message.id,
            job = job.name(),
            attempt = message.attempts + 1,
            "Processing message"
        );

        match self.execute(&job, &message).await {
            Outcome::Succeeded => {
                QueueCounters::bump(&self.shared.counters.processed);
                info!(
                    message_id = %message.id,
                    job = job.name(),
                    "Message processed successfully"
                );
            }
            Outcome::Failed(err) => {
                QueueCounters::bump(&self.shared.counters.failed_attempts);
                self.handle_failure(message, job.name(), err, shutdown).await;
            }
            Outcome::Panicked(reason) => {
                // a panicking handler is not retried
                QueueCounters::bump(&self.shared.counters.failed_attempts);
                QueueCounters::bump(&self.shared.counters.dropped);
                error!(
                    message_id = %message.id,
                    job = job.name(),
                    panic = %reason,
                    "Job panicked, dropping message"
                );
            }
        }
    }

    /// Run the handler in its own task so a panic cannot take the worker down
    async fn execute(&self, job: &Arc<dyn Job>, message: &Message) -> Outcome {
        let ctx = JobContext {
            message_id: message.id.clone(),
            message_type: message.message_type.clone(),
            attempt: message.attempts + 1,
        };
        let payload = message.payload.clone();
        let handler = Arc::clone(job);

        let handle = tokio::spawn(async move { handler.handle(&ctx, &payload).await });

        match handle.await {
            Ok(Ok(())) => Outcome::Succeeded,
            Ok(Err(err)) => Outcome::Failed(err),
            Err(join_err) if join_err.is_panic() => {
                let panic = join_err.into_panic();
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unknown panic".to_string());
                Outcome::Panicked(reason)
            }
            Err(join_err) => Outcome::Panicked(join_err.to_string()),
        }
    }

    async fn handle_failure(
        &self,
        mut message: Message,
        job_name: &str,
        err: JobError,
        shutdown: &mut ShutdownToken,
    ) {
        error!(
            message_id = %message.id,
            job = job_name,
            error = %err,
            attempt = message.attempts + 1,
            "Error processing message"
        );

        let delay = match self.shared.retry_policy.should_retry(&message) {
            RetryDecision::GiveUp => {
                QueueCounters::bump(&self.shared.counters.dropped);
                error!(
                    message_id = %message.id,
                    job = job_name,
                    retry_limit = self.shared.retry_policy.retry_limit(),
                    "Message processing failed after max retries"
                );
                return;
            }
            RetryDecision::Retry(delay) => delay,
        };

        self.shared.retry_policy.prepare_for_retry(&mut message);

        // only this worker sleeps; the stop signal cuts the sleep short
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                QueueCounters::bump(&self.shared.counters.dropped);
                warn!(
                    message_id = %message.id,
                    job = job_name,
                    "Shutdown during retry delay, dropping message"
                );
                return;
            }
            _ = sleep(delay) => {}
        }

        let message_id = message.id.clone();
        let attempt = message.attempts;
        match self.shared.readmit(message) {
            Ok(()) => {
                QueueCounters::bump(&self.shared.counters.retried);
                info!(
                    message_id = %message_id,
                    job = job_name,
                    attempt,
                    "Requeued message for retry"
                );
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                QueueCounters::bump(&self.shared.counters.dropped);
                error!(
                    message_id = %message_id,
                    job = job_name,
                    "Failed to requeue message, queue is full"
                );
            }
        }
    }
}
