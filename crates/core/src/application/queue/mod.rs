// In-memory Task Queue
//
// A bounded buffer, a fixed worker pool and a type -> job registry.
// Admission never blocks: a full buffer is reported as `QueueFull`.
// Messages are lost on process exit and on `stop` (no drain guarantee).

mod shutdown;
mod stats;
mod worker;


pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::retry::RetryPolicy;
use crate::domain::{JobPayload, Message, MessageId, MessageType, QueueConfig, QueueStats};
use crate::error::QueueError;
use crate::port::id_provider::ClockIdProvider;
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{IdProvider, Job, MessagePublisher, TimeProvider};
use stats::QueueCounters;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Stopped,
}

/// Job map and lifecycle flag, guarded together by one lock
struct Registry {
    jobs: HashMap<MessageType, Arc<dyn Job>>,
    state: RunState,
}

/// State shared with every worker
struct Shared {
    registry: RwLock<Registry>,
    sender: mpsc::Sender<Message>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<Message>>,
    retry_policy: RetryPolicy,
    counters: QueueCounters,
}

impl Shared {
    fn read_registry(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn job_for(&self, message_type: &MessageType) -> Option<Arc<dyn Job>> {
        self.read_registry().jobs.get(message_type).cloned()
    }

    /// Wait for the next buffered message.
    ///
    /// The receiver lock is held only while waiting, so one idle worker waits
    /// on the channel and the rest wait on the lock. Dropping the future
    /// (stop signal won the select) releases the lock without losing a message.
    async fn next_message(&self) -> Option<Message> {
        self.receiver.lock().await.recv().await
    }

    /// Non-blocking resubmission used by the retry path
    fn readmit(&self, message: Message) -> Result<(), TrySendError<Message>> {
        self.sender.try_send(message)
    }
}

/// Worker handles and the stop signal, touched only by start/stop
#[derive(Default)]
struct Lifecycle {
    shutdown: Option<ShutdownSender>,
    workers: Vec<JoinHandle<()>>,
}

/// In-memory, at-most-once task queue with a fixed worker pool
pub struct InMemoryQueue {
    config: QueueConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl InMemoryQueue {
    /// Create a queue with production id/time providers
    pub fn new(config: QueueConfig) -> Self {
        Self::with_providers(
            config,
            Arc::new(ClockIdProvider::new()),
            Arc::new(SystemTimeProvider),
        )
    }

    pub fn with_providers(
        config: QueueConfig,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let config = config.normalized();
        let (sender, receiver) = mpsc::channel(config.capacity);

        Self {
            shared: Arc::new(Shared {
                registry: RwLock::new(Registry {
                    jobs: HashMap::new(),
                    state: RunState::Idle,
                }),
                sender,
                receiver: tokio::sync::Mutex::new(receiver),
                retry_policy: RetryPolicy::from_config(&config),
                counters: QueueCounters::default(),
            }),
            config,
            lifecycle: Mutex::new(Lifecycle::default()),
            id_provider,
            time_provider,
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Register a job under its message type.
    ///
    /// A second job for an already registered type is logged and ignored;
    /// the first registration always wins.
    pub fn register_job(&self, job: Arc<dyn Job>) {
        let message_type = job.message_type();
        let mut registry = self.shared.write_registry();

        if let Some(existing) = registry.jobs.get(&message_type) {
            error!(
                job = job.name(),
                existing_job = existing.name(),
                message_type = %message_type,
                "Job already registered for message type, ignoring"
            );
            return;
        }

        info!(job = job.name(), message_type = %message_type, "Job registered");
        registry.jobs.insert(message_type, job);
    }

    /// Register several jobs, in order
    pub fn register_jobs(&self, jobs: impl IntoIterator<Item = Arc<dyn Job>>) {
        for job in jobs {
            self.register_job(job);
        }
    }

    /// Spawn the worker pool. Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), QueueError> {
        // lifecycle before registry, same order as `stop`
        let mut lifecycle = self.lock_lifecycle();
        {
            let mut registry = self.shared.write_registry();
            match registry.state {
                RunState::Running => return Err(QueueError::AlreadyRunning),
                RunState::Stopped => return Err(QueueError::Stopped),
                RunState::Idle => registry.state = RunState::Running,
            }
        }

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        lifecycle.workers = (0..self.config.worker_count)
            .map(|worker_id| {
                let worker = Worker::new(worker_id, Arc::clone(&self.shared));
                tokio::spawn(worker.run(shutdown_rx.clone()))
            })
            .collect();
        lifecycle.shutdown = Some(shutdown_tx);

        info!(
            workers = self.config.worker_count,
            capacity = self.config.capacity,
            retry_limit = self.config.retry_limit,
            "Queue started"
        );
        Ok(())
    }

    /// Stop accepting work, signal the workers and wait up to `grace` for them.
    ///
    /// A zero `grace` is an already expired deadline: the workers are still
    /// signalled, but the call reports `ShutdownTimeout` right away.
    /// Messages still buffered once the workers are gone are discarded.
    pub async fn stop(&self, grace: Duration) -> Result<(), QueueError> {
        let (shutdown, workers) = {
            let mut lifecycle = self.lock_lifecycle();
            {
                let mut registry = self.shared.write_registry();
                if registry.state != RunState::Running {
                    return Ok(());
                }
                registry.state = RunState::Stopped;
            }
            (
                lifecycle.shutdown.take(),
                std::mem::take(&mut lifecycle.workers),
            )
        };
        if let Some(shutdown) = shutdown {
            shutdown.shutdown();
        }

        if grace.is_zero() {
            warn!("Queue stop deadline already expired");
            return Err(QueueError::ShutdownTimeout(grace));
        }

        match tokio::time::timeout(grace, futures::future::join_all(workers)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        error!(error = %e, "Queue worker task failed");
                    }
                }
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis() as u64, "Timed out waiting for queue workers");
                return Err(QueueError::ShutdownTimeout(grace));
            }
        }

        match self.discard_pending() {
            Some(0) => {}
            Some(discarded) => warn!(discarded, "Discarded unprocessed messages on shutdown"),
            None => warn!("Receiver still in use, leaving buffered messages in place"),
        }
        info!("Queue stopped gracefully");
        Ok(())
    }

    /// Admit a message without blocking
    pub fn enqueue(
        &self,
        message_type: &MessageType,
        payload: JobPayload,
    ) -> Result<MessageId, QueueError> {
        let registry = self.shared.read_registry();

        if registry.state != RunState::Running {
            return Err(QueueError::NotRunning);
        }
        if !registry.jobs.contains_key(message_type) {
            return Err(QueueError::NoHandlerRegistered(message_type.clone()));
        }

        let message = Message::new(
            self.id_provider.generate_id(),
            message_type.clone(),
            payload,
            self.time_provider.now_millis(),
        );
        let message_id = message.id.clone();

        match self.shared.sender.try_send(message) {
            Ok(()) => {
                QueueCounters::bump(&self.shared.counters.enqueued);
                debug!(message_id = %message_id, message_type = %message_type, "Message enqueued");
                Ok(message_id)
            }
            Err(TrySendError::Full(_)) => {
                QueueCounters::bump(&self.shared.counters.rejected);
                warn!(message_type = %message_type, capacity = self.config.capacity, "Queue is full");
                Err(QueueError::QueueFull(self.config.capacity))
            }
            Err(TrySendError::Closed(_)) => Err(QueueError::NotRunning),
        }
    }

    /// `enqueue`, honouring the caller's cancellation token at admission time.
    /// Cancelling later has no effect on an admitted message.
    pub fn enqueue_with_cancel(
        &self,
        cancel: &CancellationToken,
        message_type: &MessageType,
        payload: JobPayload,
    ) -> Result<MessageId, QueueError> {
        if cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }
        self.enqueue(message_type, payload)
    }

    pub fn is_running(&self) -> bool {
        self.shared.read_registry().state == RunState::Running
    }

    pub fn stats(&self) -> QueueStats {
        let (running, mut registered_types) = {
            let registry = self.shared.read_registry();
            (
                registry.state == RunState::Running,
                registry
                    .jobs
                    .keys()
                    .map(|t| t.as_str().to_string())
                    .collect::<Vec<_>>(),
            )
        };
        registered_types.sort();

        let counters = &self.shared.counters;
        QueueStats {
            running,
            worker_count: self.config.worker_count,
            capacity: self.config.capacity,
            pending: self.config.capacity - self.shared.sender.capacity(),
            registered_types,
            enqueued: QueueCounters::read(&counters.enqueued),
            rejected: QueueCounters::read(&counters.rejected),
            processed: QueueCounters::read(&counters.processed),
            failed_attempts: QueueCounters::read(&counters.failed_attempts),
            retried: QueueCounters::read(&counters.retried),
            dropped: QueueCounters::read(&counters.dropped),
        }
    }

    /// Drain the buffer once every worker is gone. `None` if the receiver is
    /// still locked; never waits for it.
    fn discard_pending(&self) -> Option<u64> {
        let mut receiver = self.shared.receiver.try_lock().ok()?;
        let mut discarded = 0;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        QueueCounters::add(&self.shared.counters.dropped, discarded);
        Some(discarded)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessagePublisher for InMemoryQueue {
    fn publish(
        &self,
        message_type: &MessageType,
        payload: JobPayload,
    ) -> Result<MessageId, QueueError> {
        self.enqueue(message_type, payload)
    }
}
