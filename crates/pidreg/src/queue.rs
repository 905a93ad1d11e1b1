//! Module: queue
//! Responsibility: asynchronous delivery of registration tasks with bounded
//! concurrency and redelivery of retryable failures.
//! Does not own: what a task does; that belongs to the `TaskHandler`.

use crate::{config::QueueConfig, registration::RegistrationTask};
use async_trait::async_trait;
use parking_lot::Mutex;
use pidreg_core::error::{ErrorClass, ErrorOrigin, RegistryError};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{Semaphore, mpsc},
    task::{JoinHandle, JoinSet},
};

///
/// TaskQueue
///

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Hand a task off without waiting for it to run.
    async fn enqueue(&self, task: RegistrationTask) -> Result<(), RegistryError>;
}

///
/// TaskHandler
///

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &RegistrationTask) -> Result<(), RegistryError>;
}

///
/// RedeliveryPolicy
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RedeliveryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RedeliveryPolicy {
    #[must_use]
    pub const fn from_config(config: &QueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    const fn redelivers(self, task: &RegistrationTask, err: &RegistryError) -> bool {
        err.is_retryable() && task.attempt < self.max_attempts
    }
}

///
/// QueueStats
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueueStats {
    pub completed: u64,
    pub redelivered: u64,
    pub abandoned: u64,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    redelivered: AtomicU64,
    abandoned: AtomicU64,
}

///
/// LocalTaskQueue
///
/// Tokio channel feeding a runner that fans tasks out to at most `workers`
/// concurrent deliveries. Must be started inside a runtime.
///

pub struct LocalTaskQueue {
    sender: Mutex<Option<mpsc::Sender<RegistrationTask>>>,
    runner: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl LocalTaskQueue {
    pub fn start(config: &QueueConfig, handler: Arc<dyn TaskHandler>) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let counters = Arc::new(Counters::default());
        let runner = tokio::spawn(run(
            receiver,
            handler,
            RedeliveryPolicy::from_config(config),
            config.workers.max(1),
            Arc::clone(&counters),
        ));

        Self {
            sender: Mutex::new(Some(sender)),
            runner: Mutex::new(Some(runner)),
            counters,
        }
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            redelivered: self.counters.redelivered.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting tasks and wait for every accepted task to settle.
    pub async fn drain(&self) {
        drop(self.sender.lock().take());
        let runner = self.runner.lock().take();
        if let Some(runner) = runner
            && let Err(err) = runner.await
        {
            tracing::error!(target: "pidreg::queue", error = %err, "queue runner panicked");
        }
    }
}

#[async_trait]
impl TaskQueue for LocalTaskQueue {
    async fn enqueue(&self, task: RegistrationTask) -> Result<(), RegistryError> {
        let sender = self.sender.lock().clone();
        let Some(sender) = sender else {
            return Err(RegistryError::new(ErrorClass::Internal, ErrorOrigin::Queue, "queue is shut down"));
        };

        tracing::debug!(target: "pidreg::queue", task = %task.id, doi = %task.doi, kind = task.kind.as_str(), "task enqueued");
        sender.try_send(task).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                RegistryError::new(ErrorClass::Unavailable, ErrorOrigin::Queue, "queue is full")
            }
            mpsc::error::TrySendError::Closed(_) => {
                RegistryError::new(ErrorClass::Internal, ErrorOrigin::Queue, "queue is shut down")
            }
        })
    }
}

async fn run(
    mut receiver: mpsc::Receiver<RegistrationTask>,
    handler: Arc<dyn TaskHandler>,
    policy: RedeliveryPolicy,
    workers: usize,
    counters: Arc<Counters>,
) {
    let permits = Arc::new(Semaphore::new(workers));
    let mut inflight = JoinSet::new();

    while let Some(task) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let handler = Arc::clone(&handler);
        let counters = Arc::clone(&counters);
        inflight.spawn(async move {
            let _permit = permit;
            deliver(handler.as_ref(), task, policy, &counters).await;
        });
        while inflight.try_join_next().is_some() {}
    }

    while inflight.join_next().await.is_some() {}
}

// At-least-once: retryable failures are redelivered after a fixed backoff
// until the attempt budget runs out.
async fn deliver(handler: &dyn TaskHandler, mut task: RegistrationTask, policy: RedeliveryPolicy, counters: &Counters) {
    loop {
        match handler.handle(&task).await {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(err) if policy.redelivers(&task, &err) => {
                tracing::warn!(
                    target: "pidreg::queue",
                    task = %task.id,
                    doi = %task.doi,
                    attempt = task.attempt,
                    error = %err.display_with_class(),
                    "task failed, redelivering"
                );
                counters.redelivered.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(policy.backoff).await;
                task.attempt += 1;
            }
            Err(err) => {
                tracing::error!(
                    target: "pidreg::queue",
                    task = %task.id,
                    doi = %task.doi,
                    attempt = task.attempt,
                    error = %err.display_with_class(),
                    "task abandoned"
                );
                counters.abandoned.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
    }
}
