//! Background notification dispatch.
//!
//! Request handlers submit jobs without waiting. An intake task expands each
//! job into per-recipient events and routes them to a fixed set of shard
//! workers keyed by recipient, so all notifications of one recipient are
//! persisted and pushed by the same sequential worker, in submission order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::models::{NotificationEvent, NotificationType};
use super::service::NotificationService;
use crate::engagement_store::EngagementStore;
use crate::server::metrics;

/// Work handed to the dispatcher after a mutation has committed.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationJob {
    Single(NotificationEvent),
    Bulk(Vec<NotificationEvent>),
    /// `new_post` to every follower of `author`, resolved off the request path.
    NewPostFanOut { author: String, post: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("notification queue is full")]
    QueueFull,
    #[error("notification dispatcher is stopped")]
    Stopped,
}

enum IntakeMessage {
    Job(NotificationJob),
    Barrier(oneshot::Sender<()>),
}

enum ShardMessage {
    Events(Vec<NotificationEvent>),
    Barrier(oneshot::Sender<()>),
}

/// Handle to the dispatcher tasks. Cheap to clone.
#[derive(Clone)]
pub struct NotificationDispatcher {
    intake_tx: mpsc::Sender<IntakeMessage>,
}

impl NotificationDispatcher {
    /// Spawns the intake task and `workers` shard workers on the current runtime.
    pub fn start(
        service: Arc<NotificationService>,
        engagement_store: Arc<dyn EngagementStore>,
        queue_capacity: usize,
        workers: usize,
        shutdown: CancellationToken,
    ) -> Self {
        let queue_capacity = queue_capacity.max(1);
        let workers = workers.max(1);
        let (intake_tx, intake_rx) = mpsc::channel(queue_capacity);

        let shards: Vec<mpsc::Sender<ShardMessage>> = (0..workers)
            .map(|index| {
                let (tx, rx) = mpsc::channel(queue_capacity);
                tokio::spawn(run_shard(index, rx, service.clone(), shutdown.clone()));
                tx
            })
            .collect();

        tokio::spawn(run_intake(intake_rx, shards, engagement_store, shutdown));
        info!(
            "Notification dispatcher started: queue capacity {}, {} workers",
            queue_capacity, workers
        );

        Self { intake_tx }
    }

    /// Enqueues a job without waiting. When the queue is full the job is
    /// dropped and logged.
    pub fn submit(&self, job: NotificationJob) -> Result<(), DispatchError> {
        match self.intake_tx.try_send(IntakeMessage::Job(job)) {
            Ok(()) => {
                metrics::set_dispatcher_queue_depth(
                    self.intake_tx.max_capacity() - self.intake_tx.capacity(),
                );
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::record_dispatcher_drop();
                warn!("Notification queue full, dropping job");
                Err(DispatchError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Notification dispatcher stopped, dropping job");
                Err(DispatchError::Stopped)
            }
        }
    }

    /// Resolves once every job submitted before this call has been fully
    /// processed by its worker.
    pub async fn drain(&self) -> Result<(), DispatchError> {
        let (tx, rx) = oneshot::channel();
        self.intake_tx
            .send(IntakeMessage::Barrier(tx))
            .await
            .map_err(|_| DispatchError::Stopped)?;
        rx.await.map_err(|_| DispatchError::Stopped)
    }
}

fn shard_for(recipient: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    recipient.hash(&mut hasher);
    (hasher.finish() % shards as u64) as usize
}

fn expand(job: NotificationJob, engagement_store: &dyn EngagementStore) -> Vec<NotificationEvent> {
    match job {
        NotificationJob::Single(event) => vec![event],
        NotificationJob::Bulk(events) => events,
        NotificationJob::NewPostFanOut { author, post } => match engagement_store.get_user(&author) {
            Ok(Some(user)) => user
                .followers
                .iter()
                .map(|follower| {
                    NotificationEvent::new(NotificationType::NewPost, follower, &author)
                        .with_post(&post)
                })
                .collect(),
            Ok(None) => {
                debug!("Author {} vanished before new_post fan-out", author);
                vec![]
            }
            Err(err) => {
                warn!("Failed to resolve followers of {}: {}", author, err);
                vec![]
            }
        },
    }
}

/// Publishes how many messages are still waiting behind the one just taken.
fn observe_depth(intake_rx: &mpsc::Receiver<IntakeMessage>) -> usize {
    let depth = intake_rx.len();
    metrics::set_dispatcher_queue_depth(depth);
    depth
}

async fn run_intake(
    mut intake_rx: mpsc::Receiver<IntakeMessage>,
    shards: Vec<mpsc::Sender<ShardMessage>>,
    engagement_store: Arc<dyn EngagementStore>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Notification dispatcher received shutdown signal");
                break;
            }
            message = intake_rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };
        observe_depth(&intake_rx);

        match message {
            IntakeMessage::Job(job) => {
                let events = expand(job, engagement_store.as_ref());
                let mut per_shard: Vec<Vec<NotificationEvent>> = vec![Vec::new(); shards.len()];
                for event in events {
                    per_shard[shard_for(&event.recipient, shards.len())].push(event);
                }
                for (shard, events) in shards.iter().zip(per_shard) {
                    if !events.is_empty() && shard.send(ShardMessage::Events(events)).await.is_err() {
                        warn!("Notification worker gone, dropping events");
                    }
                }
            }
            IntakeMessage::Barrier(done) => {
                let mut pending = Vec::with_capacity(shards.len());
                for shard in &shards {
                    let (tx, rx) = oneshot::channel();
                    if shard.send(ShardMessage::Barrier(tx)).await.is_ok() {
                        pending.push(rx);
                    }
                }
                for rx in pending {
                    let _ = rx.await;
                }
                let _ = done.send(());
            }
        }
    }
    debug!("Notification intake stopped");
}

async fn run_shard(
    index: usize,
    mut rx: mpsc::Receiver<ShardMessage>,
    service: Arc<NotificationService>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        match message {
            ShardMessage::Events(mut events) => {
                let result = if events.len() == 1 {
                    service.notify(events.remove(0)).await.map(|_| ())
                } else {
                    service.notify_bulk(events).await.map(|_| ())
                };
                if let Err(err) = result {
                    warn!("Notification worker {} failed to persist: {}", index, err);
                }
            }
            ShardMessage::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Notification worker {} stopped", index);
}
