use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::delivery::channel::{
    backup_tag, ChannelError, DeferredTaskChannel, DeliverySink, PreciseTimerChannel,
    ReminderPayload, TimerPrecision,
};
use crate::scheduling::DispatchToken;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// One pending delivery: a task sleeping until its due instant, torn down
/// through its cancellation token.
struct ScheduledTask {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScheduledTask {
    fn spawn(
        token: DispatchToken,
        payload: ReminderPayload,
        delay: Duration,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        let cancellation_token = CancellationToken::new();
        let task_cancellation_token = cancellation_token.child_token();

        let task_handle = task::spawn(async move {
            tokio::select! {
                _ = task_cancellation_token.cancelled() => {
                    log::debug!("Scheduled delivery was cancelled. [token = {token}]");
                }
                _ = tokio::time::sleep(delay) => {
                    sink.on_fire(token, payload, Utc::now()).await;
                }
            }
        });

        Self {
            task_handle,
            cancellation_token,
        }
    }

    /// Does not wait for the task: a delivery already past the select point
    /// will still display once.
    fn cancel(&self) {
        self.cancellation_token.cancel();
    }
}

struct CleanupTask(watch::Sender<()>);

/// Keyed set of pending deliveries with last-submission-wins replacement and
/// a periodic sweep of finished entries.
struct TaskStore<K> {
    tasks: Arc<RwLock<HashMap<K, ScheduledTask>>>,
    cleanup_task: CleanupTask,
}

impl<K> TaskStore<K>
where
    K: Eq + Hash + Send + Sync + 'static,
{
    fn new() -> Self {
        let tasks = Arc::new(RwLock::new(HashMap::new()));
        let cleanup_task = Self::spawn_cleanup_task(Arc::clone(&tasks));

        Self {
            tasks,
            cleanup_task,
        }
    }

    async fn replace(&self, key: K, task: ScheduledTask) {
        if let Some(previous) = self.tasks.write().await.insert(key, task) {
            previous.cancel();
        }
    }

    async fn cancel<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        match self.tasks.write().await.remove(key) {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    fn spawn_cleanup_task(tasks: Arc<RwLock<HashMap<K, ScheduledTask>>>) -> CleanupTask {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());
        task::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(CLEANUP_INTERVAL) => {
                        Self::clean_finished_tasks(&tasks).await;
                    }
                    _ = shutdown_rx.changed() => {
                        log::debug!("Cleanup task shutting down");
                        break;
                    }
                };
            }
        });

        CleanupTask(shutdown_tx)
    }

    async fn clean_finished_tasks(tasks: &RwLock<HashMap<K, ScheduledTask>>) {
        let mut tasks = tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, task| !task.task_handle.is_finished());
        let after = tasks.len();

        if before != after {
            log::debug!("Cleaned up {} delivered entries", before - after);
        }
    }
}

impl<K> Drop for TaskStore<K> {
    fn drop(&mut self) {
        let _ = self.cleanup_task.0.send(());
    }
}

/// In-process rendition of the precise-timer channel: a tokio task per token
/// sleeping until the absolute due instant. A host without a platform timer
/// API can run both channels on this machinery for the same redundancy.
pub struct LocalTimerChannel {
    store: TaskStore<DispatchToken>,
    sink: Arc<dyn DeliverySink>,
    precision: TimerPrecision,
}

impl LocalTimerChannel {
    pub fn new(sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            store: TaskStore::new(),
            sink,
            precision: TimerPrecision::Exact,
        }
    }

    /// A channel whose exact-timer privilege was denied: submissions still
    /// land, reported as inexact.
    pub fn degraded(sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            precision: TimerPrecision::Inexact,
            ..Self::new(sink)
        }
    }
}

#[async_trait]
impl PreciseTimerChannel for LocalTimerChannel {
    async fn submit(
        &self,
        token: DispatchToken,
        at: DateTime<Utc>,
        payload: ReminderPayload,
    ) -> Result<TimerPrecision, ChannelError> {
        let delay = (at - Utc::now())
            .to_std()
            .map_err(|_| ChannelError::Submission(anyhow::anyhow!("due instant already passed")))?;

        let task = ScheduledTask::spawn(token, payload, delay, Arc::clone(&self.sink));
        self.store.replace(token, task).await;

        Ok(self.precision)
    }

    async fn cancel(&self, token: DispatchToken) -> Result<(), ChannelError> {
        if self.store.cancel(&token).await {
            Ok(())
        } else {
            Err(ChannelError::NotFound)
        }
    }
}

/// In-process rendition of the deferred-task backup channel, keyed by tag.
pub struct LocalTaskQueue {
    store: TaskStore<String>,
    sink: Arc<dyn DeliverySink>,
}

impl LocalTaskQueue {
    pub fn new(sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            store: TaskStore::new(),
            sink,
        }
    }
}

#[async_trait]
impl DeferredTaskChannel for LocalTaskQueue {
    async fn submit_delayed(
        &self,
        token: DispatchToken,
        delay: chrono::Duration,
        payload: ReminderPayload,
    ) -> Result<(), ChannelError> {
        let delay = delay
            .to_std()
            .map_err(|_| ChannelError::Submission(anyhow::anyhow!("delay is negative")))?;

        let task = ScheduledTask::spawn(token, payload, delay, Arc::clone(&self.sink));
        self.store.replace(backup_tag(token), task).await;

        Ok(())
    }

    async fn cancel_by_tag(&self, tag: &str) -> Result<(), ChannelError> {
        if self.store.cancel(tag).await {
            Ok(())
        } else {
            Err(ChannelError::NotFound)
        }
    }
}
