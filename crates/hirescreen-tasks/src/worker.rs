//! Collection worker: claim a pending task, process it, report liveness.
//!
//! Heartbeats run on their own ticker so a long task keeps reporting while
//! it works. Shutdown is signalled through a `watch` channel; the worker
//! finishes the task in hand, then publishes a final idle heartbeat.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hirescreen_core::{AppConfig, WorkerHeartbeat, WorkerState};
use hirescreen_db::{ScreeningStore, WorkerStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::collection::{CollectionOutcome, CollectionService};
use crate::error::TaskError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl WorkerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            worker_id: config.worker_id.clone(),
            poll_interval: Duration::from_secs(config.worker_poll_interval_secs.max(1)),
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs.max(1)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Status {
    state: WorkerState,
    active_task_id: Option<Uuid>,
    last_error: Option<String>,
}

impl Status {
    fn heartbeat(&self, worker_id: &str) -> WorkerHeartbeat {
        WorkerHeartbeat {
            worker_id: worker_id.to_string(),
            state: self.state,
            active_task_id: self.active_task_id,
            last_heartbeat_at: Utc::now(),
            last_error: self.last_error.clone(),
        }
    }
}

async fn publish<S: WorkerStore + ?Sized>(store: &S, worker_id: &str, status: &Status) {
    if let Err(e) = store
        .upsert_worker_heartbeat(&status.heartbeat(worker_id))
        .await
    {
        tracing::warn!(worker_id, error = %e, "failed to record heartbeat");
    }
}

pub struct CollectionWorker<S: ?Sized> {
    store: Arc<S>,
    service: Arc<CollectionService<S>>,
    config: WorkerConfig,
    status: watch::Sender<Status>,
}

impl<S> CollectionWorker<S>
where
    S: ScreeningStore + ?Sized + 'static,
{
    #[must_use]
    pub fn new(store: Arc<S>, service: Arc<CollectionService<S>>, config: WorkerConfig) -> Self {
        let (status, _) = watch::channel(Status {
            state: WorkerState::Idle,
            active_task_id: None,
            last_error: None,
        });
        Self {
            store,
            service,
            config,
            status,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }

    /// Claims and processes at most one pending collection task.
    ///
    /// Returns the id of the task handled, or `None` when the queue was
    /// empty. A failed task leaves the worker in the error state until its
    /// next successful poll.
    ///
    /// # Errors
    ///
    /// Returns the [`TaskError`] that failed the claim or the task.
    pub async fn run_once(&self) -> Result<Option<Uuid>, TaskError> {
        let claimed = match self.service.runner().claim(&self.config.worker_id).await {
            Ok(claimed) => claimed,
            Err(e) => {
                self.report_error(&e).await;
                return Err(e);
            }
        };
        let Some(task) = claimed else {
            if self.status.borrow().state != WorkerState::Idle {
                self.set_idle().await;
            }
            return Ok(None);
        };

        tracing::info!(worker_id = %self.config.worker_id, task_id = %task.id, "claimed collection task");
        self.status.send_modify(|s| {
            s.state = WorkerState::Processing;
            s.active_task_id = Some(task.id);
        });
        self.beat().await;

        match self.service.process(&task).await {
            Ok(outcome) => {
                if let CollectionOutcome::Stopped(status, _) = outcome {
                    tracing::info!(worker_id = %self.config.worker_id, task_id = %task.id, status = %status, "collection task stopped early");
                }
                self.set_idle().await;
                Ok(Some(task.id))
            }
            Err(e) => {
                self.report_error(&e).await;
                Err(e)
            }
        }
    }

    /// Polls until `shutdown` turns `true` or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(worker_id = %self.config.worker_id, "collection worker started");
        self.beat().await;
        let heartbeat = self.spawn_heartbeat(shutdown.clone());

        while !*shutdown.borrow() {
            let idle = match self.run_once().await {
                Ok(handled) => handled.is_none(),
                Err(e) => {
                    tracing::warn!(worker_id = %self.config.worker_id, error = %e, "collection worker iteration failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        heartbeat.abort();
        let _ = heartbeat.await;
        self.set_idle().await;
        tracing::info!(worker_id = %self.config.worker_id, "collection worker stopped");
    }

    fn spawn_heartbeat(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let status = self.status.subscribe();
        let worker_id = self.config.worker_id.clone();
        let every = self.config.heartbeat_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = status.borrow().clone();
                        publish(store.as_ref(), &worker_id, &snapshot).await;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    }

    async fn set_idle(&self) {
        self.status.send_modify(|s| {
            s.state = WorkerState::Idle;
            s.active_task_id = None;
        });
        self.beat().await;
    }

    async fn report_error(&self, error: &TaskError) {
        self.status.send_modify(|s| {
            s.state = WorkerState::Error;
            s.active_task_id = None;
            s.last_error = Some(error.to_string());
        });
        self.beat().await;
    }

    async fn beat(&self) {
        let snapshot = self.status.borrow().clone();
        publish(self.store.as_ref(), &self.config.worker_id, &snapshot).await;
    }
}
