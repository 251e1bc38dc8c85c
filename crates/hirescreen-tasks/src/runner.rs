//! Lifecycle operations shared by every task family.
//!
//! All writes go through [`TaskStore::transition_task`] with an explicit set
//! of allowed source states, so a task that reached a terminal state (in
//! particular, one cancelled concurrently) is never moved again.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use hirescreen_core::{TaskKind, TaskOf, TaskProgress, TaskRecord, TaskStatus};
use hirescreen_db::{DbError, StatusCount, TaskChange, TaskStore};
use uuid::Uuid;

use crate::error::TaskError;

const CANCELLABLE: &[TaskStatus] = &[TaskStatus::Pending, TaskStatus::Processing];

/// Outcome of an enqueue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// A new task was created.
    Created(Uuid),
    /// A live task with the same idempotency key already exists.
    Duplicate(Uuid),
}

impl EnqueueResult {
    #[must_use]
    pub fn task_id(self) -> Uuid {
        match self {
            Self::Created(id) | Self::Duplicate(id) => id,
        }
    }

    #[must_use]
    pub fn is_created(self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// What an executor should do after a progress checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Continue,
    /// The task left `Processing` (usually cancelled); stop now.
    Stop(TaskStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The task had already finished; nothing changed.
    AlreadyFinished(TaskStatus),
}

/// Typed lifecycle handle for task family `K` over store `S`.
pub struct TaskRunner<K, S: ?Sized> {
    store: Arc<S>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, S: ?Sized> Clone for TaskRunner<K, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _kind: PhantomData,
        }
    }
}

impl<K, S> TaskRunner<K, S>
where
    K: TaskKind,
    S: TaskStore<K> + ?Sized,
{
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    /// Inserts a pending task unless a live task with the same idempotency
    /// key exists, in which case that task's id is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn enqueue(
        &self,
        config: K::Config,
        total: u32,
        idempotency_key: Option<String>,
    ) -> Result<EnqueueResult, TaskError> {
        if let Some(existing) = self.find_live(idempotency_key.as_deref()).await? {
            return Ok(EnqueueResult::Duplicate(existing));
        }

        let task: TaskOf<K> = TaskRecord::pending(config, total, idempotency_key.clone());
        match self.store.insert_task(&task).await {
            Ok(()) => {
                tracing::info!(kind = K::NAME, task_id = %task.id, total, "task enqueued");
                Ok(EnqueueResult::Created(task.id))
            }
            // Lost an insert race against an identical dispatch.
            Err(DbError::Duplicate(_)) => match self.find_live(idempotency_key.as_deref()).await? {
                Some(existing) => Ok(EnqueueResult::Duplicate(existing)),
                None => Err(TaskError::Db(DbError::Duplicate(task.id.to_string()))),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn find_live(&self, key: Option<&str>) -> Result<Option<Uuid>, TaskError> {
        let Some(key) = key else {
            return Ok(None);
        };
        let found = self.store.find_active_task_by_idempotency_key(key).await?;
        Ok(found.map(|t| t.id))
    }

    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] if no task of this kind has `id`.
    pub async fn get(&self, id: Uuid) -> Result<TaskOf<K>, TaskError> {
        self.store
            .get_task(id)
            .await?
            .ok_or(TaskError::NotFound { kind: K::NAME, id })
    }

    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskOf<K>>, TaskError> {
        Ok(self.store.list_tasks(status, limit).await?)
    }

    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn counts(&self) -> Result<Vec<StatusCount>, TaskError> {
        Ok(self.store.count_tasks_by_status().await?)
    }

    /// Moves a pending task to processing. Returns `false` if the task is no
    /// longer pending (e.g. it was cancelled before work began).
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn start(&self, id: Uuid, last_status: &str) -> Result<bool, TaskError> {
        let change = TaskChange::to_status(TaskStatus::Processing).with_last_status(last_status);
        Ok(self
            .store
            .transition_task(id, &[TaskStatus::Pending], &change)
            .await?)
    }

    /// Claims the oldest pending task for `worker_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn claim(&self, worker_id: &str) -> Result<Option<TaskOf<K>>, TaskError> {
        Ok(self.store.claim_next_task(worker_id).await?)
    }

    /// Persists progress while the task is still processing, then reports
    /// whether the executor should keep going.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn checkpoint(
        &self,
        id: Uuid,
        progress: TaskProgress,
        last_status: impl Into<String>,
    ) -> Result<Checkpoint, TaskError> {
        let change = TaskChange::progress(progress).with_last_status(last_status);
        if self
            .store
            .transition_task(id, &[TaskStatus::Processing], &change)
            .await?
        {
            return Ok(Checkpoint::Continue);
        }
        let current = self.get(id).await?;
        tracing::info!(
            kind = K::NAME,
            task_id = %id,
            status = %current.status,
            "task left processing; stopping at checkpoint"
        );
        Ok(Checkpoint::Stop(current.status))
    }

    /// Finalizes a processing task as completed with `summary`. Returns
    /// `false` if the task was no longer processing.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn complete(
        &self,
        id: Uuid,
        progress: TaskProgress,
        summary: K::Summary,
        last_status: impl Into<String>,
    ) -> Result<bool, TaskError> {
        let change = TaskChange::to_status(TaskStatus::Completed)
            .with_progress(progress)
            .with_summary(summary)
            .with_last_status(last_status);
        let done = self
            .store
            .transition_task(id, &[TaskStatus::Processing], &change)
            .await?;
        if done {
            tracing::info!(kind = K::NAME, task_id = %id, "task completed");
        }
        Ok(done)
    }

    /// Attaches partial results to a task that was cancelled mid-run.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn record_cancelled(
        &self,
        id: Uuid,
        progress: TaskProgress,
        summary: K::Summary,
    ) -> Result<bool, TaskError> {
        let change = TaskChange::progress(progress)
            .with_summary(summary)
            .with_last_status("cancelled");
        Ok(self
            .store
            .transition_task(id, &[TaskStatus::Cancelled], &change)
            .await?)
    }

    /// Marks a pending or processing task failed.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn fail(&self, id: Uuid, message: &str) -> Result<bool, TaskError> {
        let change = TaskChange::to_status(TaskStatus::Failed)
            .with_error(message)
            .with_last_status("failed");
        let done = self.store.transition_task(id, CANCELLABLE, &change).await?;
        if done {
            tracing::warn!(kind = K::NAME, task_id = %id, error = message, "task failed");
        }
        Ok(done)
    }

    /// Fails a task only if it is still pending. Used by the staleness sweep
    /// so a task claimed in the meantime is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn expire(&self, id: Uuid, message: &str) -> Result<bool, TaskError> {
        let change = TaskChange::to_status(TaskStatus::Failed)
            .with_error(message)
            .with_last_status("expired");
        Ok(self
            .store
            .transition_task(id, &[TaskStatus::Pending], &change)
            .await?)
    }

    /// Pending tasks created before `created_before`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Db`] if the store fails.
    pub async fn stale_pending(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<TaskOf<K>>, TaskError> {
        Ok(self.store.list_stale_pending_tasks(created_before).await?)
    }

    /// Like [`fail`](Self::fail) but only logs a secondary store error.
    pub async fn fail_best_effort(&self, id: Uuid, message: &str) {
        if let Err(mark_err) = self.fail(id, message).await {
            tracing::error!(
                kind = K::NAME,
                task_id = %id,
                error = %mark_err,
                "failed to mark task as failed"
            );
        }
    }

    /// Requests cancellation. In-flight work observes it at its next
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotFound`] for an unknown id, or
    /// [`TaskError::Db`] if the store fails.
    pub async fn cancel(&self, id: Uuid) -> Result<CancelOutcome, TaskError> {
        let change = TaskChange::to_status(TaskStatus::Cancelled).with_last_status("cancelled");
        if self.store.transition_task(id, CANCELLABLE, &change).await? {
            tracing::info!(kind = K::NAME, task_id = %id, "task cancelled");
            return Ok(CancelOutcome::Cancelled);
        }
        let current = self.get(id).await?;
        Ok(CancelOutcome::AlreadyFinished(current.status))
    }
}
