//! Repository traits. Orchestration code depends on these, never on a
//! concrete backend.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hirescreen_core::{
    AnalysisKind, CandidateContent, CandidateRecord, CollectionKind, JobRequirement, MatchResult,
    StructuredIndex, TaskKind, TaskOf, TaskProgress, TaskStatus, WorkerHeartbeat,
};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Field-level update for a stored candidate. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePatch {
    pub identity_key: Option<String>,
    pub content: Option<CandidateContent>,
    pub content_hash: Option<String>,
    pub structured: Option<StructuredIndex>,
    pub tags: Option<BTreeSet<String>>,
    pub analyses: Option<BTreeMap<String, MatchResult>>,
    pub crawled_at: Option<DateTime<Utc>>,
}

impl CandidatePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identity_key.is_none()
            && self.content.is_none()
            && self.content_hash.is_none()
            && self.structured.is_none()
            && self.tags.is_none()
            && self.analyses.is_none()
            && self.crawled_at.is_none()
    }

    /// Applies the patch in place, bumping `updated_at`.
    pub fn apply_to(&self, record: &mut CandidateRecord, now: DateTime<Utc>) {
        if let Some(v) = &self.identity_key {
            record.identity_key.clone_from(v);
        }
        if let Some(v) = &self.content {
            record.content = v.clone();
        }
        if let Some(v) = &self.content_hash {
            record.content_hash.clone_from(v);
        }
        if let Some(v) = &self.structured {
            record.structured = Some(v.clone());
        }
        if let Some(v) = &self.tags {
            record.tags.clone_from(v);
        }
        if let Some(v) = &self.analyses {
            record.analyses.clone_from(v);
        }
        if let Some(v) = self.crawled_at {
            record.crawled_at = v;
        }
        record.updated_at = now;
    }
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, DbError>;

    /// Most recently crawled record carrying `identity_key`.
    async fn find_candidate_by_identity_key(
        &self,
        identity_key: &str,
    ) -> Result<Option<CandidateRecord>, DbError>;

    /// Most recently crawled record carrying `external_id`.
    async fn find_candidate_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CandidateRecord>, DbError>;

    /// Records with the given ids, in id order. Unknown ids are skipped.
    async fn get_candidates(&self, ids: &[Uuid]) -> Result<Vec<CandidateRecord>, DbError>;

    async fn list_candidates(&self) -> Result<Vec<CandidateRecord>, DbError>;

    /// One page of records in id order, strictly after `after`.
    async fn scan_candidates(
        &self,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, DbError>;

    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<(), DbError>;

    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] when `id` does not exist.
    async fn patch_candidate(&self, id: Uuid, patch: &CandidatePatch) -> Result<(), DbError>;

    /// Returns `false` when nothing was deleted.
    async fn delete_candidate(&self, id: Uuid) -> Result<bool, DbError>;

    /// Stores `result` under its `job_requirement_id` scope, replacing any
    /// previous result for that scope.
    async fn put_analysis(&self, candidate_id: Uuid, result: &MatchResult) -> Result<(), DbError>;
}

// ---------------------------------------------------------------------------
// Job requirements
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobRequirementStore: Send + Sync {
    async fn get_job_requirement(&self, id: Uuid) -> Result<Option<JobRequirement>, DbError>;
    async fn list_job_requirements(&self) -> Result<Vec<JobRequirement>, DbError>;
    async fn upsert_job_requirement(&self, job: &JobRequirement) -> Result<(), DbError>;
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A guarded update to a task row. Unset fields are left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskChange<S> {
    pub status: Option<TaskStatus>,
    pub progress: Option<TaskProgress>,
    pub last_status: Option<String>,
    pub error_message: Option<String>,
    pub summary: Option<S>,
    pub worker_id: Option<String>,
    /// Stamp `started_at` if it is not already set.
    pub mark_started: bool,
    /// Stamp `completed_at`.
    pub mark_completed: bool,
}

impl<S> Default for TaskChange<S> {
    fn default() -> Self {
        Self {
            status: None,
            progress: None,
            last_status: None,
            error_message: None,
            summary: None,
            worker_id: None,
            mark_started: false,
            mark_completed: false,
        }
    }
}

impl<S> TaskChange<S> {
    /// A status change. Entering `Processing` stamps `started_at`; entering a
    /// terminal state stamps `completed_at`.
    #[must_use]
    pub fn to_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            mark_started: status == TaskStatus::Processing,
            mark_completed: status.is_terminal(),
            ..Self::default()
        }
    }

    /// A progress write that leaves the status alone.
    #[must_use]
    pub fn progress(progress: TaskProgress) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: TaskProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_last_status(mut self, text: impl Into<String>) -> Self {
        self.last_status = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_summary(mut self, summary: S) -> Self {
        self.summary = Some(summary);
        self
    }

    #[must_use]
    pub fn with_worker(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }

    /// Re-types the summary payload.
    ///
    /// # Errors
    ///
    /// Propagates the error from `f`.
    pub fn try_map_summary<T, E>(
        self,
        f: impl FnOnce(S) -> Result<T, E>,
    ) -> Result<TaskChange<T>, E> {
        Ok(TaskChange {
            status: self.status,
            progress: self.progress,
            last_status: self.last_status,
            error_message: self.error_message,
            summary: self.summary.map(f).transpose()?,
            worker_id: self.worker_id,
            mark_started: self.mark_started,
            mark_completed: self.mark_completed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: u64,
}

/// Persistence for one task family. Every write that changes status is
/// guarded by the set of statuses it may start from, so a terminal state is
/// never overwritten.
#[async_trait]
pub trait TaskStore<K: TaskKind>: Send + Sync {
    /// # Errors
    ///
    /// Returns [`DbError::Duplicate`] when a live task with the same
    /// idempotency key already exists.
    async fn insert_task(&self, task: &TaskOf<K>) -> Result<(), DbError>;

    async fn get_task(&self, id: Uuid) -> Result<Option<TaskOf<K>>, DbError>;

    /// Newest first, optionally filtered by status.
    async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskOf<K>>, DbError>;

    /// A pending or processing task carrying `key`.
    async fn find_active_task_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TaskOf<K>>, DbError>;

    /// Applies `change` only while the task's status is one of `from`.
    /// Returns `false` when the guard did not hold (or the task is unknown).
    async fn transition_task(
        &self,
        id: Uuid,
        from: &[TaskStatus],
        change: &TaskChange<K::Summary>,
    ) -> Result<bool, DbError>;

    /// Atomically moves the oldest pending task to processing under
    /// `worker_id` and returns it.
    async fn claim_next_task(&self, worker_id: &str) -> Result<Option<TaskOf<K>>, DbError>;

    /// Pending tasks created before `created_before`.
    async fn list_stale_pending_tasks(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<TaskOf<K>>, DbError>;

    /// One entry per status, zero counts included, in lifecycle order.
    async fn count_tasks_by_status(&self) -> Result<Vec<StatusCount>, DbError>;
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WorkerStore: Send + Sync {
    async fn upsert_worker_heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), DbError>;
    async fn list_worker_heartbeats(&self) -> Result<Vec<WorkerHeartbeat>, DbError>;
}

/// Everything the application needs from storage.
pub trait ScreeningStore:
    CandidateStore
    + JobRequirementStore
    + TaskStore<AnalysisKind>
    + TaskStore<CollectionKind>
    + WorkerStore
{
}

impl<T> ScreeningStore for T where
    T: CandidateStore
        + JobRequirementStore
        + TaskStore<AnalysisKind>
        + TaskStore<CollectionKind>
        + WorkerStore
{
}

/// Fills in zero counts so callers always see every status.
pub(crate) fn complete_counts(found: &[(TaskStatus, u64)]) -> Vec<StatusCount> {
    TaskStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: found
                .iter()
                .filter(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .sum(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entering_processing_stamps_start_only() {
        let change = TaskChange::<()>::to_status(TaskStatus::Processing);
        assert!(change.mark_started);
        assert!(!change.mark_completed);
    }

    #[test]
    fn entering_terminal_state_stamps_completion() {
        for status in [TaskStatus::Completed, TaskStatus::Failed, TaskStatus::Cancelled] {
            let change = TaskChange::<()>::to_status(status);
            assert!(change.mark_completed, "{status}");
            assert!(!change.mark_started, "{status}");
        }
    }

    #[test]
    fn counts_cover_every_status() {
        let counts = complete_counts(&[(TaskStatus::Failed, 2), (TaskStatus::Pending, 5)]);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0], StatusCount { status: TaskStatus::Pending, count: 5 });
        assert_eq!(counts[1].count, 0);
        assert_eq!(counts[3], StatusCount { status: TaskStatus::Failed, count: 2 });
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(CandidatePatch::default().is_empty());
        let patch = CandidatePatch {
            content_hash: Some("h".into()),
            ..CandidatePatch::default()
        };
        assert!(!patch.is_empty());
    }
}
