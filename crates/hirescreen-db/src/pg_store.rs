use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hirescreen_core::{
    CandidateRecord, JobRequirement, MatchResult, TaskKind, TaskOf, TaskStatus, WorkerHeartbeat,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{
    CandidatePatch, CandidateStore, JobRequirementStore, StatusCount, TaskChange, TaskStore,
    WorkerStore,
};
use crate::{candidates, jobs, tasks, workers, DbError};

/// Postgres-backed store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CandidateStore for PgStore {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, DbError> {
        candidates::get_candidate(&self.pool, id).await
    }

    async fn find_candidate_by_identity_key(
        &self,
        identity_key: &str,
    ) -> Result<Option<CandidateRecord>, DbError> {
        candidates::find_candidate_by_identity_key(&self.pool, identity_key).await
    }

    async fn find_candidate_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CandidateRecord>, DbError> {
        candidates::find_candidate_by_external_id(&self.pool, external_id).await
    }

    async fn get_candidates(&self, ids: &[Uuid]) -> Result<Vec<CandidateRecord>, DbError> {
        candidates::get_candidates(&self.pool, ids).await
    }

    async fn list_candidates(&self) -> Result<Vec<CandidateRecord>, DbError> {
        candidates::list_candidates(&self.pool).await
    }

    async fn scan_candidates(
        &self,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, DbError> {
        candidates::scan_candidates(&self.pool, after, limit).await
    }

    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<(), DbError> {
        candidates::insert_candidate(&self.pool, record).await
    }

    async fn patch_candidate(&self, id: Uuid, patch: &CandidatePatch) -> Result<(), DbError> {
        candidates::patch_candidate(&self.pool, id, patch).await
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool, DbError> {
        candidates::delete_candidate(&self.pool, id).await
    }

    async fn put_analysis(&self, candidate_id: Uuid, result: &MatchResult) -> Result<(), DbError> {
        candidates::put_analysis(&self.pool, candidate_id, result).await
    }
}

#[async_trait]
impl JobRequirementStore for PgStore {
    async fn get_job_requirement(&self, id: Uuid) -> Result<Option<JobRequirement>, DbError> {
        jobs::get_job_requirement(&self.pool, id).await
    }

    async fn list_job_requirements(&self) -> Result<Vec<JobRequirement>, DbError> {
        jobs::list_job_requirements(&self.pool).await
    }

    async fn upsert_job_requirement(&self, job: &JobRequirement) -> Result<(), DbError> {
        jobs::upsert_job_requirement(&self.pool, job).await
    }
}

#[async_trait]
impl<K: TaskKind> TaskStore<K> for PgStore {
    async fn insert_task(&self, task: &TaskOf<K>) -> Result<(), DbError> {
        tasks::insert_task::<K>(&self.pool, task).await
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<TaskOf<K>>, DbError> {
        tasks::get_task::<K>(&self.pool, id).await
    }

    async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskOf<K>>, DbError> {
        tasks::list_tasks::<K>(&self.pool, status, limit).await
    }

    async fn find_active_task_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TaskOf<K>>, DbError> {
        tasks::find_active_task_by_idempotency_key::<K>(&self.pool, key).await
    }

    async fn transition_task(
        &self,
        id: Uuid,
        from: &[TaskStatus],
        change: &TaskChange<K::Summary>,
    ) -> Result<bool, DbError> {
        tasks::transition_task::<K>(&self.pool, id, from, change).await
    }

    async fn claim_next_task(&self, worker_id: &str) -> Result<Option<TaskOf<K>>, DbError> {
        tasks::claim_next_task::<K>(&self.pool, worker_id).await
    }

    async fn list_stale_pending_tasks(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<TaskOf<K>>, DbError> {
        tasks::list_stale_pending_tasks::<K>(&self.pool, created_before).await
    }

    async fn count_tasks_by_status(&self) -> Result<Vec<StatusCount>, DbError> {
        tasks::count_tasks_by_status::<K>(&self.pool).await
    }
}

#[async_trait]
impl WorkerStore for PgStore {
    async fn upsert_worker_heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), DbError> {
        workers::upsert_worker_heartbeat(&self.pool, heartbeat).await
    }

    async fn list_worker_heartbeats(&self) -> Result<Vec<WorkerHeartbeat>, DbError> {
        workers::list_worker_heartbeats(&self.pool).await
    }
}
