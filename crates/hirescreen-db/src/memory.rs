//! In-process store with the same guarded-transition semantics as Postgres.
//! Used by tests and single-process CLI runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hirescreen_core::{
    CandidateRecord, JobRequirement, MatchResult, TaskKind, TaskOf, TaskStatus, WorkerHeartbeat,
};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{
    complete_counts, CandidatePatch, CandidateStore, JobRequirementStore, StatusCount, TaskChange,
    TaskStore, WorkerStore,
};
use crate::tasks::{decode_task, encode_change, encode_task, StoredTask};
use crate::DbError;

#[derive(Debug, Default)]
struct MemoryState {
    candidates: BTreeMap<Uuid, CandidateRecord>,
    jobs: Vec<JobRequirement>,
    tasks: BTreeMap<Uuid, (&'static str, StoredTask)>,
    workers: BTreeMap<String, WorkerHeartbeat>,
}

impl MemoryState {
    fn tasks_of<'a>(&'a self, kind: &'static str) -> impl Iterator<Item = &'a StoredTask> + 'a {
        self.tasks
            .values()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, task)| task)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_active(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Pending | TaskStatus::Processing)
}

fn apply_change(task: &mut StoredTask, change: TaskChange<Value>, now: DateTime<Utc>) {
    if let Some(status) = change.status {
        task.status = status;
    }
    if let Some(progress) = change.progress {
        task.progress = progress;
    }
    if let Some(text) = change.last_status {
        task.last_status = Some(text);
    }
    if let Some(message) = change.error_message {
        task.error_message = Some(message);
    }
    if let Some(summary) = change.summary {
        task.summary = Some(summary);
    }
    if let Some(worker_id) = change.worker_id {
        task.worker_id = Some(worker_id);
    }
    if change.mark_started && task.started_at.is_none() {
        task.started_at = Some(now);
    }
    if change.mark_completed {
        task.completed_at = Some(now);
    }
    task.updated_at = now;
}

fn latest_by<'a>(
    candidates: impl Iterator<Item = &'a CandidateRecord>,
) -> Option<&'a CandidateRecord> {
    candidates.min_by(|a, b| b.crawled_at.cmp(&a.crawled_at).then(a.id.cmp(&b.id)))
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, DbError> {
        Ok(self.state.lock().await.candidates.get(&id).cloned())
    }

    async fn find_candidate_by_identity_key(
        &self,
        identity_key: &str,
    ) -> Result<Option<CandidateRecord>, DbError> {
        let state = self.state.lock().await;
        Ok(latest_by(
            state
                .candidates
                .values()
                .filter(|c| c.identity_key == identity_key),
        )
        .cloned())
    }

    async fn find_candidate_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CandidateRecord>, DbError> {
        let state = self.state.lock().await;
        Ok(latest_by(
            state
                .candidates
                .values()
                .filter(|c| c.external_id == external_id),
        )
        .cloned())
    }

    async fn get_candidates(&self, ids: &[Uuid]) -> Result<Vec<CandidateRecord>, DbError> {
        let state = self.state.lock().await;
        Ok(state
            .candidates
            .values()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn list_candidates(&self) -> Result<Vec<CandidateRecord>, DbError> {
        let state = self.state.lock().await;
        let mut all: Vec<CandidateRecord> = state.candidates.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn scan_candidates(
        &self,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, DbError> {
        let state = self.state.lock().await;
        let page = match after {
            Some(cursor) => state
                .candidates
                .range((std::ops::Bound::Excluded(cursor), std::ops::Bound::Unbounded))
                .map(|(_, c)| c.clone())
                .take(limit)
                .collect(),
            None => state.candidates.values().take(limit).cloned().collect(),
        };
        Ok(page)
    }

    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        if state.candidates.contains_key(&record.id) {
            return Err(DbError::Duplicate(record.id.to_string()));
        }
        state.candidates.insert(record.id, record.clone());
        Ok(())
    }

    async fn patch_candidate(&self, id: Uuid, patch: &CandidatePatch) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        let record = state.candidates.get_mut(&id).ok_or(DbError::NotFound)?;
        patch.apply_to(record, Utc::now());
        Ok(())
    }

    async fn delete_candidate(&self, id: Uuid) -> Result<bool, DbError> {
        Ok(self.state.lock().await.candidates.remove(&id).is_some())
    }

    async fn put_analysis(&self, candidate_id: Uuid, result: &MatchResult) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        let record = state
            .candidates
            .get_mut(&candidate_id)
            .ok_or(DbError::NotFound)?;
        record
            .analyses
            .insert(result.job_requirement_id.clone(), result.clone());
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobRequirementStore for MemoryStore {
    async fn get_job_requirement(&self, id: Uuid) -> Result<Option<JobRequirement>, DbError> {
        let state = self.state.lock().await;
        Ok(state.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn list_job_requirements(&self) -> Result<Vec<JobRequirement>, DbError> {
        Ok(self.state.lock().await.jobs.clone())
    }

    async fn upsert_job_requirement(&self, job: &JobRequirement) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        match state.jobs.iter_mut().find(|j| j.id == job.id) {
            Some(existing) => *existing = job.clone(),
            None => state.jobs.push(job.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl<K: TaskKind> TaskStore<K> for MemoryStore {
    async fn insert_task(&self, task: &TaskOf<K>) -> Result<(), DbError> {
        let stored = encode_task::<K>(task)?;
        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&stored.id) {
            return Err(DbError::Duplicate(stored.id.to_string()));
        }
        if let Some(key) = stored.idempotency_key.as_deref() {
            let live = state.tasks_of(K::NAME).any(|t| {
                is_active(t.status) && t.idempotency_key.as_deref() == Some(key)
            });
            if live && is_active(stored.status) {
                return Err(DbError::Duplicate(key.to_string()));
            }
        }
        state.tasks.insert(stored.id, (K::NAME, stored));
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<TaskOf<K>>, DbError> {
        let state = self.state.lock().await;
        state
            .tasks
            .get(&id)
            .filter(|(kind, _)| *kind == K::NAME)
            .map(|(_, task)| decode_task::<K>(task.clone()))
            .transpose()
    }

    async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskOf<K>>, DbError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&StoredTask> = state
            .tasks_of(K::NAME)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matching
            .into_iter()
            .take(limit)
            .map(|t| decode_task::<K>(t.clone()))
            .collect()
    }

    async fn find_active_task_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<TaskOf<K>>, DbError> {
        let state = self.state.lock().await;
        let found = state
            .tasks_of(K::NAME)
            .find(|t| is_active(t.status) && t.idempotency_key.as_deref() == Some(key))
            .map(|t| decode_task::<K>(t.clone()))
            .transpose();
        found
    }

    async fn transition_task(
        &self,
        id: Uuid,
        from: &[TaskStatus],
        change: &TaskChange<K::Summary>,
    ) -> Result<bool, DbError> {
        let change = encode_change::<K>(change)?;
        let mut state = self.state.lock().await;
        let Some((kind, task)) = state.tasks.get_mut(&id) else {
            return Ok(false);
        };
        if *kind != K::NAME || !from.contains(&task.status) {
            return Ok(false);
        }
        apply_change(task, change, Utc::now());
        Ok(true)
    }

    async fn claim_next_task(&self, worker_id: &str) -> Result<Option<TaskOf<K>>, DbError> {
        let mut state = self.state.lock().await;
        let next = state
            .tasks_of(K::NAME)
            .filter(|t| t.status == TaskStatus::Pending)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .map(|t| t.id);
        let Some(id) = next else {
            return Ok(None);
        };
        let Some((_, task)) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        let change = TaskChange::<Value>::to_status(TaskStatus::Processing)
            .with_worker(worker_id)
            .with_last_status("claimed");
        apply_change(task, change, Utc::now());
        decode_task::<K>(task.clone()).map(Some)
    }

    async fn list_stale_pending_tasks(
        &self,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<TaskOf<K>>, DbError> {
        let state = self.state.lock().await;
        let mut stale: Vec<&StoredTask> = state
            .tasks_of(K::NAME)
            .filter(|t| t.status == TaskStatus::Pending && t.created_at < created_before)
            .collect();
        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        stale
            .into_iter()
            .map(|t| decode_task::<K>(t.clone()))
            .collect()
    }

    async fn count_tasks_by_status(&self) -> Result<Vec<StatusCount>, DbError> {
        let state = self.state.lock().await;
        let found: Vec<(TaskStatus, u64)> = state
            .tasks_of(K::NAME)
            .map(|t| (t.status, 1))
            .collect();
        Ok(complete_counts(&found))
    }
}

#[async_trait]
impl WorkerStore for MemoryStore {
    async fn upsert_worker_heartbeat(&self, heartbeat: &WorkerHeartbeat) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state
            .workers
            .insert(heartbeat.worker_id.clone(), heartbeat.clone());
        Ok(())
    }

    async fn list_worker_heartbeats(&self) -> Result<Vec<WorkerHeartbeat>, DbError> {
        Ok(self.state.lock().await.workers.values().cloned().collect())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
