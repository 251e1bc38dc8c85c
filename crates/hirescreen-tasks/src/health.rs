//! Worker health and stale-task reconciliation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hirescreen_core::{AnalysisKind, CollectionKind, TaskKind, WorkerHeartbeat};
use hirescreen_db::{ScreeningStore, TaskStore, WorkerStore};
use serde::Serialize;
use uuid::Uuid;

use crate::error::TaskError;
use crate::runner::TaskRunner;

/// A heartbeat annotated with its computed health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerHealth {
    #[serde(flatten)]
    pub heartbeat: WorkerHeartbeat,
    pub healthy: bool,
}

/// Lists every known worker with its health at `now`.
///
/// # Errors
///
/// Returns [`TaskError::Db`] if the store fails.
pub async fn worker_health<S: WorkerStore + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
    freshness: Duration,
) -> Result<Vec<WorkerHealth>, TaskError> {
    let beats = store.list_worker_heartbeats().await?;
    Ok(beats
        .into_iter()
        .map(|heartbeat| WorkerHealth {
            healthy: heartbeat.is_healthy(now, freshness),
            heartbeat,
        })
        .collect())
}

/// Ids of the tasks a reconciliation sweep failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub analysis: Vec<Uuid>,
    pub collection: Vec<Uuid>,
}

impl ReconcileReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.analysis.len() + self.collection.len()
    }
}

/// Fails every task still pending `stale_after` past its creation.
///
/// A task claimed between the listing and the update is left alone.
///
/// # Errors
///
/// Returns [`TaskError::Db`] if the store fails.
pub async fn reconcile_stale_tasks<S>(
    store: &Arc<S>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<ReconcileReport, TaskError>
where
    S: ScreeningStore + ?Sized,
{
    let cutoff = now - stale_after;
    let report = ReconcileReport {
        analysis: expire_family::<AnalysisKind, S>(store, cutoff, stale_after).await?,
        collection: expire_family::<CollectionKind, S>(store, cutoff, stale_after).await?,
    };
    if report.total() > 0 {
        tracing::warn!(
            analysis = report.analysis.len(),
            collection = report.collection.len(),
            "expired stale pending tasks"
        );
    } else {
        tracing::debug!("no stale pending tasks");
    }
    Ok(report)
}

async fn expire_family<K, S>(
    store: &Arc<S>,
    cutoff: DateTime<Utc>,
    stale_after: Duration,
) -> Result<Vec<Uuid>, TaskError>
where
    K: TaskKind,
    S: TaskStore<K> + ?Sized,
{
    let runner: TaskRunner<K, S> = TaskRunner::new(Arc::clone(store));
    let message = format!(
        "no worker picked up the task within {} seconds",
        stale_after.num_seconds()
    );
    let mut expired = Vec::new();
    for task in runner.stale_pending(cutoff).await? {
        if runner.expire(task.id, &message).await? {
            tracing::info!(kind = K::NAME, task_id = %task.id, "stale task expired");
            expired.push(task.id);
        }
    }
    Ok(expired)
}
