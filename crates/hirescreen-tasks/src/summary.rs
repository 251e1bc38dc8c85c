//! Aggregate task views: per-family counts by status plus the newest tasks.

use std::collections::BTreeMap;
use std::sync::Arc;

use hirescreen_core::{AnalysisKind, AnalysisTask, CollectionKind, CollectionTask, TaskKind, TaskOf};
use hirescreen_db::{ScreeningStore, TaskStore};
use serde::Serialize;

use crate::error::TaskError;
use crate::runner::TaskRunner;

#[derive(Debug, Clone, Serialize)]
pub struct FamilySummary<T> {
    pub total: u64,
    /// Every status is present, zero counts included.
    pub by_status: BTreeMap<&'static str, u64>,
    /// Newest first.
    pub latest: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub analysis: FamilySummary<AnalysisTask>,
    pub collection: FamilySummary<CollectionTask>,
}

/// Builds the summary for both task families, keeping `latest` tasks each.
///
/// # Errors
///
/// Returns [`TaskError::Db`] if the store fails.
pub async fn task_summary<S>(store: &Arc<S>, latest: usize) -> Result<TaskSummary, TaskError>
where
    S: ScreeningStore + ?Sized,
{
    Ok(TaskSummary {
        analysis: family::<AnalysisKind, S>(store, latest).await?,
        collection: family::<CollectionKind, S>(store, latest).await?,
    })
}

async fn family<K, S>(store: &Arc<S>, latest: usize) -> Result<FamilySummary<TaskOf<K>>, TaskError>
where
    K: TaskKind,
    S: TaskStore<K> + ?Sized,
{
    let runner: TaskRunner<K, S> = TaskRunner::new(Arc::clone(store));
    let counts = runner.counts().await?;
    Ok(FamilySummary {
        total: counts.iter().map(|c| c.count).sum(),
        by_status: counts.iter().map(|c| (c.status.as_str(), c.count)).collect(),
        latest: runner.list(None, latest).await?,
    })
}

#[cfg(test)]
mod tests {
    use hirescreen_core::CollectionTaskConfig;
    use hirescreen_db::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn summary_counts_every_status_and_caps_latest() {
        let store = Arc::new(MemoryStore::new());
        let runner: TaskRunner<CollectionKind, MemoryStore> = TaskRunner::new(Arc::clone(&store));
        let mut ids = Vec::new();
        for keyword in ["a", "b", "c"] {
            let config = CollectionTaskConfig {
                keyword: keyword.into(),
                location: None,
                limit: 1,
            };
            ids.push(runner.enqueue(config, 1, None).await.unwrap().task_id());
        }
        runner.cancel(ids[0]).await.unwrap();

        let summary = task_summary(&store, 2).await.unwrap();
        assert_eq!(summary.collection.total, 3);
        assert_eq!(summary.collection.by_status["pending"], 2);
        assert_eq!(summary.collection.by_status["cancelled"], 1);
        assert_eq!(summary.collection.by_status["failed"], 0);
        assert_eq!(summary.collection.latest.len(), 2);

        assert_eq!(summary.analysis.total, 0);
        assert_eq!(summary.analysis.by_status.len(), 5);
        assert!(summary.analysis.latest.is_empty());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["collection"]["by_status"]["pending"], 2);
    }
}
