use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared task lifecycle. `Pending` is the only initial state; the last three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "processing" => Ok(TaskStatus::Processing),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub done: u32,
    pub total: u32,
    pub skipped: u32,
}

/// A task family: its stable name and the payload types stored alongside the
/// shared lifecycle columns.
pub trait TaskKind: Send + Sync + 'static {
    /// Persisted discriminator, e.g. `"analysis"`.
    const NAME: &'static str;
    type Config: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
    type Summary: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static;
}

/// Marker for analysis tasks.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisKind;

/// Marker for collection (harvest + ingest) tasks.
#[derive(Debug, Clone, Copy)]
pub struct CollectionKind;

impl TaskKind for AnalysisKind {
    const NAME: &'static str = "analysis";
    type Config = AnalysisTaskConfig;
    type Summary = AnalysisSummary;
}

impl TaskKind for CollectionKind {
    const NAME: &'static str = "collection";
    type Config = CollectionTaskConfig;
    type Summary = CollectionSummary;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord<C, S> {
    pub id: Uuid,
    pub config: C,
    pub status: TaskStatus,
    pub progress: TaskProgress,
    pub last_status: Option<String>,
    pub idempotency_key: Option<String>,
    pub worker_id: Option<String>,
    pub error_message: Option<String>,
    pub summary: Option<S>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl<C, S> TaskRecord<C, S> {
    /// A fresh pending record with the given unit count.
    #[must_use]
    pub fn pending(config: C, total: u32, idempotency_key: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            config,
            status: TaskStatus::Pending,
            progress: TaskProgress {
                done: 0,
                total,
                skipped: 0,
            },
            last_status: Some("queued".to_string()),
            idempotency_key,
            worker_id: None,
            error_message: None,
            summary: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }
}

/// The stored record type for task family `K`.
pub type TaskOf<K> = TaskRecord<<K as TaskKind>::Config, <K as TaskKind>::Summary>;

pub type AnalysisTask = TaskRecord<AnalysisTaskConfig, AnalysisSummary>;
pub type CollectionTask = TaskRecord<CollectionTaskConfig, CollectionSummary>;

/// What an analysis task scores: a stored job or an ad-hoc keyword scope,
/// over an explicit candidate set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTaskConfig {
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub target_locations: Vec<String>,
    pub candidate_ids: Vec<Uuid>,
    /// Route surviving candidates to the external collaborator instead of the
    /// rule model.
    #[serde(default)]
    pub use_ai: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub analyzed: u32,
    pub skipped: u32,
    pub failed: u32,
    pub average_score: Option<f64>,
    pub high_score_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTaskConfig {
    pub keyword: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_collection_limit")]
    pub limit: u32,
}

fn default_collection_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Records delivered by the harvester.
    pub received: u32,
    /// Records dropped by in-batch identity collapse.
    pub collapsed: u32,
    pub inserted: u32,
    pub updated: u32,
    pub unchanged: u32,
    pub failed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_final_states_are_terminal() {
        let terminal: Vec<_> = TaskStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .copied()
            .collect();
        assert_eq!(
            terminal,
            vec![
                TaskStatus::Completed,
                TaskStatus::Failed,
                TaskStatus::Cancelled
            ]
        );
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in TaskStatus::ALL {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("running".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn pending_record_starts_queued() {
        let task: CollectionTask = TaskRecord::pending(
            CollectionTaskConfig {
                keyword: "sales".into(),
                location: None,
                limit: 10,
            },
            10,
            None,
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.progress.total, 10);
        assert!(task.started_at.is_none());
        assert_eq!(task.last_status.as_deref(), Some("queued"));
    }

    #[test]
    fn collection_limit_defaults_when_absent() {
        let cfg: CollectionTaskConfig = serde_json::from_str(r#"{"keyword":"rust"}"#).unwrap();
        assert_eq!(cfg.limit, 100);
        assert!(cfg.location.is_none());
    }

    #[test]
    fn kind_names_are_distinct() {
        assert_ne!(AnalysisKind::NAME, CollectionKind::NAME);
    }
}
