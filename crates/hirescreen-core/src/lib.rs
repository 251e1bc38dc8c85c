//! Shared domain types and configuration for hirescreen.

pub mod app_config;
pub mod candidates;
pub mod config;
pub mod jobs;
pub mod matches;
pub mod tasks;
pub mod vocabulary;
pub mod workers;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use candidates::{
    CandidateContent, CandidateRecord, EducationLevel, IncomingCandidate, SalaryRange,
    StructuredIndex, WorkHistoryEntry,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{
    load_filter_presets, load_filter_presets_or_default, AutoMatchConfig, FilterOverrides,
    JobRequirement, PresetsFile,
};
pub use matches::{MatchResult, Recommendation, ScoreComponent, ScoreSource};
pub use tasks::{
    AnalysisKind, AnalysisSummary, AnalysisTask, AnalysisTaskConfig, CollectionKind,
    CollectionSummary, CollectionTask, CollectionTaskConfig, TaskKind, TaskOf, TaskProgress,
    TaskRecord, TaskStatus,
};
pub use vocabulary::{Vocabulary, VocabularySource};
pub use workers::{WorkerHeartbeat, WorkerState};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read {path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    FileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
