//! Task orchestration for hirescreen: analysis and collection tasks, the
//! collaborator adapter, ingest dedup, collection workers and maintenance
//! sweeps.

pub mod analysis;
pub mod collaborator;
pub mod collection;
pub mod error;
pub mod health;
pub mod idempotency;
pub mod indexer;
pub mod ingest;
pub mod maintenance;
pub mod ranking;
pub mod reference;
pub mod response;
pub(crate) mod retry;
pub mod runner;
pub mod scheduler;
pub mod summary;
pub mod worker;

pub use analysis::{AnalysisOutcome, AnalysisService, HIGH_SCORE_THRESHOLD};
pub use collaborator::{build_prompt, AnalysisCollaborator, ChatCompletionsCollaborator};
pub use collection::{
    read_sample_file, CollectionOutcome, CollectionService, Harvester, SampleFileHarvester,
    MAX_COLLECTION_LIMIT,
};
pub use error::{CollaboratorError, HarvestError, TaskError};
pub use health::{reconcile_stale_tasks, worker_health, ReconcileReport, WorkerHealth};
pub use indexer::CandidateIndexer;
pub use ingest::{ingest_batch, IngestOutcome, DEFAULT_INGEST_CONCURRENCY, MAX_INGEST_CONCURRENCY};
pub use maintenance::{merge_duplicates, MergeReport, MergedGroup};
pub use ranking::{rank_stored, RankRequest};
pub use reference::{FileReferenceData, ReferenceData, StaticReferenceData};
pub use response::parse_analysis_response;
pub use runner::{CancelOutcome, Checkpoint, EnqueueResult, TaskRunner};
pub use scheduler::{Scheduler, TokioScheduler};
pub use summary::{task_summary, FamilySummary, TaskSummary};
pub use worker::{CollectionWorker, WorkerConfig};
