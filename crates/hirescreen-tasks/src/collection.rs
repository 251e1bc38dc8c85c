//! Collection tasks: harvest candidates for a keyword, then ingest them.
//!
//! Dispatch only records the task; collection workers claim and process it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hirescreen_core::{
    CollectionKind, CollectionSummary, CollectionTask, CollectionTaskConfig, IncomingCandidate,
    TaskProgress, TaskStatus,
};
use hirescreen_db::ScreeningStore;
use hirescreen_signals::build_search_text;
use hirescreen_signals::text::normalize_text;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{HarvestError, TaskError};
use crate::idempotency::collection_idempotency_key;
use crate::indexer::CandidateIndexer;
use crate::ingest::{collapse_by_identity, ingest_collapsed, saturating_u32, DEFAULT_INGEST_CONCURRENCY};
use crate::reference::ReferenceData;
use crate::runner::{CancelOutcome, Checkpoint, EnqueueResult, TaskRunner};

/// Items ingested between checkpoints.
const INGEST_CHUNK: usize = 25;

/// Upper bound on `limit` for one collection task.
pub const MAX_COLLECTION_LIMIT: u32 = 1_000;

/// Source of harvested candidates for a collection request.
#[async_trait]
pub trait Harvester: Send + Sync {
    async fn harvest(
        &self,
        request: &CollectionTaskConfig,
    ) -> Result<Vec<IncomingCandidate>, HarvestError>;
}

// ---------------------------------------------------------------------------
// Sample-file harvester
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleSearchCriteria {
    #[serde(default)]
    keyword: String,
    #[serde(default)]
    location: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleMetadata {
    #[serde(default)]
    search_criteria: SampleSearchCriteria,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SampleFile {
    #[serde(default)]
    metadata: SampleMetadata,
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

/// Reads harvested sample files (`{"metadata": {...}, "data": [...]}`) from a
/// directory.
///
/// A file whose recorded search keyword or location differs from the request
/// is skipped. When a file records no keyword (or location), records are
/// filtered on their own text instead. Files are read in name order and the
/// result is truncated to the request's limit.
#[derive(Debug, Clone)]
pub struct SampleFileHarvester {
    dir: PathBuf,
}

impl SampleFileHarvester {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn sample_paths(&self) -> Result<Vec<PathBuf>, HarvestError> {
        let io_err = |source| HarvestError::Io {
            path: self.dir.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Parses one sample file.
///
/// # Errors
///
/// Returns [`HarvestError`] when the file cannot be read or is not a sample
/// file.
pub async fn read_sample_file(path: &Path) -> Result<Vec<IncomingCandidate>, HarvestError> {
    Ok(load_sample(path).await?.1)
}

async fn load_sample(path: &Path) -> Result<(SampleMetadata, Vec<IncomingCandidate>), HarvestError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| HarvestError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let file: SampleFile = serde_json::from_str(&text).map_err(|source| HarvestError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    let generated_at = file.metadata.generated_at;
    let records = file
        .data
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<IncomingCandidate>(value) {
            Ok(mut record) => {
                if record.crawled_at.is_none() {
                    record.crawled_at = generated_at;
                }
                Some(record)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed sample record");
                None
            }
        })
        .collect();
    Ok((file.metadata, records))
}

fn matches_criterion(recorded: &str, requested: &str) -> bool {
    let recorded = normalize_text(recorded);
    recorded.contains(requested) || requested.contains(&recorded)
}

#[async_trait]
impl Harvester for SampleFileHarvester {
    async fn harvest(
        &self,
        request: &CollectionTaskConfig,
    ) -> Result<Vec<IncomingCandidate>, HarvestError> {
        let keyword = normalize_text(&request.keyword);
        let location = request
            .location
            .as_deref()
            .map(normalize_text)
            .filter(|l| !l.is_empty());
        let limit = usize::try_from(request.limit).unwrap_or(usize::MAX);

        let mut out = Vec::new();
        for path in self.sample_paths().await? {
            let (metadata, records) = load_sample(&path).await?;
            let criteria = &metadata.search_criteria;

            if !criteria.keyword.trim().is_empty() && !matches_criterion(&criteria.keyword, &keyword) {
                continue;
            }
            if let Some(location) = &location {
                if !criteria.location.trim().is_empty() && !matches_criterion(&criteria.location, location) {
                    continue;
                }
            }

            for record in records {
                if criteria.keyword.trim().is_empty()
                    && !build_search_text(&record.content).contains(&keyword)
                {
                    continue;
                }
                if let Some(location) = &location {
                    if criteria.location.trim().is_empty()
                        && !record
                            .content
                            .location
                            .as_deref()
                            .is_some_and(|l| normalize_text(l).contains(location.as_str()))
                    {
                        continue;
                    }
                }
                out.push(record);
                if out.len() >= limit {
                    return Ok(out);
                }
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    Completed(CollectionSummary),
    /// The task left `processing` before ingest finished.
    Stopped(TaskStatus, CollectionSummary),
}

fn absorb(total: &mut CollectionSummary, part: CollectionSummary) {
    total.inserted += part.inserted;
    total.updated += part.updated;
    total.unchanged += part.unchanged;
    total.failed += part.failed;
}

pub struct CollectionService<S: ?Sized> {
    store: Arc<S>,
    runner: TaskRunner<CollectionKind, S>,
    harvester: Arc<dyn Harvester>,
    reference: Arc<dyn ReferenceData>,
    concurrency: usize,
}

impl<S> CollectionService<S>
where
    S: ScreeningStore + ?Sized + 'static,
{
    #[must_use]
    pub fn new(store: Arc<S>, harvester: Arc<dyn Harvester>, reference: Arc<dyn ReferenceData>) -> Self {
        Self {
            runner: TaskRunner::new(Arc::clone(&store)),
            store,
            harvester,
            reference,
            concurrency: DEFAULT_INGEST_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn runner(&self) -> &TaskRunner<CollectionKind, S> {
        &self.runner
    }

    /// Records a pending collection task for a worker to claim.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidInput`] for a blank keyword or a limit outside
    ///   `1..=MAX_COLLECTION_LIMIT`.
    /// - [`TaskError::Db`] if the store fails.
    pub async fn dispatch(&self, mut config: CollectionTaskConfig) -> Result<EnqueueResult, TaskError> {
        config.keyword = config.keyword.trim().to_string();
        config.location = config
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        if config.keyword.is_empty() {
            return Err(TaskError::InvalidInput("keyword is required".into()));
        }
        if config.limit == 0 || config.limit > MAX_COLLECTION_LIMIT {
            return Err(TaskError::InvalidInput(format!(
                "limit must be between 1 and {MAX_COLLECTION_LIMIT}"
            )));
        }
        let key = collection_idempotency_key(&config);
        let total = config.limit;
        self.runner.enqueue(config, total, Some(key)).await
    }

    /// # Errors
    ///
    /// See [`TaskRunner::cancel`].
    pub async fn cancel(&self, id: Uuid) -> Result<CancelOutcome, TaskError> {
        self.runner.cancel(id).await
    }

    /// Processes a task already claimed (status `processing`).
    ///
    /// A harvest failure fails the task. Ingest runs in chunks with a
    /// checkpoint after each, so cancellation stops between chunks.
    ///
    /// # Errors
    ///
    /// Returns the batch-level [`TaskError`] that failed the task.
    pub async fn process(&self, task: &CollectionTask) -> Result<CollectionOutcome, TaskError> {
        match self.run(task).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.runner.fail_best_effort(task.id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run(&self, task: &CollectionTask) -> Result<CollectionOutcome, TaskError> {
        let id = task.id;
        let batch = self.harvester.harvest(&task.config).await?;

        let received = saturating_u32(batch.len());
        let batch = collapse_by_identity(batch);
        let rejected = saturating_u32(batch.rejected);
        let mut summary = CollectionSummary {
            received,
            collapsed: saturating_u32(batch.collapsed),
            failed: rejected,
            ..CollectionSummary::default()
        };
        let mut progress = TaskProgress {
            done: summary.collapsed + rejected,
            total: received,
            skipped: summary.collapsed,
        };

        let text = format!("harvested {received} candidates");
        if let Checkpoint::Stop(status) = self.runner.checkpoint(id, progress, text).await? {
            return self.stop(id, status, progress, summary).await;
        }

        let indexer = CandidateIndexer::new(self.reference.vocabulary());
        for chunk in batch.items.chunks(INGEST_CHUNK) {
            let part = ingest_collapsed(self.store.as_ref(), &indexer, chunk, self.concurrency).await;
            absorb(&mut summary, part);
            progress.done += saturating_u32(chunk.len());

            let text = format!("ingested {}/{}", progress.done, progress.total);
            if let Checkpoint::Stop(status) = self.runner.checkpoint(id, progress, text).await? {
                return self.stop(id, status, progress, summary).await;
            }
        }

        if self.runner.complete(id, progress, summary, "completed").await? {
            tracing::info!(
                task_id = %id,
                received = summary.received,
                inserted = summary.inserted,
                updated = summary.updated,
                unchanged = summary.unchanged,
                failed = summary.failed,
                "collection task completed"
            );
            return Ok(CollectionOutcome::Completed(summary));
        }
        let current = self.runner.get(id).await?;
        self.stop(id, current.status, progress, summary).await
    }

    async fn stop(
        &self,
        id: Uuid,
        status: TaskStatus,
        progress: TaskProgress,
        summary: CollectionSummary,
    ) -> Result<CollectionOutcome, TaskError> {
        if status == TaskStatus::Cancelled {
            self.runner.record_cancelled(id, progress, summary).await?;
        }
        tracing::info!(task_id = %id, status = %status, done = progress.done, "collection task stopped early");
        Ok(CollectionOutcome::Stopped(status, summary))
    }
}

#[cfg(test)]
#[path = "collection_test.rs"]
mod tests;
