//! Analysis tasks: score an explicit candidate set against a stored job or
//! an ad-hoc keyword scope.
//!
//! Dispatch records the task and schedules one executor run. The executor
//! pre-filters cheaply, then scores survivors one at a time, checkpointing
//! after each so a cancellation is observed before the next item.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::FutureExt;
use hirescreen_core::{
    AnalysisKind, AnalysisSummary, AnalysisTaskConfig, CandidateRecord, FilterOverrides,
    MatchResult, StructuredIndex, TaskProgress, TaskStatus,
};
use hirescreen_db::ScreeningStore;
use hirescreen_matching::{
    keyword_containment_ratio, prefilter_result, resolve_for_job, MatchEngine, ScoringConfig,
    DEFAULT_SKIP_THRESHOLD,
};
use uuid::Uuid;

use crate::collaborator::AnalysisCollaborator;
use crate::error::TaskError;
use crate::idempotency::{analysis_idempotency_key, analysis_scope_key};
use crate::indexer::CandidateIndexer;
use crate::ranking::load_job;
use crate::reference::ReferenceData;
use crate::runner::{CancelOutcome, Checkpoint, EnqueueResult, TaskRunner};
use crate::scheduler::Scheduler;

/// Scores at or above this count towards `high_score_count`.
pub const HIGH_SCORE_THRESHOLD: u32 = hirescreen_core::matches::MATCH_THRESHOLD;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Completed(AnalysisSummary),
    /// Stopped at a checkpoint because the task left `processing` (cancelled,
    /// or failed elsewhere); the summary covers the work done so far.
    Stopped(TaskStatus, AnalysisSummary),
    /// The task was no longer pending when the executor picked it up.
    NotStarted,
}

/// Running totals for one execution.
#[derive(Debug, Default)]
struct Tally {
    total: u32,
    skipped: u32,
    failed: u32,
    scores: Vec<u32>,
}

impl Tally {
    fn done(&self) -> u32 {
        self.skipped + self.failed + u32::try_from(self.scores.len()).unwrap_or(u32::MAX)
    }

    fn progress(&self) -> TaskProgress {
        TaskProgress {
            done: self.done(),
            total: self.total,
            skipped: self.skipped,
        }
    }

    fn summary(&self) -> AnalysisSummary {
        let analyzed = u32::try_from(self.scores.len()).unwrap_or(u32::MAX);
        let average_score = (!self.scores.is_empty()).then(|| {
            let sum: u64 = self.scores.iter().map(|s| u64::from(*s)).sum();
            #[allow(clippy::cast_precision_loss)]
            let avg = sum as f64 / self.scores.len() as f64;
            (avg * 100.0).round() / 100.0
        });
        AnalysisSummary {
            analyzed,
            skipped: self.skipped,
            failed: self.failed,
            average_score,
            high_score_count: u32::try_from(
                self.scores
                    .iter()
                    .filter(|s| **s >= HIGH_SCORE_THRESHOLD)
                    .count(),
            )
            .unwrap_or(u32::MAX),
        }
    }
}

/// Candidate ids with duplicates removed, first occurrence kept.
fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub struct AnalysisService<S: ?Sized> {
    store: Arc<S>,
    runner: TaskRunner<AnalysisKind, S>,
    reference: Arc<dyn ReferenceData>,
    scheduler: Arc<dyn Scheduler>,
    collaborator: Option<Arc<dyn AnalysisCollaborator>>,
    scoring: ScoringConfig,
    default_filters: FilterOverrides,
    skip_threshold: f64,
}

impl<S> AnalysisService<S>
where
    S: ScreeningStore + ?Sized + 'static,
{
    #[must_use]
    pub fn new(
        store: Arc<S>,
        reference: Arc<dyn ReferenceData>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            runner: TaskRunner::new(Arc::clone(&store)),
            store,
            reference,
            scheduler,
            collaborator: None,
            scoring: ScoringConfig::default(),
            default_filters: FilterOverrides::default(),
            skip_threshold: DEFAULT_SKIP_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_collaborator(mut self, collaborator: Option<Arc<dyn AnalysisCollaborator>>) -> Self {
        self.collaborator = collaborator;
        self
    }

    #[must_use]
    pub fn with_skip_threshold(mut self, threshold: f64) -> Self {
        self.skip_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    #[must_use]
    pub fn with_default_filters(mut self, filters: FilterOverrides) -> Self {
        self.default_filters = filters;
        self
    }

    #[must_use]
    pub fn runner(&self) -> &TaskRunner<AnalysisKind, S> {
        &self.runner
    }

    /// Records an analysis task and schedules its execution. Returns the
    /// task id before any work starts. An identical live task is returned
    /// instead of creating a second one.
    ///
    /// # Errors
    ///
    /// - [`TaskError::InvalidInput`] if there are no candidates, or neither a
    ///   job id nor keywords.
    /// - [`TaskError::Db`] if the store fails.
    pub async fn dispatch(
        self: &Arc<Self>,
        mut config: AnalysisTaskConfig,
    ) -> Result<EnqueueResult, TaskError> {
        config.candidate_ids = unique_ids(&config.candidate_ids);
        if config.candidate_ids.is_empty() {
            return Err(TaskError::InvalidInput(
                "at least one candidate id is required".into(),
            ));
        }
        if config.job_id.is_none() && config.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(TaskError::InvalidInput(
                "either a job id or keywords are required".into(),
            ));
        }

        let total = u32::try_from(config.candidate_ids.len())
            .map_err(|_| TaskError::InvalidInput("too many candidates".into()))?;
        let key = analysis_idempotency_key(&config);
        let result = self.runner.enqueue(config, total, Some(key)).await?;

        match result {
            EnqueueResult::Created(id) => {
                let this = Arc::clone(self);
                self.scheduler.run_soon(
                    "analysis",
                    async move {
                        if let Err(e) = this.execute(id).await {
                            tracing::error!(task_id = %id, error = %e, "analysis task errored");
                        }
                    }
                    .boxed(),
                );
            }
            EnqueueResult::Duplicate(id) => {
                tracing::info!(task_id = %id, "analysis already in flight; reusing task");
            }
        }
        Ok(result)
    }

    /// Requests cancellation of an analysis task.
    ///
    /// # Errors
    ///
    /// See [`TaskRunner::cancel`].
    pub async fn cancel(&self, id: Uuid) -> Result<CancelOutcome, TaskError> {
        self.runner.cancel(id).await
    }

    /// Runs a pending analysis task to completion, cancellation or failure.
    ///
    /// Batch-level errors (missing credential, unknown job, store failure)
    /// mark the task failed and are returned.
    ///
    /// # Errors
    ///
    /// Returns the batch-level [`TaskError`] that failed the task.
    pub async fn execute(&self, id: Uuid) -> Result<AnalysisOutcome, TaskError> {
        if !self.runner.start(id, "analyzing").await? {
            tracing::info!(task_id = %id, "analysis task no longer pending; not starting");
            return Ok(AnalysisOutcome::NotStarted);
        }

        match self.run(id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.runner.fail_best_effort(id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run(&self, id: Uuid) -> Result<AnalysisOutcome, TaskError> {
        let task = self.runner.get(id).await?;
        let config = task.config;

        let collaborator = match (config.use_ai, &self.collaborator) {
            (true, None) => return Err(TaskError::MissingApiKey),
            (true, Some(c)) => Some(Arc::clone(c)),
            (false, _) => None,
        };

        let scope_key = analysis_scope_key(&config);
        let job = load_job(
            self.store.as_ref(),
            config.job_id,
            &config.keywords,
            &config.target_locations,
        )
        .await?;

        let vocabulary = self.reference.vocabulary();
        let presets = self.reference.presets();
        let mut filters = resolve_for_job(&job, &presets, &self.default_filters);
        if config.job_id.is_some() && !config.target_locations.is_empty() {
            filters.target_locations.clone_from(&config.target_locations);
        }
        let engine = MatchEngine::new(self.scoring, &vocabulary);
        let indexer = CandidateIndexer::new(vocabulary);
        let prepared = engine.prepare(&job, filters, scope_key.clone());

        let ids = unique_ids(&config.candidate_ids);
        let mut by_id: HashMap<Uuid, CandidateRecord> = self
            .store
            .get_candidates(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut tally = Tally {
            total: u32::try_from(ids.len()).unwrap_or(u32::MAX),
            ..Tally::default()
        };

        // Pre-filter pass: cheap, bounded, before any per-item scoring.
        let mut survivors: Vec<(CandidateRecord, StructuredIndex)> = Vec::new();
        for candidate_id in &ids {
            let Some(record) = by_id.remove(candidate_id) else {
                tracing::warn!(task_id = %id, candidate_id = %candidate_id, "candidate not found");
                tally.failed += 1;
                continue;
            };
            let index = match &record.structured {
                Some(index) if record.has_search_text() => index.clone(),
                _ => indexer.index(&record.content),
            };

            let ratio = keyword_containment_ratio(&prepared.keywords, &index.search_text);
            if ratio < self.skip_threshold {
                let result = prefilter_result(record.id, &scope_key, ratio);
                match self.store.put_analysis(record.id, &result).await {
                    Ok(()) => tally.skipped += 1,
                    Err(e) => {
                        tracing::warn!(task_id = %id, candidate_id = %record.id, error = %e, "failed to store pre-filter result");
                        tally.failed += 1;
                    }
                }
            } else {
                survivors.push((record, index));
            }
        }

        let text = format!("pre-filter skipped {} of {}", tally.skipped, tally.total);
        if let Checkpoint::Stop(status) = self.runner.checkpoint(id, tally.progress(), text).await? {
            return self.stop(id, status, &tally).await;
        }

        for (record, index) in survivors {
            let scored = match &collaborator {
                Some(c) => c.analyze(&job, &record, &scope_key).await.map_err(TaskError::from),
                None => Ok(engine.score(record.id, &index, &prepared)),
            };
            self.record_item(id, record.id, scored, &mut tally).await;

            let text = format!("analyzed {}/{}", tally.done(), tally.total);
            if let Checkpoint::Stop(status) = self.runner.checkpoint(id, tally.progress(), text).await? {
                return self.stop(id, status, &tally).await;
            }
        }

        let summary = tally.summary();
        if self
            .runner
            .complete(id, tally.progress(), summary.clone(), "completed")
            .await?
        {
            tracing::info!(
                task_id = %id,
                analyzed = summary.analyzed,
                skipped = summary.skipped,
                failed = summary.failed,
                "analysis task completed"
            );
            return Ok(AnalysisOutcome::Completed(summary));
        }

        // Cancelled between the last checkpoint and completion.
        let current = self.runner.get(id).await?;
        self.stop(id, current.status, &tally).await
    }

    async fn record_item(
        &self,
        task_id: Uuid,
        candidate_id: Uuid,
        scored: Result<MatchResult, TaskError>,
        tally: &mut Tally,
    ) {
        let stored = match scored {
            Ok(result) => self
                .store
                .put_analysis(candidate_id, &result)
                .await
                .map(|()| result.score)
                .map_err(TaskError::from),
            Err(e) => Err(e),
        };
        match stored {
            Ok(score) => tally.scores.push(score),
            Err(e) => {
                tracing::warn!(task_id = %task_id, candidate_id = %candidate_id, error = %e, "candidate analysis failed");
                tally.failed += 1;
            }
        }
    }

    async fn stop(
        &self,
        id: Uuid,
        status: TaskStatus,
        tally: &Tally,
    ) -> Result<AnalysisOutcome, TaskError> {
        let summary = tally.summary();
        if status == TaskStatus::Cancelled {
            self.runner
                .record_cancelled(id, tally.progress(), summary.clone())
                .await?;
        }
        tracing::info!(task_id = %id, status = %status, done = tally.done(), "analysis task stopped early");
        Ok(AnalysisOutcome::Stopped(status, summary))
    }
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
