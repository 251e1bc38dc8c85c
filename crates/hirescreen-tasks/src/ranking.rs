//! Synchronous rule-based ranking of stored candidates. Nothing is persisted.

use hirescreen_core::{CandidateRecord, FilterOverrides, JobRequirement, MatchResult, StructuredIndex};
use hirescreen_db::{CandidateStore, JobRequirementStore};
use hirescreen_matching::{rank_candidates, resolve_for_job, MatchEngine, RankOptions, ScoringConfig};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::TaskError;
use crate::idempotency::scope_key;
use crate::indexer::CandidateIndexer;
use crate::reference::ReferenceData;

/// Page size when ranking every stored candidate.
const SCAN_PAGE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub target_locations: Vec<String>,
    /// Empty ranks every stored candidate.
    #[serde(default)]
    pub candidate_ids: Vec<Uuid>,
    #[serde(default)]
    pub min_score: Option<u32>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Loads the stored job, or builds an ad-hoc one from `keywords`.
pub(crate) async fn load_job<S: JobRequirementStore + ?Sized>(
    store: &S,
    job_id: Option<Uuid>,
    keywords: &[String],
    target_locations: &[String],
) -> Result<JobRequirement, TaskError> {
    let Some(job_id) = job_id else {
        return Ok(JobRequirement::from_keywords(
            "keyword search",
            keywords.to_vec(),
            target_locations.to_vec(),
        ));
    };
    store
        .get_job_requirement(job_id)
        .await?
        .ok_or(TaskError::JobNotFound(job_id))
}

async fn load_candidates<S: CandidateStore + ?Sized>(
    store: &S,
    ids: &[Uuid],
) -> Result<Vec<CandidateRecord>, TaskError> {
    if !ids.is_empty() {
        return Ok(store.get_candidates(ids).await?);
    }
    let mut all = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.scan_candidates(cursor, SCAN_PAGE).await?;
        let Some(last) = page.last() else {
            break;
        };
        cursor = Some(last.id);
        let full = page.len() == SCAN_PAGE;
        all.extend(page);
        if !full {
            break;
        }
    }
    Ok(all)
}

/// Scores stored candidates against a job or keyword scope and returns them
/// best first.
///
/// The request's `min_score` wins over one set by the job's filters.
///
/// # Errors
///
/// - [`TaskError::InvalidInput`] when neither a job id nor keywords are given.
/// - [`TaskError::JobNotFound`] for an unknown job id.
/// - [`TaskError::Db`] if the store fails.
pub async fn rank_stored<S>(
    store: &S,
    reference: &dyn ReferenceData,
    scoring: ScoringConfig,
    request: &RankRequest,
) -> Result<Vec<MatchResult>, TaskError>
where
    S: CandidateStore + JobRequirementStore + ?Sized,
{
    if request.job_id.is_none() && request.keywords.iter().all(|k| k.trim().is_empty()) {
        return Err(TaskError::InvalidInput(
            "either a job id or keywords are required".into(),
        ));
    }

    let job = load_job(
        store,
        request.job_id,
        &request.keywords,
        &request.target_locations,
    )
    .await?;
    let mut filters = resolve_for_job(&job, &reference.presets(), &FilterOverrides::default());
    if request.job_id.is_some() && !request.target_locations.is_empty() {
        filters.target_locations.clone_from(&request.target_locations);
    }
    let options = RankOptions {
        min_score: request.min_score.or(filters.min_score),
        top_k: request.top_k,
    };

    let vocabulary = reference.vocabulary();
    let engine = MatchEngine::new(scoring, &vocabulary);
    let indexer = CandidateIndexer::new(vocabulary);
    let scope_key = scope_key(
        request.job_id,
        &request.keywords,
        &request.target_locations,
    );
    let prepared = engine.prepare(&job, filters, scope_key);

    let candidates = load_candidates(store, &request.candidate_ids).await?;
    let indexes: Vec<(Uuid, StructuredIndex)> = candidates
        .into_iter()
        .map(|record| {
            let index = match record.structured {
                Some(ref index) if record.has_search_text() => index.clone(),
                _ => indexer.index(&record.content),
            };
            (record.id, index)
        })
        .collect();

    let ranked = rank_candidates(
        &engine,
        &prepared,
        indexes.iter().map(|(id, index)| (*id, index)),
        options,
    );
    tracing::debug!(
        candidates = indexes.len(),
        returned = ranked.len(),
        "ranked stored candidates"
    );
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::Utc;
    use hirescreen_core::CandidateContent;
    use hirescreen_db::MemoryStore;

    use super::*;
    use crate::reference::StaticReferenceData;

    async fn seed(store: &MemoryStore, id: u128, intention: &str) {
        let now = Utc::now();
        let record = CandidateRecord {
            id: Uuid::from_u128(id),
            external_id: format!("ext-{id}"),
            identity_key: format!("ext:ext-{id}"),
            content: CandidateContent {
                intention: Some(intention.into()),
                ..CandidateContent::default()
            },
            content_hash: String::new(),
            structured: None,
            tags: BTreeSet::new(),
            analyses: BTreeMap::new(),
            crawled_at: now,
            created_at: now,
            updated_at: now,
        };
        store.insert_candidate(&record).await.unwrap();
    }

    fn keywords(words: &[&str]) -> RankRequest {
        RankRequest {
            keywords: words.iter().map(|w| (*w).to_string()).collect(),
            ..RankRequest::default()
        }
    }

    #[tokio::test]
    async fn ranks_all_stored_candidates_best_first() {
        let store = MemoryStore::new();
        seed(&store, 1, "java developer").await;
        seed(&store, 2, "rust and sql developer").await;
        seed(&store, 3, "rust developer").await;

        let reference = StaticReferenceData::default();
        let ranked = rank_stored(&store, &reference, ScoringConfig::default(), &keywords(&["rust", "sql"]))
            .await
            .unwrap();

        let order: Vec<Uuid> = ranked.iter().map(|r| r.resume_id).collect();
        assert_eq!(
            order,
            vec![Uuid::from_u128(2), Uuid::from_u128(3), Uuid::from_u128(1)]
        );
        assert!(ranked.iter().all(|r| r.job_requirement_id.starts_with("kw:")));
        assert!(store
            .get_candidate(Uuid::from_u128(2))
            .await
            .unwrap()
            .unwrap()
            .analyses
            .is_empty());
    }

    #[tokio::test]
    async fn honours_candidate_subset_and_top_k() {
        let store = MemoryStore::new();
        for (id, text) in [(1, "rust"), (2, "rust sql"), (3, "sql")] {
            seed(&store, id, text).await;
        }
        let request = RankRequest {
            candidate_ids: vec![Uuid::from_u128(1), Uuid::from_u128(3)],
            top_k: Some(1),
            ..keywords(&["rust"])
        };
        let ranked = rank_stored(
            &store,
            &StaticReferenceData::default(),
            ScoringConfig::default(),
            &request,
        )
        .await
        .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].resume_id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn rejects_empty_scope_and_unknown_job() {
        let store = MemoryStore::new();
        let reference = StaticReferenceData::default();
        assert!(matches!(
            rank_stored(&store, &reference, ScoringConfig::default(), &keywords(&[" "])).await,
            Err(TaskError::InvalidInput(_))
        ));

        let unknown = RankRequest {
            job_id: Some(Uuid::from_u128(9)),
            ..RankRequest::default()
        };
        assert!(matches!(
            rank_stored(&store, &reference, ScoringConfig::default(), &unknown).await,
            Err(TaskError::JobNotFound(_))
        ));
    }
}
