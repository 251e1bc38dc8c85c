//! Batch ranking for interactive use.

use hirescreen_core::{MatchResult, StructuredIndex};
use uuid::Uuid;

use crate::engine::{MatchEngine, PreparedJob};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankOptions {
    /// Drop results scoring below this.
    pub min_score: Option<u32>,
    /// Keep at most this many results.
    pub top_k: Option<usize>,
}

/// Scores every candidate, filters by `min_score`, sorts by score descending
/// (ties keep input order) and truncates to `top_k`.
#[must_use]
pub fn rank_candidates<'a, I>(
    engine: &MatchEngine,
    job: &PreparedJob,
    candidates: I,
    options: RankOptions,
) -> Vec<MatchResult>
where
    I: IntoIterator<Item = (Uuid, &'a StructuredIndex)>,
{
    let mut results: Vec<MatchResult> = candidates
        .into_iter()
        .map(|(id, index)| engine.score(id, index, job))
        .filter(|r| options.min_score.map_or(true, |min| r.score >= min))
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));

    if let Some(k) = options.top_k {
        results.truncate(k);
    }
    results
}
