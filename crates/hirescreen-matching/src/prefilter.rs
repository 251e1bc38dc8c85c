//! Cheap keyword containment gate run before expensive analysis.

use chrono::Utc;
use hirescreen_core::{MatchResult, Recommendation, ScoreComponent, ScoreSource};
use uuid::Uuid;

/// Candidates whose containment ratio falls below this are skipped.
pub const DEFAULT_SKIP_THRESHOLD: f64 = 0.2;

/// Share of `keywords` contained in `search_text`, in `[0, 1]`.
///
/// Matching is case-insensitive. No keywords means nothing to gate on, so the
/// ratio is `1.0`.
#[must_use]
pub fn keyword_containment_ratio(keywords: &[String], search_text: &str) -> f64 {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return 1.0;
    }

    let text = search_text.to_lowercase();
    let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
    ratio(hits, keywords.len())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(hits: usize, total: usize) -> f64 {
    hits as f64 / total as f64
}

/// Synthetic lowest-tier result recorded for a skipped candidate.
#[must_use]
pub fn prefilter_result(candidate_id: Uuid, scope_key: &str, ratio: f64) -> MatchResult {
    let score = ratio_to_score(ratio);
    MatchResult {
        resume_id: candidate_id,
        job_requirement_id: scope_key.to_string(),
        score,
        recommendation: Recommendation::NoMatch,
        breakdown: vec![ScoreComponent::new("keyword_prefilter", score)],
        matched_skills: Vec::new(),
        matched_companies: Vec::new(),
        source: ScoreSource::Prefilter,
        summary: Some("skipped by keyword pre-filter".to_string()),
        scored_at: Utc::now(),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ratio_to_score(ratio: f64) -> u32 {
    if ratio.is_finite() {
        (ratio.clamp(0.0, 1.0) * 100.0).round() as u32
    } else {
        0
    }
}
