use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STRONG_MATCH_THRESHOLD: u32 = 90;
pub const MATCH_THRESHOLD: u32 = 70;
pub const WEAK_MATCH_THRESHOLD: u32 = 50;

/// Four-level ordinal recommendation tier. Ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    NoMatch,
    WeakMatch,
    Match,
    StrongMatch,
}

impl Recommendation {
    /// Maps a 0–100 score onto the tier ladder.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        if score >= STRONG_MATCH_THRESHOLD {
            Recommendation::StrongMatch
        } else if score >= MATCH_THRESHOLD {
            Recommendation::Match
        } else if score >= WEAK_MATCH_THRESHOLD {
            Recommendation::WeakMatch
        } else {
            Recommendation::NoMatch
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Recommendation::StrongMatch => "strong_match",
            Recommendation::Match => "match",
            Recommendation::WeakMatch => "weak_match",
            Recommendation::NoMatch => "no_match",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    /// Deterministic weighted rule model.
    Rule,
    /// External analysis collaborator.
    Ai,
    /// Synthetic result written by the keyword pre-filter.
    Prefilter,
}

/// One named, non-negative contribution to a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    pub points: u32,
}

impl ScoreComponent {
    #[must_use]
    pub fn new(name: impl Into<String>, points: u32) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Score of one candidate against one job scope.
///
/// Invariant: `score == min(sum(breakdown.points), 100)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub resume_id: Uuid,
    pub job_requirement_id: String,
    pub score: u32,
    pub recommendation: Recommendation,
    pub breakdown: Vec<ScoreComponent>,
    pub matched_skills: Vec<String>,
    pub matched_companies: Vec<String>,
    pub source: ScoreSource,
    #[serde(default)]
    pub summary: Option<String>,
    pub scored_at: DateTime<Utc>,
}

impl MatchResult {
    /// Sum of breakdown points clamped to `[0, 100]`.
    #[must_use]
    pub fn breakdown_total(breakdown: &[ScoreComponent]) -> u32 {
        breakdown
            .iter()
            .fold(0u32, |acc, c| acc.saturating_add(c.points))
            .min(100)
    }

    /// Returns `true` when `score` agrees with the breakdown.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.score == Self::breakdown_total(&self.breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ladder_boundaries() {
        assert_eq!(Recommendation::from_score(100), Recommendation::StrongMatch);
        assert_eq!(Recommendation::from_score(90), Recommendation::StrongMatch);
        assert_eq!(Recommendation::from_score(89), Recommendation::Match);
        assert_eq!(Recommendation::from_score(70), Recommendation::Match);
        assert_eq!(Recommendation::from_score(69), Recommendation::WeakMatch);
        assert_eq!(Recommendation::from_score(50), Recommendation::WeakMatch);
        assert_eq!(Recommendation::from_score(49), Recommendation::NoMatch);
        assert_eq!(Recommendation::from_score(0), Recommendation::NoMatch);
    }

    #[test]
    fn recommendation_serializes_snake_case() {
        let json = serde_json::to_string(&Recommendation::StrongMatch).unwrap();
        assert_eq!(json, "\"strong_match\"");
    }

    #[test]
    fn breakdown_total_clamps_at_100() {
        let parts = vec![ScoreComponent::new("a", 80), ScoreComponent::new("b", 40)];
        assert_eq!(MatchResult::breakdown_total(&parts), 100);
        assert_eq!(MatchResult::breakdown_total(&[]), 0);
    }
}
