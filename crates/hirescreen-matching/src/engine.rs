//! Weighted five-component match scoring.

use std::collections::BTreeSet;

use chrono::Utc;
use hirescreen_core::{
    JobRequirement, MatchResult, Recommendation, ScoreComponent, ScoreSource, StructuredIndex,
    Vocabulary,
};
use hirescreen_signals::text::normalize_text;
use hirescreen_signals::IndustryClassifier;
use uuid::Uuid;

use crate::filters::EffectiveFilters;
use crate::weights::{scaled, ScoringConfig};

pub const SKILL: &str = "skill";
pub const EXPERIENCE: &str = "experience";
pub const EDUCATION: &str = "education";
pub const LOCATION: &str = "location";
pub const INDUSTRY: &str = "industry";

/// A job reduced to what scoring needs, computed once per batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedJob {
    /// Written into [`MatchResult::job_requirement_id`].
    pub scope_key: String,
    /// Lower-cased, trimmed, non-empty, in original order.
    pub keywords: Vec<String>,
    pub filters: EffectiveFilters,
    /// Industry tags inferred from the job's title, text and keywords.
    pub industry_tags: BTreeSet<String>,
}

/// Scores candidates against prepared jobs. Stateless apart from its
/// configuration and compiled industry vocabulary; safe to share.
#[derive(Debug, Default)]
pub struct MatchEngine {
    config: ScoringConfig,
    classifier: IndustryClassifier,
}

impl MatchEngine {
    #[must_use]
    pub fn new(config: ScoringConfig, vocabulary: &Vocabulary) -> Self {
        Self {
            config,
            classifier: IndustryClassifier::new(&vocabulary.industries),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Prepares `job` for scoring under `scope_key` with already-resolved
    /// filters.
    #[must_use]
    pub fn prepare(
        &self,
        job: &JobRequirement,
        filters: EffectiveFilters,
        scope_key: impl Into<String>,
    ) -> PreparedJob {
        let keywords: Vec<String> = job
            .keywords()
            .iter()
            .map(|k| normalize_text(k))
            .filter(|k| !k.is_empty())
            .collect();

        let job_text = format!(
            "{} {} {}",
            job.title,
            job.requirement_text,
            keywords.join(" ")
        );

        PreparedJob {
            scope_key: scope_key.into(),
            industry_tags: self.classifier.classify(&job_text),
            keywords,
            filters,
        }
    }

    /// Scores one candidate. Deterministic apart from `scored_at`.
    #[must_use]
    pub fn score(&self, candidate_id: Uuid, index: &StructuredIndex, job: &PreparedJob) -> MatchResult {
        let (skill_points, matched_skills) = self.skill_score(index, job);
        let (industry_points, matched_companies) = self.industry_score(index, job);

        let breakdown = vec![
            ScoreComponent::new(SKILL, skill_points),
            ScoreComponent::new(EXPERIENCE, self.experience_score(index, &job.filters)),
            ScoreComponent::new(EDUCATION, self.education_score(index, &job.filters)),
            ScoreComponent::new(LOCATION, self.location_score(index, &job.filters)),
            ScoreComponent::new(INDUSTRY, industry_points),
        ];
        let score = MatchResult::breakdown_total(&breakdown);

        MatchResult {
            resume_id: candidate_id,
            job_requirement_id: job.scope_key.clone(),
            score,
            recommendation: Recommendation::from_score(score),
            breakdown,
            matched_skills,
            matched_companies,
            source: ScoreSource::Rule,
            summary: None,
            scored_at: Utc::now(),
        }
    }

    /// Fraction of job keywords present in the search text. A job with no
    /// keywords earns the full weight.
    fn skill_score(&self, index: &StructuredIndex, job: &PreparedJob) -> (u32, Vec<String>) {
        let weight = self.config.weights.skill;
        if job.keywords.is_empty() {
            return (weight, Vec::new());
        }

        let text = index.search_text.to_lowercase();
        let matched: Vec<String> = job
            .keywords
            .iter()
            .filter(|k| text.contains(k.as_str()))
            .cloned()
            .collect();
        (scaled(weight, matched.len(), job.keywords.len()), matched)
    }

    fn experience_score(&self, index: &StructuredIndex, filters: &EffectiveFilters) -> u32 {
        let weight = self.config.weights.experience;
        let penalties = &self.config.penalties;

        if filters.min_experience_years.is_none() && filters.max_experience_years.is_none() {
            return weight;
        }
        let Some(years) = index.experience_years else {
            return 0;
        };

        if let Some(min) = filters.min_experience_years {
            if years < min {
                let penalty = (min - years).saturating_mul(penalties.experience_shortfall);
                return weight.saturating_sub(penalty);
            }
        }
        if let Some(max) = filters.max_experience_years {
            if years > max {
                let penalty = (years - max).saturating_mul(penalties.experience_overage);
                return weight.saturating_sub(penalty);
            }
        }
        weight
    }

    fn education_score(&self, index: &StructuredIndex, filters: &EffectiveFilters) -> u32 {
        let weight = self.config.weights.education;
        let Some(required) = filters.min_education else {
            return weight;
        };
        let Some(actual) = index.education_level else {
            return 0;
        };
        if actual >= required {
            weight
        } else {
            let gap = required.rank() - actual.rank();
            weight.saturating_sub(gap.saturating_mul(self.config.penalties.education_gap))
        }
    }

    fn location_score(&self, index: &StructuredIndex, filters: &EffectiveFilters) -> u32 {
        let weight = self.config.weights.location;
        let targets: Vec<String> = filters
            .target_locations
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if targets.is_empty() {
            return weight;
        }

        let city = index.location_city.as_deref().unwrap_or_default().to_lowercase();
        let text = index.search_text.to_lowercase();
        let hit = targets
            .iter()
            .any(|t| city.contains(t.as_str()) || text.contains(t.as_str()));
        if hit {
            weight
        } else {
            0
        }
    }

    /// Full weight when a candidate company contains a job keyword, otherwise
    /// the share of the job's industry tags the candidate also carries.
    fn industry_score(&self, index: &StructuredIndex, job: &PreparedJob) -> (u32, Vec<String>) {
        let weight = self.config.weights.industry;

        let matched_companies: Vec<String> = index
            .companies
            .iter()
            .filter(|company| {
                let lower = company.to_lowercase();
                job.keywords.iter().any(|k| lower.contains(k.as_str()))
            })
            .cloned()
            .collect();
        if !matched_companies.is_empty() {
            return (weight, matched_companies);
        }

        if job.industry_tags.is_empty() {
            return (0, Vec::new());
        }
        let overlap = job.industry_tags.intersection(&index.industry_tags).count();
        (scaled(weight, overlap, job.industry_tags.len()), Vec::new())
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
