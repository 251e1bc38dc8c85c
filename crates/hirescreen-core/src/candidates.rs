use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matches::MatchResult;

/// One entry of a candidate's work history, as scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkHistoryEntry {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default, alias = "position")]
    pub title: Option<String>,
    #[serde(default, alias = "duration")]
    pub period: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Free-text content fields of a scraped candidate profile.
///
/// Every field is optional because crawlers routinely return partial cards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateContent {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "profile_url", alias = "url")]
    pub profile_url: Option<String>,
    #[serde(default, alias = "resume_id")]
    pub resume_id: Option<String>,
    #[serde(default, alias = "platform_user_id", alias = "userId")]
    pub platform_user_id: Option<String>,
    #[serde(default, alias = "jobIntention")]
    pub intention: Option<String>,
    #[serde(default, alias = "self_intro", alias = "summary")]
    pub self_intro: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
    #[serde(default, alias = "city")]
    pub location: Option<String>,
    #[serde(default, alias = "expected_salary", alias = "salary")]
    pub expected_salary: Option<String>,
    #[serde(default, alias = "workYears", alias = "work_years")]
    pub experience: Option<String>,
    #[serde(default, alias = "work_history", alias = "workExperience")]
    pub work_history: Vec<WorkHistoryEntry>,
}

/// A candidate as delivered by a harvester, before identity resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCandidate {
    #[serde(alias = "external_id", alias = "id")]
    pub external_id: String,
    #[serde(flatten)]
    pub content: CandidateContent,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "crawled_at")]
    pub crawled_at: Option<DateTime<Utc>>,
}

/// Five-level ordinal education scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Phd,
}

impl EducationLevel {
    /// Zero-based rank on the ordinal scale.
    #[must_use]
    pub fn rank(self) -> u32 {
        match self {
            EducationLevel::HighSchool => 0,
            EducationLevel::Associate => 1,
            EducationLevel::Bachelor => 2,
            EducationLevel::Master => 3,
            EducationLevel::Phd => 4,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::HighSchool => "high_school",
            EducationLevel::Associate => "associate",
            EducationLevel::Bachelor => "bachelor",
            EducationLevel::Master => "master",
            EducationLevel::Phd => "phd",
        }
    }
}

impl std::fmt::Display for EducationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EducationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high_school" => Ok(EducationLevel::HighSchool),
            "associate" => Ok(EducationLevel::Associate),
            "bachelor" => Ok(EducationLevel::Bachelor),
            "master" => Ok(EducationLevel::Master),
            "phd" => Ok(EducationLevel::Phd),
            other => Err(format!("unknown education level '{other}'")),
        }
    }
}

/// Monthly salary expectation in currency units. `min == max` for single values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
}

/// Typed signals derived from a candidate's free text.
///
/// `None` means the signal could not be determined, which is distinct from
/// a zero value (e.g. zero years of experience).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredIndex {
    pub experience_years: Option<u32>,
    pub education_level: Option<EducationLevel>,
    pub location_city: Option<String>,
    pub skills: Vec<String>,
    pub companies: Vec<String>,
    pub industry_tags: BTreeSet<String>,
    pub salary_range: Option<SalaryRange>,
    pub search_text: String,
}

/// A stored candidate profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Uuid,
    pub external_id: String,
    pub identity_key: String,
    pub content: CandidateContent,
    pub content_hash: String,
    pub structured: Option<StructuredIndex>,
    pub tags: BTreeSet<String>,
    /// Analysis results keyed by job scope (a job id or a keyword-scope key).
    pub analyses: BTreeMap<String, MatchResult>,
    pub crawled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Returns `true` when the derived search text is present and non-empty.
    #[must_use]
    pub fn has_search_text(&self) -> bool {
        self.structured
            .as_ref()
            .is_some_and(|s| !s.search_text.trim().is_empty())
    }

    /// The derived search text, or an empty string when it was never built.
    #[must_use]
    pub fn search_text(&self) -> &str {
        self.structured
            .as_ref()
            .map_or("", |s| s.search_text.as_str())
    }
}
