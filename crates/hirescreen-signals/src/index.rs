//! Assembles a [`StructuredIndex`] from candidate content.

use hirescreen_core::{CandidateContent, StructuredIndex, Vocabulary};
use sha2::{Digest, Sha256};

use crate::education::parse_education_level;
use crate::experience::parse_experience_years;
use crate::industry::IndustryClassifier;
use crate::location::parse_location_city;
use crate::salary::parse_salary_range;
use crate::text::build_search_text;
use crate::tokens::{extract_companies, extract_skills};

/// Derives every structured signal for one candidate.
///
/// Builds a fresh [`IndustryClassifier`] from `vocabulary`; use
/// [`build_structured_index_with`] when indexing many candidates.
#[must_use]
pub fn build_structured_index(content: &CandidateContent, vocabulary: &Vocabulary) -> StructuredIndex {
    let classifier = IndustryClassifier::new(&vocabulary.industries);
    build_structured_index_with(content, vocabulary, &classifier)
}

/// Like [`build_structured_index`] with a pre-compiled classifier.
#[must_use]
pub fn build_structured_index_with(
    content: &CandidateContent,
    vocabulary: &Vocabulary,
    classifier: &IndustryClassifier,
) -> StructuredIndex {
    let search_text = build_search_text(content);

    let experience_years = content
        .experience
        .as_deref()
        .and_then(parse_experience_years);

    StructuredIndex {
        experience_years,
        education_level: content.education.as_deref().and_then(parse_education_level),
        location_city: content
            .location
            .as_deref()
            .and_then(|l| parse_location_city(l, &vocabulary.locations)),
        skills: extract_skills(content, &vocabulary.skills),
        companies: extract_companies(content),
        industry_tags: classifier.classify(&search_text),
        salary_range: content.expected_salary.as_deref().and_then(parse_salary_range),
        search_text,
    }
}

/// Hex SHA-256 over the canonical JSON of the content fields.
///
/// Tags and crawl timestamps are excluded so cosmetic re-crawls hash equal.
#[must_use]
pub fn content_hash(content: &CandidateContent) -> String {
    let canonical = serde_json::to_vec(content).unwrap_or_default();
    format!("{:x}", Sha256::digest(&canonical))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use hirescreen_core::{EducationLevel, SalaryRange, WorkHistoryEntry};

    use super::*;

    fn sample_content() -> CandidateContent {
        CandidateContent {
            name: Some("Wang Wu".into()),
            intention: Some("Rust 后端开发".into()),
            education: Some("本科".into()),
            location: Some("广东省-深圳市".into()),
            expected_salary: Some("15-20k".into()),
            experience: Some("5年".into()),
            work_history: vec![WorkHistoryEntry {
                company: Some("Tencent".into()),
                title: Some("Backend Engineer".into()),
                period: Some("2019-2024".into()),
                description: Some("支付系统".into()),
            }],
            ..CandidateContent::default()
        }
    }

    fn sample_vocab() -> Vocabulary {
        Vocabulary {
            skills: vec!["rust".into()],
            locations: vec![],
            industries: BTreeMap::from([
                ("fintech".to_string(), vec!["支付".to_string()]),
                ("retail".to_string(), vec!["超市".to_string()]),
            ]),
        }
    }

    #[test]
    fn builds_every_signal() {
        let index = build_structured_index(&sample_content(), &sample_vocab());
        assert_eq!(index.experience_years, Some(5));
        assert_eq!(index.education_level, Some(EducationLevel::Bachelor));
        assert_eq!(index.location_city.as_deref(), Some("深圳"));
        assert_eq!(index.skills.first().map(String::as_str), Some("rust"));
        assert_eq!(index.companies, vec!["Tencent".to_string()]);
        assert!(index.industry_tags.contains("fintech"));
        assert!(!index.industry_tags.contains("retail"));
        assert_eq!(
            index.salary_range,
            Some(SalaryRange {
                min: 15_000,
                max: 20_000
            })
        );
        assert!(index.search_text.contains("backend engineer"));
    }

    #[test]
    fn empty_content_gives_unknowns() {
        let index = build_structured_index(&CandidateContent::default(), &Vocabulary::default());
        assert_eq!(index, StructuredIndex::default());
    }

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        let a = sample_content();
        let mut b = sample_content();
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
        b.self_intro = Some("new intro".into());
        assert_ne!(content_hash(&a), content_hash(&b));
    }
}
