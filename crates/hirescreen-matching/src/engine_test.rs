use std::collections::BTreeMap;

use hirescreen_core::{AutoMatchConfig, EducationLevel};

use super::*;

fn job(keywords: &[&str]) -> JobRequirement {
    JobRequirement {
        id: Uuid::nil(),
        title: "Sales Manager".into(),
        requirement_text: String::new(),
        auto_match: Some(AutoMatchConfig {
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            ..AutoMatchConfig::default()
        }),
    }
}

fn index(search_text: &str) -> StructuredIndex {
    StructuredIndex {
        search_text: search_text.to_string(),
        ..StructuredIndex::default()
    }
}

fn points(result: &MatchResult, name: &str) -> u32 {
    result
        .breakdown
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.points)
        .unwrap_or_default()
}

fn engine() -> MatchEngine {
    MatchEngine::new(ScoringConfig::default(), &Vocabulary::default())
}

// -----------------------------------------------------------------------
// Whole-score behaviour
// -----------------------------------------------------------------------

#[test]
fn documented_example_scores_75() {
    let engine = engine();
    let filters = EffectiveFilters {
        min_experience_years: Some(3),
        max_experience_years: Some(8),
        min_education: Some(EducationLevel::Bachelor),
        target_locations: vec!["上海".into()],
        min_score: None,
    };
    let prepared = engine.prepare(&job(&["销售", "客户管理", "python"]), filters, "job-1");
    let candidate = StructuredIndex {
        experience_years: Some(5),
        education_level: Some(EducationLevel::Master),
        location_city: Some("上海".into()),
        companies: vec!["某某贸易".into()],
        search_text: "销售 客户管理 上海 某某贸易".into(),
        ..StructuredIndex::default()
    };

    let result = engine.score(Uuid::nil(), &candidate, &prepared);
    assert_eq!(points(&result, SKILL), 20);
    assert_eq!(points(&result, EXPERIENCE), 25);
    assert_eq!(points(&result, EDUCATION), 15);
    assert_eq!(points(&result, LOCATION), 15);
    assert_eq!(points(&result, INDUSTRY), 0);
    assert_eq!(result.score, 75);
    assert_eq!(result.recommendation, Recommendation::Match);
    assert_eq!(result.matched_skills, vec!["销售".to_string(), "客户管理".to_string()]);
    assert_eq!(result.job_requirement_id, "job-1");
    assert_eq!(result.source, ScoreSource::Rule);
    assert!(result.is_consistent());
}

#[test]
fn score_stays_in_range_and_matches_breakdown() {
    let engine = engine();
    let filter_sets = [
        EffectiveFilters::default(),
        EffectiveFilters {
            min_experience_years: Some(10),
            max_experience_years: Some(2),
            min_education: Some(EducationLevel::Phd),
            target_locations: vec!["nowhere".into()],
            min_score: None,
        },
    ];
    let candidates = [
        StructuredIndex::default(),
        StructuredIndex {
            experience_years: Some(40),
            education_level: Some(EducationLevel::HighSchool),
            companies: vec!["rust co".into()],
            search_text: "rust go".into(),
            ..StructuredIndex::default()
        },
    ];
    for filters in &filter_sets {
        let prepared = engine.prepare(&job(&["rust", "go"]), filters.clone(), "s");
        for candidate in &candidates {
            let result = engine.score(Uuid::nil(), candidate, &prepared);
            assert!(result.score <= 100);
            assert!(result.is_consistent());
        }
    }
}

#[test]
fn empty_job_and_empty_candidate_gets_full_score() {
    let engine = engine();
    let prepared = engine.prepare(&job(&[]), EffectiveFilters::default(), "s");
    let result = engine.score(Uuid::nil(), &StructuredIndex::default(), &prepared);
    // No keywords, bounds, education or locations: only industry earns nothing.
    assert_eq!(result.score, 85);
}

// -----------------------------------------------------------------------
// Skill
// -----------------------------------------------------------------------

#[test]
fn skill_score_is_monotonic_in_overlap() {
    let engine = engine();
    let prepared = engine.prepare(&job(&["a1", "b2", "c3", "d4"]), EffectiveFilters::default(), "s");
    let texts = ["", "a1", "a1 b2", "a1 b2 c3", "a1 b2 c3 d4"];
    let mut last = 0;
    for text in texts {
        let p = points(&engine.score(Uuid::nil(), &index(text), &prepared), SKILL);
        assert!(p >= last, "{text:?} scored {p} < {last}");
        last = p;
    }
    assert_eq!(last, 30);
}

#[test]
fn keywords_match_case_insensitively() {
    let engine = engine();
    let prepared = engine.prepare(&job(&["Rust"]), EffectiveFilters::default(), "s");
    let result = engine.score(Uuid::nil(), &index("senior rust developer"), &prepared);
    assert_eq!(points(&result, SKILL), 30);
}

// -----------------------------------------------------------------------
// Experience
// -----------------------------------------------------------------------

fn experience_points(years: Option<u32>, min: Option<u32>, max: Option<u32>) -> u32 {
    let engine = engine();
    let filters = EffectiveFilters {
        min_experience_years: min,
        max_experience_years: max,
        ..EffectiveFilters::default()
    };
    let prepared = engine.prepare(&job(&[]), filters, "s");
    let candidate = StructuredIndex {
        experience_years: years,
        ..StructuredIndex::default()
    };
    points(&engine.score(Uuid::nil(), &candidate, &prepared), EXPERIENCE)
}

#[test]
fn experience_within_band_is_full() {
    assert_eq!(experience_points(Some(3), Some(3), Some(5)), 25);
    assert_eq!(experience_points(Some(5), Some(3), Some(5)), 25);
}

#[test]
fn experience_shortfall_strictly_decreases_to_zero() {
    assert_eq!(experience_points(Some(4), Some(5), None), 17);
    assert_eq!(experience_points(Some(3), Some(5), None), 9);
    assert_eq!(experience_points(Some(2), Some(5), None), 1);
    assert_eq!(experience_points(Some(1), Some(5), None), 0);
}

#[test]
fn experience_overage_is_gentler() {
    assert_eq!(experience_points(Some(6), None, Some(5)), 22);
    assert_eq!(experience_points(Some(10), None, Some(5)), 10);
    assert_eq!(experience_points(Some(30), None, Some(5)), 0);
}

#[test]
fn unknown_experience_depends_on_bounds() {
    assert_eq!(experience_points(None, None, None), 25);
    assert_eq!(experience_points(None, Some(1), None), 0);
    assert_eq!(experience_points(None, None, Some(10)), 0);
}

// -----------------------------------------------------------------------
// Education
// -----------------------------------------------------------------------

fn education_points(actual: Option<EducationLevel>, required: Option<EducationLevel>) -> u32 {
    let engine = engine();
    let filters = EffectiveFilters {
        min_education: required,
        ..EffectiveFilters::default()
    };
    let prepared = engine.prepare(&job(&[]), filters, "s");
    let candidate = StructuredIndex {
        education_level: actual,
        ..StructuredIndex::default()
    };
    points(&engine.score(Uuid::nil(), &candidate, &prepared), EDUCATION)
}

#[test]
fn education_rules() {
    use EducationLevel::{Associate, Bachelor, HighSchool, Master};
    assert_eq!(education_points(None, None), 15);
    assert_eq!(education_points(None, Some(Bachelor)), 0);
    assert_eq!(education_points(Some(Master), Some(Bachelor)), 15);
    assert_eq!(education_points(Some(Bachelor), Some(Bachelor)), 15);
    assert_eq!(education_points(Some(Associate), Some(Bachelor)), 10);
    assert_eq!(education_points(Some(HighSchool), Some(Bachelor)), 5);
    assert_eq!(education_points(Some(HighSchool), Some(Master)), 0);
}

// -----------------------------------------------------------------------
// Location
// -----------------------------------------------------------------------

#[test]
fn location_is_binary() {
    let engine = engine();
    let filters = EffectiveFilters {
        target_locations: vec!["杭州".into(), "Shanghai".into()],
        ..EffectiveFilters::default()
    };
    let prepared = engine.prepare(&job(&[]), filters, "s");

    let in_city = StructuredIndex {
        location_city: Some("shanghai".into()),
        ..StructuredIndex::default()
    };
    let in_text = index("期望 杭州 滨江");
    let elsewhere = StructuredIndex {
        location_city: Some("北京".into()),
        search_text: "北京".into(),
        ..StructuredIndex::default()
    };

    assert_eq!(points(&engine.score(Uuid::nil(), &in_city, &prepared), LOCATION), 15);
    assert_eq!(points(&engine.score(Uuid::nil(), &in_text, &prepared), LOCATION), 15);
    assert_eq!(points(&engine.score(Uuid::nil(), &elsewhere, &prepared), LOCATION), 0);
}

// -----------------------------------------------------------------------
// Industry
// -----------------------------------------------------------------------

#[test]
fn company_keyword_hit_earns_full_industry_weight() {
    let engine = engine();
    let prepared = engine.prepare(&job(&["bank"]), EffectiveFilters::default(), "s");
    let candidate = StructuredIndex {
        companies: vec!["China Merchants Bank".into()],
        ..StructuredIndex::default()
    };
    let result = engine.score(Uuid::nil(), &candidate, &prepared);
    assert_eq!(points(&result, INDUSTRY), 15);
    assert_eq!(result.matched_companies, vec!["China Merchants Bank".to_string()]);
}

#[test]
fn industry_tag_overlap_scales_weight() {
    let vocab = Vocabulary {
        industries: BTreeMap::from([
            ("fintech".to_string(), vec!["支付".to_string()]),
            ("ecommerce".to_string(), vec!["电商".to_string()]),
        ]),
        ..Vocabulary::default()
    };
    let engine = MatchEngine::new(ScoringConfig::default(), &vocab);
    let mut job = job(&[]);
    job.requirement_text = "支付 电商 平台".into();
    let prepared = engine.prepare(&job, EffectiveFilters::default(), "s");
    assert_eq!(prepared.industry_tags.len(), 2);

    let half = StructuredIndex {
        industry_tags: BTreeSet::from(["fintech".to_string()]),
        ..StructuredIndex::default()
    };
    let none = StructuredIndex::default();
    assert_eq!(points(&engine.score(Uuid::nil(), &half, &prepared), INDUSTRY), 8);
    assert_eq!(points(&engine.score(Uuid::nil(), &none, &prepared), INDUSTRY), 0);
}
