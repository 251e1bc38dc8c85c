//! Duplicate-merge planning over stored candidate records.
//!
//! Planning is pure; applying a [`MergePlan`] (patch the canonical record,
//! delete the rest) is the caller's job.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use hirescreen_core::{CandidateRecord, MatchResult};
use uuid::Uuid;

/// One identity-key group with more than one stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeGroup {
    pub identity_key: String,
    pub canonical_id: Uuid,
    /// Non-canonical members, in canonical order.
    pub duplicate_ids: Vec<Uuid>,
    /// Union of every member's tags.
    pub merged_tags: BTreeSet<String>,
    /// Per-scope analyses, first non-empty value in canonical order.
    pub merged_analyses: BTreeMap<String, MatchResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergePlan {
    pub groups: Vec<MergeGroup>,
}

impl MergePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of records the plan would delete.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicate_ids.len()).sum()
    }
}

/// Orders records canonical-first: most recently crawled, then the one with
/// more analysis results, then the lowest id.
fn canonical_order(a: &CandidateRecord, b: &CandidateRecord) -> Ordering {
    b.crawled_at
        .cmp(&a.crawled_at)
        .then_with(|| b.analyses.len().cmp(&a.analyses.len()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Groups records by identity key and plans a merge for every group with
/// more than one member.
///
/// Groups come back sorted by identity key. Once a plan has been applied,
/// planning again over the result yields an empty plan.
#[must_use]
pub fn plan_merge(records: &[CandidateRecord]) -> MergePlan {
    let mut by_key: BTreeMap<&str, Vec<&CandidateRecord>> = BTreeMap::new();
    for record in records {
        by_key
            .entry(record.identity_key.as_str())
            .or_default()
            .push(record);
    }

    let groups = by_key
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, mut members)| {
            members.sort_by(|a, b| canonical_order(a, b));

            let merged_tags = members
                .iter()
                .flat_map(|m| m.tags.iter().cloned())
                .collect();

            let mut merged_analyses = BTreeMap::new();
            for member in &members {
                for (scope, result) in &member.analyses {
                    merged_analyses
                        .entry(scope.clone())
                        .or_insert_with(|| result.clone());
                }
            }

            MergeGroup {
                identity_key: key.to_string(),
                canonical_id: members[0].id,
                duplicate_ids: members[1..].iter().map(|m| m.id).collect(),
                merged_tags,
                merged_analyses,
            }
        })
        .collect();

    MergePlan { groups }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use hirescreen_core::{CandidateContent, Recommendation, ScoreSource};

    use super::*;

    fn record(id: u128, key: &str, crawled_offset_days: i64) -> CandidateRecord {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        CandidateRecord {
            id: Uuid::from_u128(id),
            external_id: format!("ext-{id}"),
            identity_key: key.to_string(),
            content: CandidateContent::default(),
            content_hash: String::new(),
            structured: None,
            tags: BTreeSet::new(),
            analyses: BTreeMap::new(),
            crawled_at: base + Duration::days(crawled_offset_days),
            created_at: base,
            updated_at: base,
        }
    }

    fn analysis(resume: Uuid, scope: &str, score: u32) -> MatchResult {
        MatchResult {
            resume_id: resume,
            job_requirement_id: scope.to_string(),
            score,
            recommendation: Recommendation::from_score(score),
            breakdown: vec![],
            matched_skills: vec![],
            matched_companies: vec![],
            source: ScoreSource::Rule,
            summary: None,
            scored_at: Utc::now(),
        }
    }

    /// Applies a plan the way the maintenance operation does.
    fn apply(records: &[CandidateRecord], plan: &MergePlan) -> Vec<CandidateRecord> {
        let deleted: BTreeSet<Uuid> = plan
            .groups
            .iter()
            .flat_map(|g| g.duplicate_ids.iter().copied())
            .collect();
        records
            .iter()
            .filter(|r| !deleted.contains(&r.id))
            .map(|r| {
                let mut r = r.clone();
                if let Some(g) = plan.groups.iter().find(|g| g.canonical_id == r.id) {
                    r.tags.clone_from(&g.merged_tags);
                    r.analyses.clone_from(&g.merged_analyses);
                }
                r
            })
            .collect()
    }

    #[test]
    fn most_recent_crawl_is_canonical() {
        let records = vec![record(1, "url:a", 0), record(2, "url:a", 5), record(3, "url:b", 0)];
        let plan = plan_merge(&records);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].canonical_id, Uuid::from_u128(2));
        assert_eq!(plan.groups[0].duplicate_ids, vec![Uuid::from_u128(1)]);
        assert_eq!(plan.duplicate_count(), 1);
    }

    #[test]
    fn richer_analysis_breaks_crawl_ties() {
        let mut rich = record(9, "url:a", 0);
        rich.analyses
            .insert("job-1".into(), analysis(rich.id, "job-1", 80));
        let records = vec![record(1, "url:a", 0), rich];
        let plan = plan_merge(&records);
        assert_eq!(plan.groups[0].canonical_id, Uuid::from_u128(9));
    }

    #[test]
    fn lowest_id_breaks_remaining_ties() {
        let records = vec![record(7, "url:a", 0), record(3, "url:a", 0)];
        let plan = plan_merge(&records);
        assert_eq!(plan.groups[0].canonical_id, Uuid::from_u128(3));
    }

    #[test]
    fn tags_union_and_analyses_prefer_canonical() {
        let mut newer = record(1, "url:a", 2);
        newer.tags.insert("vip".into());
        newer
            .analyses
            .insert("job-1".into(), analysis(newer.id, "job-1", 90));

        let mut older = record(2, "url:a", 1);
        older.tags.insert("sales".into());
        older
            .analyses
            .insert("job-1".into(), analysis(older.id, "job-1", 40));
        older
            .analyses
            .insert("job-2".into(), analysis(older.id, "job-2", 60));

        let plan = plan_merge(&[older, newer]);
        let group = &plan.groups[0];
        assert_eq!(
            group.merged_tags,
            BTreeSet::from(["sales".to_string(), "vip".to_string()])
        );
        assert_eq!(group.merged_analyses["job-1"].score, 90);
        assert_eq!(group.merged_analyses["job-2"].score, 60);
    }

    #[test]
    fn second_run_changes_nothing() {
        let records = vec![
            record(1, "url:a", 0),
            record(2, "url:a", 1),
            record(3, "url:a", 2),
            record(4, "ext:x", 0),
        ];
        let first = plan_merge(&records);
        assert_eq!(first.duplicate_count(), 2);

        let after = apply(&records, &first);
        assert_eq!(after.len(), 2);
        assert!(plan_merge(&after).is_empty());
    }

    #[test]
    fn singletons_produce_no_plan() {
        let records = vec![record(1, "url:a", 0), record(2, "url:b", 0)];
        assert!(plan_merge(&records).is_empty());
    }
}
