//! Deterministic fingerprints for task scopes and duplicate dispatch.

use hirescreen_core::{AnalysisTaskConfig, CollectionTaskConfig};
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Lower-cased, trimmed, non-empty, sorted and deduplicated.
fn normalized_terms(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = terms
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Scope key for an ad-hoc keyword search: `kw:` plus a hash of the
/// normalized keyword set and, when given, the normalized target locations.
/// Order and case do not matter.
#[must_use]
pub fn keyword_scope_key(keywords: &[String], locations: &[String]) -> String {
    let mut material = normalized_terms(keywords).join("\n");
    let locations = normalized_terms(locations);
    if !locations.is_empty() {
        material.push_str("\n@");
        material.push_str(&locations.join("\n"));
    }
    format!("kw:{}", sha256_hex(&material))
}

/// Key under which results are stored on each candidate: the job id when
/// the run targets a stored job, else the keyword scope key. A job scope
/// with a location override gets a location suffix so the two never share
/// stored results.
#[must_use]
pub fn scope_key(job_id: Option<Uuid>, keywords: &[String], locations: &[String]) -> String {
    match job_id {
        Some(id) => {
            let locations = normalized_terms(locations);
            if locations.is_empty() {
                id.to_string()
            } else {
                let digest = sha256_hex(&locations.join("\n"));
                format!("{id}@{}", &digest[..16])
            }
        }
        None => keyword_scope_key(keywords, locations),
    }
}

#[must_use]
pub fn analysis_scope_key(config: &AnalysisTaskConfig) -> String {
    scope_key(config.job_id, &config.keywords, &config.target_locations)
}

/// Fingerprint of an analysis run's logical scope, scoring mode and
/// candidate set.
///
/// Reordering keywords, locations or candidate ids yields the same key;
/// changing the job, keywords, locations, `use_ai` or the candidate set
/// yields a different one.
#[must_use]
pub fn analysis_idempotency_key(config: &AnalysisTaskConfig) -> String {
    let scope = match config.job_id {
        Some(_) => format!("job:{}", analysis_scope_key(config)),
        None => analysis_scope_key(config),
    };
    let mode = if config.use_ai { "ai" } else { "rules" };

    let mut ids: Vec<Uuid> = config.candidate_ids.clone();
    ids.sort();
    ids.dedup();
    let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();

    sha256_hex(&format!("analysis\n{scope}\n{mode}\n{}", ids.join(",")))
}

/// Fingerprint of a collection request: keyword, location and limit.
#[must_use]
pub fn collection_idempotency_key(config: &CollectionTaskConfig) -> String {
    let keyword = config.keyword.trim().to_lowercase();
    let location = config
        .location
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .unwrap_or_default();
    sha256_hex(&format!(
        "collection\n{keyword}\n{location}\n{}",
        config.limit
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(job: Option<u128>, keywords: &[&str], ids: &[u128]) -> AnalysisTaskConfig {
        AnalysisTaskConfig {
            job_id: job.map(Uuid::from_u128),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            target_locations: Vec::new(),
            candidate_ids: ids.iter().copied().map(Uuid::from_u128).collect(),
            use_ai: false,
        }
    }

    #[test]
    fn key_ignores_keyword_and_candidate_order() {
        let a = analysis_idempotency_key(&config(None, &["Rust", "sql"], &[1, 2, 3]));
        let b = analysis_idempotency_key(&config(None, &["SQL ", "rust", "rust"], &[3, 1, 2, 2]));
        assert_eq!(a, b);
    }

    #[test]
    fn key_changes_with_candidate_set() {
        let a = analysis_idempotency_key(&config(None, &["rust"], &[1, 2]));
        let b = analysis_idempotency_key(&config(None, &["rust"], &[1, 2, 3]));
        assert_ne!(a, b);
    }

    #[test]
    fn key_changes_with_scope() {
        let kw = analysis_idempotency_key(&config(None, &["rust"], &[1]));
        let other_kw = analysis_idempotency_key(&config(None, &["go"], &[1]));
        let job = analysis_idempotency_key(&config(Some(7), &["rust"], &[1]));
        let other_job = analysis_idempotency_key(&config(Some(8), &["rust"], &[1]));
        assert_ne!(kw, other_kw);
        assert_ne!(kw, job);
        assert_ne!(job, other_job);
    }

    #[test]
    fn job_scope_ignores_keywords() {
        let a = analysis_idempotency_key(&config(Some(7), &["rust"], &[1]));
        let b = analysis_idempotency_key(&config(Some(7), &["go"], &[1]));
        assert_eq!(a, b);
    }

    #[test]
    fn scope_key_uses_job_id_or_keyword_hash() {
        assert_eq!(
            analysis_scope_key(&config(Some(7), &[], &[])),
            Uuid::from_u128(7).to_string()
        );
        let kw = analysis_scope_key(&config(None, &["B", "a"], &[]));
        assert!(kw.starts_with("kw:"));
        assert_eq!(kw, keyword_scope_key(&["a".into(), "b".into()], &[]));
    }

    #[test]
    fn key_changes_with_scoring_mode_and_locations() {
        let rules = config(None, &["销售"], &[1]);
        let ai = AnalysisTaskConfig {
            use_ai: true,
            ..rules.clone()
        };
        let beijing = AnalysisTaskConfig {
            target_locations: vec!["北京".into()],
            ..rules.clone()
        };
        let beijing_again = AnalysisTaskConfig {
            target_locations: vec![" 北京".into(), "北京".into()],
            ..rules.clone()
        };

        let key = analysis_idempotency_key(&rules);
        assert_ne!(key, analysis_idempotency_key(&ai));
        assert_ne!(key, analysis_idempotency_key(&beijing));
        assert_eq!(
            analysis_idempotency_key(&beijing),
            analysis_idempotency_key(&beijing_again)
        );
    }

    #[test]
    fn location_override_gets_its_own_scope_key() {
        let plain = config(Some(7), &[], &[1]);
        let shanghai = AnalysisTaskConfig {
            target_locations: vec!["上海".into()],
            ..plain.clone()
        };
        let kw = config(None, &["rust"], &[1]);
        let kw_shanghai = AnalysisTaskConfig {
            target_locations: vec!["上海".into()],
            ..kw.clone()
        };

        assert_eq!(analysis_scope_key(&plain), Uuid::from_u128(7).to_string());
        assert!(analysis_scope_key(&shanghai).starts_with(&Uuid::from_u128(7).to_string()));
        assert_ne!(analysis_scope_key(&plain), analysis_scope_key(&shanghai));
        assert_ne!(analysis_scope_key(&kw), analysis_scope_key(&kw_shanghai));
    }

    #[test]
    fn collection_key_normalizes_keyword_case() {
        let a = CollectionTaskConfig {
            keyword: "Sales".into(),
            location: Some("上海".into()),
            limit: 50,
        };
        let b = CollectionTaskConfig {
            keyword: " sales ".into(),
            ..a.clone()
        };
        let c = CollectionTaskConfig { limit: 60, ..a.clone() };
        assert_eq!(collection_idempotency_key(&a), collection_idempotency_key(&b));
        assert_ne!(collection_idempotency_key(&a), collection_idempotency_key(&c));
    }
}
