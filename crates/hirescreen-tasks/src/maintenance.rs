//! Duplicate-merge maintenance over stored candidates.

use hirescreen_db::{CandidatePatch, CandidateStore};
use hirescreen_signals::plan_merge;
use serde::Serialize;
use uuid::Uuid;

use crate::error::TaskError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedGroup {
    pub identity_key: String,
    pub canonical_id: Uuid,
    pub removed_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub groups: Vec<MergedGroup>,
}

impl MergeReport {
    /// Records deleted (or that would be, on a dry run).
    #[must_use]
    pub fn removed(&self) -> usize {
        self.groups.iter().map(|g| g.removed_ids.len()).sum()
    }
}

/// Groups stored candidates by identity key and folds every group into its
/// canonical record: tags unioned, per-scope analyses merged, the other
/// members deleted. With `dry_run` nothing is written.
///
/// The canonical record is patched before any duplicate is deleted, so an
/// interrupted run loses nothing and the next run picks up where it stopped.
///
/// # Errors
///
/// Returns [`TaskError::Db`] if the store fails.
pub async fn merge_duplicates<S: CandidateStore + ?Sized>(
    store: &S,
    dry_run: bool,
) -> Result<MergeReport, TaskError> {
    let records = store.list_candidates().await?;
    let plan = plan_merge(&records);

    let mut report = MergeReport {
        dry_run,
        scanned: records.len(),
        groups: Vec::with_capacity(plan.groups.len()),
    };

    for group in plan.groups {
        if !dry_run {
            let patch = CandidatePatch {
                tags: Some(group.merged_tags),
                analyses: Some(group.merged_analyses),
                ..CandidatePatch::default()
            };
            store.patch_candidate(group.canonical_id, &patch).await?;
            for id in &group.duplicate_ids {
                if !store.delete_candidate(*id).await? {
                    tracing::warn!(candidate_id = %id, "duplicate already gone");
                }
            }
            tracing::info!(
                identity_key = %group.identity_key,
                canonical_id = %group.canonical_id,
                removed = group.duplicate_ids.len(),
                "merged duplicate candidates"
            );
        }
        report.groups.push(MergedGroup {
            identity_key: group.identity_key,
            canonical_id: group.canonical_id,
            removed_ids: group.duplicate_ids,
        });
    }

    tracing::info!(
        dry_run,
        scanned = report.scanned,
        groups = report.groups.len(),
        removed = report.removed(),
        "duplicate merge finished"
    );
    Ok(report)
}
