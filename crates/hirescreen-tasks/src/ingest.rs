//! Ingest of harvested candidate batches with identity-based dedup.
//!
//! A batch is first collapsed in memory by identity key, then each surviving
//! record is matched against storage (identity key first, external id as a
//! fallback for records stored under an older key) and inserted, updated or
//! left alone.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use hirescreen_core::{CandidateRecord, CollectionSummary, IncomingCandidate};
use hirescreen_db::{CandidatePatch, CandidateStore, DbError};
use hirescreen_signals::{content_hash, derive_identity_key};
use uuid::Uuid;

use crate::indexer::CandidateIndexer;

pub const DEFAULT_INGEST_CONCURRENCY: usize = 8;
pub const MAX_INGEST_CONCURRENCY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    Updated,
    Unchanged,
}

/// A harvested batch after in-memory identity collapse.
#[derive(Debug, Default)]
pub struct CollapsedBatch {
    /// Survivors paired with their identity keys, in first-seen key order.
    pub items: Vec<(String, IncomingCandidate)>,
    /// Records dropped because a later record shared their key.
    pub collapsed: usize,
    /// Records with no usable identity at all.
    pub rejected: usize,
}

/// Collapses `batch` by identity key. The last record seen for a key wins
/// and takes the position of the key's first appearance. Records without an
/// identity are logged and counted as rejected; they are never merged.
#[must_use]
pub fn collapse_by_identity(batch: Vec<IncomingCandidate>) -> CollapsedBatch {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out = CollapsedBatch {
        items: Vec::with_capacity(batch.len()),
        ..CollapsedBatch::default()
    };

    for item in batch {
        let Some(key) = derive_identity_key(&item.content, &item.external_id) else {
            tracing::warn!(
                external_id = %item.external_id,
                "candidate has no identity; skipping"
            );
            out.rejected += 1;
            continue;
        };
        match slots.get(&key) {
            Some(&slot) => {
                out.items[slot].1 = item;
                out.collapsed += 1;
            }
            None => {
                slots.insert(key.clone(), out.items.len());
                out.items.push((key, item));
            }
        }
    }
    out
}

fn clean_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ingests one collapsed record.
///
/// # Errors
///
/// Returns [`DbError`] on storage failure.
pub async fn ingest_one<S>(
    store: &S,
    indexer: &CandidateIndexer,
    identity_key: &str,
    item: &IncomingCandidate,
) -> Result<IngestOutcome, DbError>
where
    S: CandidateStore + ?Sized,
{
    let existing = match store.find_candidate_by_identity_key(identity_key).await? {
        Some(record) => Some(record),
        None if item.external_id.trim().is_empty() => None,
        None => store.find_candidate_by_external_id(&item.external_id).await?,
    };

    let now = Utc::now();
    let hash = content_hash(&item.content);
    let incoming_tags = clean_tags(&item.tags);

    let Some(existing) = existing else {
        let record = CandidateRecord {
            id: Uuid::new_v4(),
            external_id: item.external_id.clone(),
            identity_key: identity_key.to_string(),
            content: item.content.clone(),
            content_hash: hash,
            structured: Some(indexer.index(&item.content)),
            tags: incoming_tags,
            analyses: BTreeMap::new(),
            crawled_at: item.crawled_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        };
        store.insert_candidate(&record).await?;
        return Ok(IngestOutcome::Inserted);
    };

    let merged_tags: BTreeSet<String> = existing.tags.union(&incoming_tags).cloned().collect();
    let tags_grew = merged_tags.len() > existing.tags.len();
    let key_moved = existing.identity_key != identity_key;

    if existing.content_hash != hash || !existing.has_search_text() {
        let patch = CandidatePatch {
            identity_key: key_moved.then(|| identity_key.to_string()),
            content: Some(item.content.clone()),
            content_hash: Some(hash),
            structured: Some(indexer.index(&item.content)),
            tags: tags_grew.then_some(merged_tags),
            crawled_at: Some(item.crawled_at.unwrap_or(now)),
            ..CandidatePatch::default()
        };
        store.patch_candidate(existing.id, &patch).await?;
        return Ok(IngestOutcome::Updated);
    }

    if tags_grew || key_moved {
        let patch = CandidatePatch {
            identity_key: key_moved.then(|| identity_key.to_string()),
            tags: tags_grew.then_some(merged_tags),
            ..CandidatePatch::default()
        };
        store.patch_candidate(existing.id, &patch).await?;
    }
    Ok(IngestOutcome::Unchanged)
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    inserted: u32,
    updated: u32,
    unchanged: u32,
    failed: u32,
}

pub(crate) fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Ingests already-collapsed items with bounded parallelism.
///
/// At most `concurrency` (capped at [`MAX_INGEST_CONCURRENCY`] and the item
/// count) workers pull items off a shared cursor. A failed item is logged and
/// counted; it never stops the others. `received` and `collapsed` are left
/// at zero.
pub async fn ingest_collapsed<S>(
    store: &S,
    indexer: &CandidateIndexer,
    items: &[(String, IncomingCandidate)],
    concurrency: usize,
) -> CollectionSummary
where
    S: CandidateStore + ?Sized,
{
    let workers = concurrency.clamp(1, MAX_INGEST_CONCURRENCY).min(items.len());
    let cursor = AtomicUsize::new(0);

    let tallies = futures::future::join_all((0..workers).map(|_| async {
        let mut tally = Tally::default();
        loop {
            let i = cursor.fetch_add(1, Ordering::Relaxed);
            let Some((key, item)) = items.get(i) else {
                break;
            };
            match ingest_one(store, indexer, key, item).await {
                Ok(IngestOutcome::Inserted) => tally.inserted += 1,
                Ok(IngestOutcome::Updated) => tally.updated += 1,
                Ok(IngestOutcome::Unchanged) => tally.unchanged += 1,
                Err(e) => {
                    tracing::warn!(
                        identity_key = %key,
                        external_id = %item.external_id,
                        error = %e,
                        "candidate ingest failed"
                    );
                    tally.failed += 1;
                }
            }
        }
        tally
    }))
    .await;

    let mut summary = CollectionSummary::default();
    for t in tallies {
        summary.inserted += t.inserted;
        summary.updated += t.updated;
        summary.unchanged += t.unchanged;
        summary.failed += t.failed;
    }
    summary
}

/// Collapses and ingests a harvested batch. See [`ingest_collapsed`].
pub async fn ingest_batch<S>(
    store: &S,
    indexer: &CandidateIndexer,
    batch: Vec<IncomingCandidate>,
    concurrency: usize,
) -> CollectionSummary
where
    S: CandidateStore + ?Sized,
{
    let received = saturating_u32(batch.len());
    let batch = collapse_by_identity(batch);
    let ingested = ingest_collapsed(store, indexer, &batch.items, concurrency).await;
    let summary = CollectionSummary {
        received,
        collapsed: saturating_u32(batch.collapsed),
        failed: ingested.failed + saturating_u32(batch.rejected),
        ..ingested
    };

    tracing::info!(
        received = summary.received,
        collapsed = summary.collapsed,
        inserted = summary.inserted,
        updated = summary.updated,
        unchanged = summary.unchanged,
        failed = summary.failed,
        "ingest batch finished"
    );
    summary
}

#[cfg(test)]
#[path = "ingest_test.rs"]
mod tests;
