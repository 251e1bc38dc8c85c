use async_trait::async_trait;
use hirescreen_core::{CandidateContent, MatchResult, Vocabulary};
use hirescreen_db::MemoryStore;

use super::*;

fn incoming(external_id: &str, url: Option<&str>, intention: &str, tags: &[&str]) -> IncomingCandidate {
    IncomingCandidate {
        external_id: external_id.into(),
        content: CandidateContent {
            profile_url: url.map(str::to_string),
            intention: Some(intention.into()),
            experience: Some("5年".into()),
            ..CandidateContent::default()
        },
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        crawled_at: None,
    }
}

fn indexer() -> CandidateIndexer {
    CandidateIndexer::new(Vocabulary::default())
}

#[test]
fn collapse_keeps_last_seen_at_first_position() {
    let batch = vec![
        incoming("a", Some("https://jobs.example.com/u/1?utm_source=x"), "old", &[]),
        incoming("b", None, "other", &[]),
        incoming("c", Some("https://jobs.example.com/u/1"), "new", &[]),
    ];
    let collapsed = collapse_by_identity(batch);
    assert_eq!(collapsed.collapsed, 1);
    assert_eq!(collapsed.rejected, 0);
    let items = &collapsed.items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].1.external_id, "c");
    assert_eq!(items[0].1.content.intention.as_deref(), Some("new"));
    assert_eq!(items[1].1.external_id, "b");
}

#[tokio::test]
async fn records_without_identity_are_failed_not_merged() {
    let store = MemoryStore::new();
    let batch = vec![
        incoming("", None, "销售经理", &[]),
        incoming(" ", None, "前端开发", &[]),
        incoming("", Some("https://jobs.example.com/u/9"), "运营", &[]),
        incoming("", Some("https://jobs.example.com/u/10"), "客服", &[]),
    ];

    let summary = ingest_batch(&store, &indexer(), batch, 4).await;
    assert_eq!(summary.received, 4);
    assert_eq!(summary.collapsed, 0);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.inserted, 2);

    let mut keys: Vec<String> = store
        .list_candidates()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.identity_key)
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "url:jobs.example.com/u/10".to_string(),
            "url:jobs.example.com/u/9".to_string()
        ]
    );
}

#[tokio::test]
async fn reingesting_identical_batch_is_unchanged() {
    let store = MemoryStore::new();
    let batch = vec![
        incoming("a", None, "销售", &["s1"]),
        incoming("b", None, "运营", &[]),
    ];

    let first = ingest_batch(&store, &indexer(), batch.clone(), 4).await;
    assert_eq!(first.received, 2);
    assert_eq!(first.inserted, 2);

    let second = ingest_batch(&store, &indexer(), batch, 4).await;
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 2);
    assert_eq!(store.list_candidates().await.unwrap().len(), 2);
}

#[tokio::test]
async fn changed_content_updates_and_unions_tags() {
    let store = MemoryStore::new();
    ingest_batch(&store, &indexer(), vec![incoming("a", None, "销售", &["s1"])], 1).await;

    let summary = ingest_batch(
        &store,
        &indexer(),
        vec![incoming("a", None, "销售经理", &["s2", " "])],
        1,
    )
    .await;
    assert_eq!(summary.updated, 1);

    let stored = store.list_candidates().await.unwrap();
    assert_eq!(stored.len(), 1);
    let record = &stored[0];
    assert_eq!(record.content.intention.as_deref(), Some("销售经理"));
    let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
    assert_eq!(tags, vec!["s1", "s2"]);
    assert!(record.has_search_text());
}

#[tokio::test]
async fn unchanged_content_still_unions_tags() {
    let store = MemoryStore::new();
    ingest_batch(&store, &indexer(), vec![incoming("a", None, "销售", &["s1"])], 1).await;
    let summary = ingest_batch(&store, &indexer(), vec![incoming("a", None, "销售", &["s2"])], 1).await;
    assert_eq!(summary.unchanged, 1);

    let record = store.list_candidates().await.unwrap().remove(0);
    assert_eq!(record.tags.len(), 2);
}

#[tokio::test]
async fn missing_search_text_forces_update() {
    let store = MemoryStore::new();
    ingest_batch(&store, &indexer(), vec![incoming("a", None, "销售", &[])], 1).await;
    let id = store.list_candidates().await.unwrap()[0].id;

    // Simulate a legacy row without a derived index.
    let mut legacy = store.get_candidate(id).await.unwrap().unwrap();
    legacy.structured = None;
    store.delete_candidate(id).await.unwrap();
    store.insert_candidate(&legacy).await.unwrap();

    let summary = ingest_batch(&store, &indexer(), vec![incoming("a", None, "销售", &[])], 1).await;
    assert_eq!(summary.updated, 1);
    assert!(store.get_candidate(id).await.unwrap().unwrap().has_search_text());
}

#[tokio::test]
async fn external_id_fallback_moves_record_to_new_identity_key() {
    let store = MemoryStore::new();
    ingest_batch(&store, &indexer(), vec![incoming("a", None, "销售", &[])], 1).await;
    let before = store.list_candidates().await.unwrap().remove(0);
    assert_eq!(before.identity_key, "ext:a");

    // Same external id, now with a profile URL: a different identity key.
    let summary = ingest_batch(
        &store,
        &indexer(),
        vec![incoming("a", Some("https://jobs.example.com/u/9"), "销售", &[])],
        1,
    )
    .await;
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 1);

    let after = store.list_candidates().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, before.id);
    assert!(after[0].identity_key.starts_with("url:"));
}

#[tokio::test]
async fn tracking_parameter_variants_become_one_record() {
    let store = MemoryStore::new();
    let summary = ingest_batch(
        &store,
        &indexer(),
        vec![
            incoming("a", Some("https://jobs.example.com/u/1?id=1"), "销售", &[]),
            incoming("b", Some("https://jobs.example.com/u/1?id=1&utm_source=x"), "销售", &[]),
        ],
        8,
    )
    .await;
    assert_eq!(summary.received, 2);
    assert_eq!(summary.collapsed, 1);
    assert_eq!(summary.inserted, 1);
    assert_eq!(store.list_candidates().await.unwrap().len(), 1);
}

#[tokio::test]
async fn large_batch_with_zero_concurrency_still_ingests_everything() {
    let store = MemoryStore::new();
    let batch: Vec<_> = (0..50)
        .map(|i| incoming(&format!("id-{i}"), None, "销售", &[]))
        .collect();
    let summary = ingest_batch(&store, &indexer(), batch, 0).await;
    assert_eq!(summary.inserted, 50);
    assert_eq!(store.list_candidates().await.unwrap().len(), 50);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let store = MemoryStore::new();
    let summary = ingest_batch(&store, &indexer(), Vec::new(), 8).await;
    assert_eq!(summary, CollectionSummary::default());
}

/// Fails inserts for one external id; everything else goes to memory.
struct FlakyStore {
    inner: MemoryStore,
    poisoned: &'static str,
}

#[async_trait]
impl CandidateStore for FlakyStore {
    async fn get_candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>, DbError> {
        self.inner.get_candidate(id).await
    }
    async fn find_candidate_by_identity_key(
        &self,
        identity_key: &str,
    ) -> Result<Option<CandidateRecord>, DbError> {
        self.inner.find_candidate_by_identity_key(identity_key).await
    }
    async fn find_candidate_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<CandidateRecord>, DbError> {
        self.inner.find_candidate_by_external_id(external_id).await
    }
    async fn get_candidates(&self, ids: &[Uuid]) -> Result<Vec<CandidateRecord>, DbError> {
        self.inner.get_candidates(ids).await
    }
    async fn list_candidates(&self) -> Result<Vec<CandidateRecord>, DbError> {
        self.inner.list_candidates().await
    }
    async fn scan_candidates(
        &self,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<CandidateRecord>, DbError> {
        self.inner.scan_candidates(after, limit).await
    }
    async fn insert_candidate(&self, record: &CandidateRecord) -> Result<(), DbError> {
        if record.external_id == self.poisoned {
            return Err(DbError::InvalidValue {
                column: "external_id",
                value: record.external_id.clone(),
            });
        }
        self.inner.insert_candidate(record).await
    }
    async fn patch_candidate(&self, id: Uuid, patch: &CandidatePatch) -> Result<(), DbError> {
        self.inner.patch_candidate(id, patch).await
    }
    async fn delete_candidate(&self, id: Uuid) -> Result<bool, DbError> {
        self.inner.delete_candidate(id).await
    }
    async fn put_analysis(&self, candidate_id: Uuid, result: &MatchResult) -> Result<(), DbError> {
        self.inner.put_analysis(candidate_id, result).await
    }
}

#[tokio::test]
async fn one_failing_item_does_not_stop_the_batch() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        poisoned: "bad",
    };
    let summary = ingest_batch(
        &store,
        &indexer(),
        vec![
            incoming("ok-1", None, "销售", &[]),
            incoming("bad", None, "销售", &[]),
            incoming("ok-2", None, "销售", &[]),
        ],
        2,
    )
    .await;
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.failed, 1);
}
