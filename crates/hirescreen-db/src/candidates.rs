use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use hirescreen_core::{CandidateContent, CandidateRecord, MatchResult, StructuredIndex};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::CandidatePatch;
use crate::DbError;

const SELECT_CANDIDATE: &str = "SELECT id, external_id, identity_key, content, content_hash, \
     structured, tags, analyses, crawled_at, created_at, updated_at FROM candidates";

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: Uuid,
    external_id: String,
    identity_key: String,
    content: Json<CandidateContent>,
    content_hash: String,
    structured: Option<Json<StructuredIndex>>,
    tags: Vec<String>,
    analyses: Json<BTreeMap<String, MatchResult>>,
    crawled_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CandidateRow> for CandidateRecord {
    fn from(row: CandidateRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            identity_key: row.identity_key,
            content: row.content.0,
            content_hash: row.content_hash,
            structured: row.structured.map(|s| s.0),
            tags: row.tags.into_iter().collect::<BTreeSet<_>>(),
            analyses: row.analyses.0,
            crawled_at: row.crawled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_candidate(pool: &PgPool, id: Uuid) -> Result<Option<CandidateRecord>, DbError> {
    let sql = format!("{SELECT_CANDIDATE} WHERE id = $1");
    let row = sqlx::query_as::<_, CandidateRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CandidateRecord::from))
}

/// Most recently crawled candidate with `identity_key`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_candidate_by_identity_key(
    pool: &PgPool,
    identity_key: &str,
) -> Result<Option<CandidateRecord>, DbError> {
    let sql = format!(
        "{SELECT_CANDIDATE} WHERE identity_key = $1 ORDER BY crawled_at DESC, id LIMIT 1"
    );
    let row = sqlx::query_as::<_, CandidateRow>(&sql)
        .bind(identity_key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CandidateRecord::from))
}

/// Most recently crawled candidate with `external_id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_candidate_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<CandidateRecord>, DbError> {
    let sql = format!(
        "{SELECT_CANDIDATE} WHERE external_id = $1 ORDER BY crawled_at DESC, id LIMIT 1"
    );
    let row = sqlx::query_as::<_, CandidateRow>(&sql)
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CandidateRecord::from))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_candidates(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<CandidateRecord>, DbError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("{SELECT_CANDIDATE} WHERE id = ANY($1) ORDER BY id");
    let rows = sqlx::query_as::<_, CandidateRow>(&sql)
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(CandidateRecord::from).collect())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_candidates(pool: &PgPool) -> Result<Vec<CandidateRecord>, DbError> {
    let sql = format!("{SELECT_CANDIDATE} ORDER BY created_at, id");
    let rows = sqlx::query_as::<_, CandidateRow>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(CandidateRecord::from).collect())
}

/// Keyset page ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn scan_candidates(
    pool: &PgPool,
    after: Option<Uuid>,
    limit: usize,
) -> Result<Vec<CandidateRecord>, DbError> {
    let sql = format!(
        "{SELECT_CANDIDATE} WHERE ($1::uuid IS NULL OR id > $1) ORDER BY id LIMIT $2"
    );
    let rows = sqlx::query_as::<_, CandidateRow>(&sql)
        .bind(after)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(CandidateRecord::from).collect())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_candidate(pool: &PgPool, record: &CandidateRecord) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO candidates (id, external_id, identity_key, content, content_hash, \
         structured, tags, analyses, crawled_at, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(record.id)
    .bind(&record.external_id)
    .bind(&record.identity_key)
    .bind(Json(&record.content))
    .bind(&record.content_hash)
    .bind(record.structured.as_ref().map(Json))
    .bind(record.tags.iter().cloned().collect::<Vec<_>>())
    .bind(Json(&record.analyses))
    .bind(record.crawled_at)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no candidate has `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn patch_candidate(
    pool: &PgPool,
    id: Uuid,
    patch: &CandidatePatch,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE candidates SET \
             identity_key = COALESCE($2, identity_key), \
             content = COALESCE($3, content), \
             content_hash = COALESCE($4, content_hash), \
             structured = COALESCE($5, structured), \
             tags = COALESCE($6, tags), \
             analyses = COALESCE($7, analyses), \
             crawled_at = COALESCE($8, crawled_at), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(patch.identity_key.as_deref())
    .bind(patch.content.as_ref().map(Json))
    .bind(patch.content_hash.as_deref())
    .bind(patch.structured.as_ref().map(Json))
    .bind(
        patch
            .tags
            .as_ref()
            .map(|tags| tags.iter().cloned().collect::<Vec<_>>()),
    )
    .bind(patch.analyses.as_ref().map(Json))
    .bind(patch.crawled_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_candidate(pool: &PgPool, id: Uuid) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Merges `result` into the candidate's analyses under its scope key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no candidate has `candidate_id`.
pub async fn put_analysis(
    pool: &PgPool,
    candidate_id: Uuid,
    result: &MatchResult,
) -> Result<(), DbError> {
    let updated = sqlx::query(
        "UPDATE candidates \
         SET analyses = analyses || jsonb_build_object($2::text, $3::jsonb), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(candidate_id)
    .bind(&result.job_requirement_id)
    .bind(Json(result))
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
