//! Task rows for every task family share one table, discriminated by
//! [`TaskKind::NAME`]. Config and summary payloads are stored as JSONB.

use chrono::{DateTime, Utc};
use hirescreen_core::{TaskKind, TaskOf, TaskProgress, TaskRecord, TaskStatus};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{complete_counts, StatusCount, TaskChange};
use crate::{to_i32, to_u32, DbError};

/// A task with its payloads still in JSON form.
pub(crate) type StoredTask = TaskRecord<Value, Value>;

const TASK_COLUMNS: &str = "id, config, status, progress_done, progress_total, progress_skipped, \
     last_status, idempotency_key, worker_id, error_message, summary, \
     created_at, started_at, completed_at, updated_at";

// ---------------------------------------------------------------------------
// Payload encoding
// ---------------------------------------------------------------------------

pub(crate) fn encode_task<K: TaskKind>(task: &TaskOf<K>) -> Result<StoredTask, DbError> {
    Ok(TaskRecord {
        id: task.id,
        config: serde_json::to_value(&task.config)?,
        status: task.status,
        progress: task.progress,
        last_status: task.last_status.clone(),
        idempotency_key: task.idempotency_key.clone(),
        worker_id: task.worker_id.clone(),
        error_message: task.error_message.clone(),
        summary: task.summary.as_ref().map(serde_json::to_value).transpose()?,
        created_at: task.created_at,
        started_at: task.started_at,
        completed_at: task.completed_at,
        updated_at: task.updated_at,
    })
}

pub(crate) fn decode_task<K: TaskKind>(stored: StoredTask) -> Result<TaskOf<K>, DbError> {
    Ok(TaskRecord {
        id: stored.id,
        config: serde_json::from_value(stored.config)?,
        status: stored.status,
        progress: stored.progress,
        last_status: stored.last_status,
        idempotency_key: stored.idempotency_key,
        worker_id: stored.worker_id,
        error_message: stored.error_message,
        summary: stored.summary.map(serde_json::from_value).transpose()?,
        created_at: stored.created_at,
        started_at: stored.started_at,
        completed_at: stored.completed_at,
        updated_at: stored.updated_at,
    })
}

pub(crate) fn encode_change<K: TaskKind>(
    change: &TaskChange<K::Summary>,
) -> Result<TaskChange<Value>, DbError> {
    change
        .clone()
        .try_map_summary(serde_json::to_value)
        .map_err(DbError::from)
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    config: Value,
    status: String,
    progress_done: i32,
    progress_total: i32,
    progress_skipped: i32,
    last_status: Option<String>,
    idempotency_key: Option<String>,
    worker_id: Option<String>,
    error_message: Option<String>,
    summary: Option<Value>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TaskRow {
    fn decode<K: TaskKind>(self) -> Result<TaskOf<K>, DbError> {
        let status = parse_status(&self.status)?;
        let stored = TaskRecord {
            id: self.id,
            config: self.config,
            status,
            progress: TaskProgress {
                done: to_u32("progress_done", self.progress_done)?,
                total: to_u32("progress_total", self.progress_total)?,
                skipped: to_u32("progress_skipped", self.progress_skipped)?,
            },
            last_status: self.last_status,
            idempotency_key: self.idempotency_key,
            worker_id: self.worker_id,
            error_message: self.error_message,
            summary: self.summary,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
        };
        decode_task::<K>(stored)
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus, DbError> {
    raw.parse::<TaskStatus>().map_err(|_| DbError::InvalidValue {
        column: "status",
        value: raw.to_string(),
    })
}

fn decode_rows<K: TaskKind>(rows: Vec<TaskRow>) -> Result<Vec<TaskOf<K>>, DbError> {
    rows.into_iter().map(TaskRow::decode::<K>).collect()
}

fn status_names(statuses: &[TaskStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Duplicate`] if a live task with the same idempotency
/// key exists, or [`DbError::Sqlx`] if the insert fails.
pub async fn insert_task<K: TaskKind>(pool: &PgPool, task: &TaskOf<K>) -> Result<(), DbError> {
    let stored = encode_task::<K>(task)?;
    let result = sqlx::query(
        "INSERT INTO tasks (id, kind, config, status, progress_done, progress_total, \
         progress_skipped, last_status, idempotency_key, worker_id, error_message, summary, \
         created_at, started_at, completed_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(stored.id)
    .bind(K::NAME)
    .bind(&stored.config)
    .bind(stored.status.as_str())
    .bind(to_i32(stored.progress.done))
    .bind(to_i32(stored.progress.total))
    .bind(to_i32(stored.progress.skipped))
    .bind(stored.last_status.as_deref())
    .bind(stored.idempotency_key.as_deref())
    .bind(stored.worker_id.as_deref())
    .bind(stored.error_message.as_deref())
    .bind(stored.summary.as_ref())
    .bind(stored.created_at)
    .bind(stored.started_at)
    .bind(stored.completed_at)
    .bind(stored.updated_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(DbError::Duplicate(
            stored.idempotency_key.unwrap_or_else(|| stored.id.to_string()),
        )),
        Err(e) => Err(DbError::Sqlx(e)),
    }
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be decoded.
pub async fn get_task<K: TaskKind>(pool: &PgPool, id: Uuid) -> Result<Option<TaskOf<K>>, DbError> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND kind = $2");
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(id)
        .bind(K::NAME)
        .fetch_optional(pool)
        .await?;
    row.map(TaskRow::decode::<K>).transpose()
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn list_tasks<K: TaskKind>(
    pool: &PgPool,
    status: Option<TaskStatus>,
    limit: usize,
) -> Result<Vec<TaskOf<K>>, DbError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks \
         WHERE kind = $1 AND ($2::text IS NULL OR status = $2) \
         ORDER BY created_at DESC, id DESC LIMIT $3"
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(K::NAME)
        .bind(status.map(TaskStatus::as_str))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;
    decode_rows::<K>(rows)
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be decoded.
pub async fn find_active_task_by_idempotency_key<K: TaskKind>(
    pool: &PgPool,
    key: &str,
) -> Result<Option<TaskOf<K>>, DbError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks \
         WHERE kind = $1 AND idempotency_key = $2 AND status IN ('pending', 'processing') \
         LIMIT 1"
    );
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(K::NAME)
        .bind(key)
        .fetch_optional(pool)
        .await?;
    row.map(TaskRow::decode::<K>).transpose()
}

/// Applies `change` in a single statement guarded by `status = ANY(from)`.
///
/// # Errors
///
/// Returns [`DbError`] if the summary cannot be encoded or the update fails.
pub async fn transition_task<K: TaskKind>(
    pool: &PgPool,
    id: Uuid,
    from: &[TaskStatus],
    change: &TaskChange<K::Summary>,
) -> Result<bool, DbError> {
    let change = encode_change::<K>(change)?;
    let result = sqlx::query(
        "UPDATE tasks SET \
             status = COALESCE($4, status), \
             progress_done = COALESCE($5, progress_done), \
             progress_total = COALESCE($6, progress_total), \
             progress_skipped = COALESCE($7, progress_skipped), \
             last_status = COALESCE($8, last_status), \
             error_message = COALESCE($9, error_message), \
             summary = COALESCE($10, summary), \
             worker_id = COALESCE($11, worker_id), \
             started_at = CASE WHEN $12 THEN COALESCE(started_at, NOW()) ELSE started_at END, \
             completed_at = CASE WHEN $13 THEN NOW() ELSE completed_at END, \
             updated_at = NOW() \
         WHERE id = $1 AND kind = $2 AND status = ANY($3)",
    )
    .bind(id)
    .bind(K::NAME)
    .bind(status_names(from))
    .bind(change.status.map(TaskStatus::as_str))
    .bind(change.progress.map(|p| to_i32(p.done)))
    .bind(change.progress.map(|p| to_i32(p.total)))
    .bind(change.progress.map(|p| to_i32(p.skipped)))
    .bind(change.last_status.as_deref())
    .bind(change.error_message.as_deref())
    .bind(change.summary.as_ref())
    .bind(change.worker_id.as_deref())
    .bind(change.mark_started)
    .bind(change.mark_completed)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Claims the oldest pending task. Concurrent claimers skip rows locked by
/// each other, so each task is handed to at most one worker.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails or the row cannot be decoded.
pub async fn claim_next_task<K: TaskKind>(
    pool: &PgPool,
    worker_id: &str,
) -> Result<Option<TaskOf<K>>, DbError> {
    let sql = format!(
        "UPDATE tasks SET status = 'processing', worker_id = $2, last_status = 'claimed', \
             started_at = COALESCE(started_at, NOW()), updated_at = NOW() \
         WHERE id = ( \
             SELECT id FROM tasks \
             WHERE kind = $1 AND status = 'pending' \
             ORDER BY created_at, id \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED \
         ) AND status = 'pending' \
         RETURNING {TASK_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(K::NAME)
        .bind(worker_id)
        .fetch_optional(pool)
        .await?;
    row.map(TaskRow::decode::<K>).transpose()
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be decoded.
pub async fn list_stale_pending_tasks<K: TaskKind>(
    pool: &PgPool,
    created_before: DateTime<Utc>,
) -> Result<Vec<TaskOf<K>>, DbError> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks \
         WHERE kind = $1 AND status = 'pending' AND created_at < $2 \
         ORDER BY created_at, id"
    );
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(K::NAME)
        .bind(created_before)
        .fetch_all(pool)
        .await?;
    decode_rows::<K>(rows)
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or a status value is unknown.
pub async fn count_tasks_by_status<K: TaskKind>(
    pool: &PgPool,
) -> Result<Vec<StatusCount>, DbError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM tasks WHERE kind = $1 GROUP BY status")
            .bind(K::NAME)
            .fetch_all(pool)
            .await?;

    let found = rows
        .into_iter()
        .map(|(status, count)| {
            Ok((
                parse_status(&status)?,
                u64::try_from(count).unwrap_or_default(),
            ))
        })
        .collect::<Result<Vec<_>, DbError>>()?;
    Ok(complete_counts(&found))
}

#[cfg(test)]
mod tests {
    use hirescreen_core::{AnalysisKind, AnalysisSummary, AnalysisTask, AnalysisTaskConfig};

    use super::*;

    #[test]
    fn payloads_survive_json_encoding() {
        let mut task: AnalysisTask = TaskRecord::pending(
            AnalysisTaskConfig {
                keywords: vec!["rust".into()],
                candidate_ids: vec![Uuid::nil()],
                ..AnalysisTaskConfig::default()
            },
            1,
            Some("key".into()),
        );
        task.summary = Some(AnalysisSummary {
            analyzed: 1,
            ..AnalysisSummary::default()
        });

        let stored = encode_task::<AnalysisKind>(&task).unwrap();
        assert_eq!(stored.config["keywords"][0], "rust");
        let decoded = decode_task::<AnalysisKind>(stored).unwrap();
        assert_eq!(decoded, task);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            parse_status("running"),
            Err(DbError::InvalidValue { column: "status", .. })
        ));
    }
}
