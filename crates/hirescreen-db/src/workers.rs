use chrono::{DateTime, Utc};
use hirescreen_core::{WorkerHeartbeat, WorkerState};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct WorkerHeartbeatRow {
    worker_id: String,
    state: String,
    active_task_id: Option<Uuid>,
    last_heartbeat_at: DateTime<Utc>,
    last_error: Option<String>,
}

impl TryFrom<WorkerHeartbeatRow> for WorkerHeartbeat {
    type Error = DbError;

    fn try_from(row: WorkerHeartbeatRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .parse::<WorkerState>()
            .map_err(|_| DbError::InvalidValue {
                column: "state",
                value: row.state.clone(),
            })?;
        Ok(Self {
            worker_id: row.worker_id,
            state,
            active_task_id: row.active_task_id,
            last_heartbeat_at: row.last_heartbeat_at,
            last_error: row.last_error,
        })
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_worker_heartbeat(
    pool: &PgPool,
    heartbeat: &WorkerHeartbeat,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO worker_heartbeats \
             (worker_id, state, active_task_id, last_heartbeat_at, last_error) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (worker_id) DO UPDATE SET \
             state = EXCLUDED.state, \
             active_task_id = EXCLUDED.active_task_id, \
             last_heartbeat_at = EXCLUDED.last_heartbeat_at, \
             last_error = EXCLUDED.last_error",
    )
    .bind(&heartbeat.worker_id)
    .bind(heartbeat.state.as_str())
    .bind(heartbeat.active_task_id)
    .bind(heartbeat.last_heartbeat_at)
    .bind(heartbeat.last_error.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns [`DbError`] if the query fails or a stored state is unknown.
pub async fn list_worker_heartbeats(pool: &PgPool) -> Result<Vec<WorkerHeartbeat>, DbError> {
    let rows = sqlx::query_as::<_, WorkerHeartbeatRow>(
        "SELECT worker_id, state, active_task_id, last_heartbeat_at, last_error \
         FROM worker_heartbeats ORDER BY worker_id",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(WorkerHeartbeat::try_from).collect()
}
