use hirescreen_core::{AutoMatchConfig, JobRequirement};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, sqlx::FromRow)]
struct JobRequirementRow {
    id: Uuid,
    title: String,
    requirement_text: String,
    auto_match: Option<Json<AutoMatchConfig>>,
}

impl From<JobRequirementRow> for JobRequirement {
    fn from(row: JobRequirementRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            requirement_text: row.requirement_text,
            auto_match: row.auto_match.map(|a| a.0),
        }
    }
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_job_requirement(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<JobRequirement>, DbError> {
    let row = sqlx::query_as::<_, JobRequirementRow>(
        "SELECT id, title, requirement_text, auto_match FROM job_requirements WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(JobRequirement::from))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_job_requirements(pool: &PgPool) -> Result<Vec<JobRequirement>, DbError> {
    let rows = sqlx::query_as::<_, JobRequirementRow>(
        "SELECT id, title, requirement_text, auto_match FROM job_requirements \
         ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(JobRequirement::from).collect())
}

/// Insert or replace the job requirement with `job.id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_job_requirement(pool: &PgPool, job: &JobRequirement) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO job_requirements (id, title, requirement_text, auto_match) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (id) DO UPDATE SET \
             title = EXCLUDED.title, \
             requirement_text = EXCLUDED.requirement_text, \
             auto_match = EXCLUDED.auto_match, \
             updated_at = NOW()",
    )
    .bind(job.id)
    .bind(&job.title)
    .bind(&job.requirement_text)
    .bind(job.auto_match.as_ref().map(Json))
    .execute(pool)
    .await?;
    Ok(())
}
