use axum::{extract::State, Extension, Json};
use chrono::Utc;
use hirescreen_tasks::{worker_health, WorkerHealth};

use crate::middleware::RequestId;

use super::{map_task_error, ApiError, ApiResponse, AppState};

pub(super) async fn list_workers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<WorkerHealth>>>, ApiError> {
    let workers = worker_health(state.store.as_ref(), Utc::now(), state.worker_freshness)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(workers, req_id.0))
}
