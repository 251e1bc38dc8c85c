use axum::{extract::State, Extension, Json};
use hirescreen_tasks::{merge_duplicates, MergeReport};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_task_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Default, Deserialize)]
pub(super) struct MergeRequest {
    #[serde(default)]
    pub dry_run: bool,
}

pub(super) async fn merge(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<MergeRequest>>,
) -> Result<Json<ApiResponse<MergeReport>>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let report = merge_duplicates(state.store.as_ref(), request.dry_run)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(report, req_id.0))
}
