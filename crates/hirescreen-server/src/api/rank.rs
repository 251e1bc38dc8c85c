use axum::{extract::State, Extension, Json};
use hirescreen_core::MatchResult;
use hirescreen_tasks::{rank_stored, RankRequest};

use crate::middleware::RequestId;

use super::{map_task_error, ApiError, ApiResponse, AppState};

/// Rule-based ranking computed inline; results are returned, not stored.
pub(super) async fn rank(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<RankRequest>,
) -> Result<Json<ApiResponse<Vec<MatchResult>>>, ApiError> {
    let ranked = rank_stored(
        state.store.as_ref(),
        state.reference.as_ref(),
        state.scoring,
        &request,
    )
    .await
    .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(ranked, req_id.0))
}
