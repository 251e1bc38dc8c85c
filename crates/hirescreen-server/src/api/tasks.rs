use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use hirescreen_core::{
    AnalysisTask, AnalysisTaskConfig, CollectionTask, CollectionTaskConfig, TaskStatus,
};
use hirescreen_tasks::{task_summary, CancelOutcome, EnqueueResult, TaskSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_task_error, normalize_limit, ApiError, ApiResponse, AppState};

const DEFAULT_SUMMARY_LATEST: i64 = 10;
const MAX_SUMMARY_LATEST: i64 = 50;

#[derive(Debug, Deserialize)]
pub(super) struct TaskListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SummaryQuery {
    pub latest: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct DispatchData {
    task_id: Uuid,
    /// `false` when an identical task was already in flight.
    created: bool,
}

impl From<EnqueueResult> for DispatchData {
    fn from(result: EnqueueResult) -> Self {
        Self {
            task_id: result.task_id(),
            created: result.is_created(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct CancelData {
    task_id: Uuid,
    cancelled: bool,
    status: TaskStatus,
}

impl CancelData {
    fn new(task_id: Uuid, outcome: CancelOutcome) -> Self {
        match outcome {
            CancelOutcome::Cancelled => Self {
                task_id,
                cancelled: true,
                status: TaskStatus::Cancelled,
            },
            CancelOutcome::AlreadyFinished(status) => Self {
                task_id,
                cancelled: false,
                status,
            },
        }
    }
}

type Accepted<T> = (StatusCode, Json<ApiResponse<T>>);

fn parse_status(request_id: &str, raw: Option<&str>) -> Result<Option<TaskStatus>, ApiError> {
    raw.map(|s| {
        s.parse::<TaskStatus>()
            .map_err(|e| ApiError::new(request_id, "validation_error", e))
    })
    .transpose()
}

// ---------------------------------------------------------------------------
// Analysis tasks
// ---------------------------------------------------------------------------

pub(super) async fn create_analysis_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(config): Json<AnalysisTaskConfig>,
) -> Result<Accepted<DispatchData>, ApiError> {
    let result = state
        .analysis
        .dispatch(config)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::new(DispatchData::from(result), req_id.0),
    ))
}

pub(super) async fn list_analysis_tasks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<Vec<AnalysisTask>>>, ApiError> {
    let status = parse_status(&req_id.0, query.status.as_deref())?;
    let tasks = state
        .analysis
        .runner()
        .list(status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(tasks, req_id.0))
}

pub(super) async fn get_analysis_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AnalysisTask>>, ApiError> {
    let task = state
        .analysis
        .runner()
        .get(id)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(task, req_id.0))
}

pub(super) async fn cancel_analysis_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CancelData>>, ApiError> {
    let outcome = state
        .analysis
        .cancel(id)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(CancelData::new(id, outcome), req_id.0))
}

// ---------------------------------------------------------------------------
// Collection tasks
// ---------------------------------------------------------------------------

pub(super) async fn create_collection_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(config): Json<CollectionTaskConfig>,
) -> Result<Accepted<DispatchData>, ApiError> {
    let result = state
        .collection
        .dispatch(config)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok((
        StatusCode::ACCEPTED,
        ApiResponse::new(DispatchData::from(result), req_id.0),
    ))
}

pub(super) async fn list_collection_tasks(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionTask>>>, ApiError> {
    let status = parse_status(&req_id.0, query.status.as_deref())?;
    let tasks = state
        .collection
        .runner()
        .list(status, normalize_limit(query.limit))
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(tasks, req_id.0))
}

pub(super) async fn get_collection_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CollectionTask>>, ApiError> {
    let task = state
        .collection
        .runner()
        .get(id)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(task, req_id.0))
}

pub(super) async fn cancel_collection_task(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CancelData>>, ApiError> {
    let outcome = state
        .collection
        .cancel(id)
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(CancelData::new(id, outcome), req_id.0))
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

pub(super) async fn get_task_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<ApiResponse<TaskSummary>>, ApiError> {
    let latest = query
        .latest
        .unwrap_or(DEFAULT_SUMMARY_LATEST)
        .clamp(1, MAX_SUMMARY_LATEST);
    let summary = task_summary(&state.store, usize::try_from(latest).unwrap_or(10))
        .await
        .map_err(|e| map_task_error(req_id.0.clone(), &e))?;
    Ok(ApiResponse::new(summary, req_id.0))
}
