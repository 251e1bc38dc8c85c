mod maintenance;
mod rank;
mod tasks;
mod workers;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use hirescreen_db::ScreeningStore;
use hirescreen_matching::ScoringConfig;
use hirescreen_tasks::{AnalysisService, CollectionService, ReferenceData, TaskError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{request_id, require_bearer_auth, AuthState, RequestId};

pub type Store = dyn ScreeningStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub analysis: Arc<AnalysisService<Store>>,
    pub collection: Arc<CollectionService<Store>>,
    pub reference: Arc<dyn ReferenceData>,
    pub scoring: ScoringConfig,
    pub worker_freshness: chrono::Duration,
    /// Pinged by the health route when present.
    pub pool: Option<PgPool>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Json<Self> {
        Json(Self {
            data,
            meta: ResponseMeta::new(request_id),
        })
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> usize {
    usize::try_from(limit.unwrap_or(50).clamp(1, 200)).unwrap_or(50)
}

pub(super) fn map_task_error(request_id: String, error: &TaskError) -> ApiError {
    match error {
        TaskError::NotFound { .. } | TaskError::JobNotFound(_) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        TaskError::InvalidInput(_) => ApiError::new(request_id, "validation_error", error.to_string()),
        _ => {
            tracing::error!(error = %error, "request failed");
            ApiError::new(request_id, "internal_error", "internal error")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/analysis-tasks",
            get(tasks::list_analysis_tasks).post(tasks::create_analysis_task),
        )
        .route("/api/v1/analysis-tasks/{id}", get(tasks::get_analysis_task))
        .route(
            "/api/v1/analysis-tasks/{id}/cancel",
            post(tasks::cancel_analysis_task),
        )
        .route(
            "/api/v1/collection-tasks",
            get(tasks::list_collection_tasks).post(tasks::create_collection_task),
        )
        .route(
            "/api/v1/collection-tasks/{id}",
            get(tasks::get_collection_task),
        )
        .route(
            "/api/v1/collection-tasks/{id}/cancel",
            post(tasks::cancel_collection_task),
        )
        .route("/api/v1/tasks/summary", get(tasks::get_task_summary))
        .route("/api/v1/workers", get(workers::list_workers))
        .route("/api/v1/rank", post(rank::rank))
        .route("/api/v1/maintenance/merge", post(maintenance::merge))
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

pub fn build_app(state: AppState, auth: AuthState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let Some(pool) = &state.pool else {
        return (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "in_memory",
                },
                req_id.0,
            ),
        );
    };

    match hirescreen_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            ApiResponse::new(
                HealthData {
                    status: "ok",
                    database: "ok",
                },
                req_id.0,
            ),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    req_id.0,
                ),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
