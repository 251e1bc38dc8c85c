use std::collections::{BTreeMap, BTreeSet};

use axum::body::{to_bytes, Body};
use axum::http::Request;
use futures::future::BoxFuture;
use hirescreen_core::{CandidateContent, CandidateRecord};
use hirescreen_db::{CandidateStore, MemoryStore};
use hirescreen_tasks::{SampleFileHarvester, Scheduler, StaticReferenceData};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use super::*;

/// Drops every job, so dispatched tasks stay pending.
struct Parked;

impl Scheduler for Parked {
    fn run_soon(&self, _name: &'static str, _job: BoxFuture<'static, ()>) {}
}

fn app_with(memory: &Arc<MemoryStore>, auth: AuthState) -> Router {
    let store: Arc<Store> = Arc::clone(memory) as Arc<Store>;
    let reference: Arc<dyn ReferenceData> = Arc::new(StaticReferenceData::default());
    let analysis = Arc::new(AnalysisService::new(
        Arc::clone(&store),
        Arc::clone(&reference),
        Arc::new(Parked),
    ));
    let collection = Arc::new(CollectionService::new(
        Arc::clone(&store),
        Arc::new(SampleFileHarvester::new("/nonexistent")),
        Arc::clone(&reference),
    ));
    let state = AppState {
        store,
        analysis,
        collection,
        reference,
        scoring: ScoringConfig::default(),
        worker_freshness: chrono::Duration::seconds(60),
        pool: None,
    };
    build_app(state, auth)
}

fn app(memory: &Arc<MemoryStore>) -> Router {
    app_with(memory, AuthState::disabled())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

async fn seed(memory: &MemoryStore, id: u128, intention: &str) -> Uuid {
    let now = Utc::now();
    let record = CandidateRecord {
        id: Uuid::from_u128(id),
        external_id: format!("ext-{id}"),
        identity_key: format!("ext:ext-{id}"),
        content: CandidateContent {
            intention: Some(intention.into()),
            ..CandidateContent::default()
        },
        content_hash: String::new(),
        structured: None,
        tags: BTreeSet::new(),
        analyses: BTreeMap::new(),
        crawled_at: now,
        created_at: now,
        updated_at: now,
    };
    memory.insert_candidate(&record).await.expect("seed candidate");
    record.id
}

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_validation_error_maps_to_bad_request() {
    let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_in_memory_store_and_echoes_request_id() {
    let memory = Arc::new(MemoryStore::new());
    let response = app(&memory)
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
        Some("req-42")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json: Value = serde_json::from_slice(&body).expect("json parse");
    assert_eq!(json["data"]["database"], "in_memory");
    assert_eq!(json["meta"]["request_id"], "req-42");
}

#[tokio::test]
async fn protected_routes_require_bearer_token_when_enabled() {
    let memory = Arc::new(MemoryStore::new());
    let app = app_with(&memory, AuthState::with_keys(vec!["secret".into()]));

    let (status, body) = send(&app, "GET", "/api/v1/workers", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/workers")
                .header("authorization", "Bearer secret")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn analysis_task_lifecycle_over_http() {
    let memory = Arc::new(MemoryStore::new());
    let app = app(&memory);
    let candidate = seed(&memory, 1, "rust developer").await;
    let body = json!({ "keywords": ["rust"], "candidate_ids": [candidate] });

    let (status, created) = send(&app, "POST", "/api/v1/analysis-tasks", Some(body.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(created["data"]["created"], true);
    let task_id = created["data"]["task_id"].as_str().expect("task id").to_string();

    let (status, again) = send(&app, "POST", "/api/v1/analysis-tasks", Some(body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(again["data"]["created"], false);
    assert_eq!(again["data"]["task_id"], task_id.as_str());

    let (status, task) = send(&app, "GET", &format!("/api/v1/analysis-tasks/{task_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["data"]["status"], "pending");
    assert_eq!(task["data"]["progress"]["total"], 1);

    let (_, listed) = send(&app, "GET", "/api/v1/analysis-tasks?status=pending", None).await;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

    let cancel_uri = format!("/api/v1/analysis-tasks/{task_id}/cancel");
    let (status, cancelled) = send(&app, "POST", &cancel_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["cancelled"], true);

    let (_, repeat) = send(&app, "POST", &cancel_uri, None).await;
    assert_eq!(repeat["data"]["cancelled"], false);
    assert_eq!(repeat["data"]["status"], "cancelled");
}

#[tokio::test]
async fn invalid_requests_map_to_client_errors() {
    let memory = Arc::new(MemoryStore::new());
    let app = app(&memory);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/analysis-tasks",
        Some(json!({ "keywords": ["rust"], "candidate_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = send(&app, "GET", "/api/v1/analysis-tasks?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/analysis-tasks/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/collection-tasks",
        Some(json!({ "keyword": "销售", "limit": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collection_tasks_feed_the_summary() {
    let memory = Arc::new(MemoryStore::new());
    let app = app(&memory);

    let (status, created) = send(
        &app,
        "POST",
        "/api/v1/collection-tasks",
        Some(json!({ "keyword": "销售", "location": "上海", "limit": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let task_id = created["data"]["task_id"].as_str().expect("task id").to_string();

    let (_, listed) = send(&app, "GET", "/api/v1/collection-tasks", None).await;
    assert_eq!(listed["data"][0]["config"]["keyword"], "销售");

    let (_, summary) = send(&app, "GET", "/api/v1/tasks/summary?latest=5", None).await;
    assert_eq!(summary["data"]["collection"]["total"], 1);
    assert_eq!(summary["data"]["collection"]["by_status"]["pending"], 1);
    assert_eq!(summary["data"]["collection"]["latest"][0]["id"], task_id.as_str());
    assert_eq!(summary["data"]["analysis"]["total"], 0);
}

#[tokio::test]
async fn rank_and_merge_run_inline() {
    let memory = Arc::new(MemoryStore::new());
    let app = app(&memory);
    let strong = seed(&memory, 1, "rust sql engineer").await;
    seed(&memory, 2, "accountant").await;

    let (status, ranked) = send(
        &app,
        "POST",
        "/api/v1/rank",
        Some(json!({ "keywords": ["rust", "sql"], "top_k": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = ranked["data"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["resume_id"], strong.to_string());

    let (status, report) = send(&app, "POST", "/api/v1/maintenance/merge", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["data"]["dry_run"], false);
    assert_eq!(report["data"]["scanned"], 2);
    assert_eq!(report["data"]["groups"].as_array().map(Vec::len), Some(0));
}
