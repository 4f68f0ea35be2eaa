//! HTTP API: query surface, manual triggers and emergency stop

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use supervisor_lib::{
    views::DEFAULT_VIOLATION_HOURS, ComponentStatus, StoreError, Supervisor, SupervisorError,
};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(supervisor: Arc<Supervisor>, version: &'static str) -> Self {
        Self {
            supervisor,
            version,
        }
    }
}

/// JSON error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Forbidden(String),
    BadRequest(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorBody {
            error: message.to_string(),
            code: code.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        warn!(error = %e, "Store error while serving request");
        ApiError::Internal(e.to_string())
    }
}

impl From<SupervisorError> for ApiError {
    fn from(e: SupervisorError) -> Self {
        match e {
            SupervisorError::AgentNotFound(_) | SupervisorError::WorkerNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            SupervisorError::EmergencyStopDisabled => ApiError::Forbidden(e.to_string()),
            SupervisorError::Store(e) => e.into(),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let supervisor = &state.supervisor;
    let config = supervisor.config();
    Json(json!({
        "service": "fleet-supervisor",
        "instance": config.instance_name,
        "version": state.version,
        "workers": supervisor.registry().workers().len(),
        "agents": supervisor.registry().agents().len(),
        "check_interval_secs": config.worker_loop.interval.as_secs(),
        "supervision_interval_secs": config.agent_loop.interval.as_secs(),
        "emergency_stop_enabled": config.emergency_stop_enabled,
    }))
}

/// 200 while operational, 503 when a component (the store) is down
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.supervisor.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.supervisor.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn list_workers(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let workers = state.supervisor.workers().await?;
    Ok(Json(json!({ "total": workers.len(), "workers": workers })))
}

async fn get_worker(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.supervisor.worker(&name).await?))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let agents = state.supervisor.agents().await?;
    Ok(Json(json!({ "total": agents.len(), "agents": agents })))
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.supervisor.agent(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct ViolationQuery {
    pub hours: Option<i64>,
}

async fn list_violations(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ViolationQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let hours = query.hours.unwrap_or(DEFAULT_VIOLATION_HOURS);
    if hours < 0 {
        return Err(ApiError::BadRequest("hours must not be negative".to_string()));
    }

    let violations = state.supervisor.violations(hours).await?;
    Ok(Json(json!({
        "hours": hours,
        "total": violations.len(),
        "violations": violations,
    })))
}

/// Fleet aggregates as a flat object
async fn fleet_metrics(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.supervisor.metrics().await?))
}

async fn prometheus_metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn check_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let targets = state.supervisor.trigger_worker_check();
    info!(targets = targets, "Manual worker check queued");
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "targets": targets })),
    )
}

async fn monitor_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let targets = state.supervisor.trigger_agent_monitoring();
    info!(targets = targets, "Manual agent monitoring queued");
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "targets": targets })),
    )
}

async fn stop_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.supervisor.emergency_stop(&name).await?))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".to_string())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/workers", get(list_workers))
        .route("/workers/:name", get(get_worker))
        .route("/agents", get(list_agents))
        .route("/agents/:name", get(get_agent))
        .route("/violations", get(list_violations))
        .route("/metrics", get(fleet_metrics))
        .route("/prometheus", get(prometheus_metrics))
        .route("/check/all", post(check_all))
        .route("/monitor/all", post(monitor_all))
        .route("/stop/:name", post(stop_agent))
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
