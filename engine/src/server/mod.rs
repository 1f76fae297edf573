//! HTTP API
//!
//! Exposes the orchestrator over HTTP with axum:
//!
//! - `GET /` service info
//! - `GET /health` credential health report
//! - `POST /task` run a task, condensed [`TaskSummary`]
//! - `POST /task/full` run a task, full [`TaskResult`]
//!
//! Request bodies are `{"task": "...", "retry_on_failure": false}`. A task
//! outside 3..=1000 characters is rejected with 422 and
//! `{"error": ..., "hint": ...}`.

use crate::conductor::{Orchestrator, TaskResult, TaskSummary};
use crate::health::HealthReport;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::errors::{EngineError, ErrorExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub const MIN_TASK_CHARS: usize = 3;
pub const MAX_TASK_CHARS: usize = 1000;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub health: HealthReport,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, health: HealthReport) -> Self {
        Self {
            orchestrator,
            health,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    #[serde(default)]
    pub retry_on_failure: bool,
}

impl TaskRequest {
    fn validate(&self) -> Result<(), EngineError> {
        let chars = self.task.trim().chars().count();
        if chars < MIN_TASK_CHARS {
            return Err(EngineError::InvalidTask(format!(
                "Task must be at least {} characters",
                MIN_TASK_CHARS
            )));
        }
        if chars > MAX_TASK_CHARS {
            return Err(EngineError::InvalidTask(format!(
                "Task must be at most {} characters",
                MAX_TASK_CHARS
            )));
        }
        Ok(())
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/task", post(task_handler))
        .route("/task/full", post(task_full_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `addr` until ctrl-c
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| EngineError::Network(format!("Failed to get local address: {}", e)))?;
    tracing::info!("API server listening on http://{}", local_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("API server shutting down gracefully");
        })
        .await
        .map_err(|e| EngineError::Network(format!("API server error: {}", e)))
}

async fn index_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "opsagent",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_HASH"),
        "endpoints": {
            "health": "GET /health",
            "task": "POST /task",
            "task_full": "POST /task/full"
        }
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.clone())
}

async fn task_handler(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskSummary>, Response> {
    let result = run_task(&state, request).await?;
    Ok(Json(result.summary()))
}

async fn task_full_handler(
    State(state): State<AppState>,
    Json(request): Json<TaskRequest>,
) -> Result<Json<TaskResult>, Response> {
    let result = run_task(&state, request).await?;
    Ok(Json(result))
}

async fn run_task(state: &AppState, request: TaskRequest) -> Result<TaskResult, Response> {
    request.validate().map_err(|e| {
        tracing::debug!("Rejected task request: {}", e);
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string(), "hint": e.user_hint() })),
        )
            .into_response()
    })?;

    Ok(state
        .orchestrator
        .run(request.task.trim(), request.retry_on_failure)
        .await)
}
