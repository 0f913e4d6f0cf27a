//! HTTP surface
//!
//! `POST /run` drives one pipeline per request on a blocking worker.
//! `GET /health` and `GET /metrics` report liveness and counters.

use crate::config::types::{ExecError, ExecutionRequest, ExecutionResponse};
use crate::exec::Orchestrator;
use crate::observability::metrics::PipelineMetrics;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

const INVALID_REQUEST_FORMAT: &str = "Invalid request format";
const UNSUPPORTED_LANGUAGE: &str = "Unsupported language";

/// Body of `POST /run`. Every field must be present.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub code: String,
    pub language: String,
    pub test_input: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    started_at: DateTime<Utc>,
}

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<PipelineMetrics>,
    started_at: DateTime<Utc>,
}

struct RejectedRequest(&'static str);

impl IntoResponse for RejectedRequest {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.0 }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            state: AppState {
                orchestrator: Arc::new(orchestrator),
                metrics: Arc::new(PipelineMetrics::new()),
                started_at: Utc::now(),
            },
        }
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        Arc::clone(&self.state.metrics)
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/run", post(run_code))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until ctrl-c
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        log::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn run_code(
    State(state): State<AppState>,
    payload: Result<Json<RunRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            log::debug!("Rejected run request: {}", rejection.body_text());
            state.metrics.record_rejection();
            return RejectedRequest(INVALID_REQUEST_FORMAT).into_response();
        }
    };

    let request = match ExecutionRequest::new(&body.code, &body.language, &body.test_input) {
        Ok(request) => request,
        Err(e) => {
            log::debug!("Rejected run request: {}", e);
            state.metrics.record_rejection();
            let message = match e {
                ExecError::UnsupportedLanguage(_) => UNSUPPORTED_LANGUAGE,
                _ => INVALID_REQUEST_FORMAT,
            };
            return RejectedRequest(message).into_response();
        }
    };

    let started = Instant::now();
    let active = state.metrics.active_executions.track();
    let orchestrator = Arc::clone(&state.orchestrator);
    let joined = tokio::task::spawn_blocking(move || orchestrator.execute(&request)).await;
    drop(active);

    let outcome = joined.unwrap_or_else(|e| {
        Err(ExecError::Process(format!("pipeline worker failed: {}", e)))
    });

    match outcome {
        Ok(result) => {
            state.metrics.record_result(&result, started.elapsed());
            (StatusCode::OK, Json(ExecutionResponse::from(&result))).into_response()
        }
        Err(e) => {
            state.metrics.record_infrastructure_error(started.elapsed());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExecutionResponse::failure(&e)),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        started_at: state.started_at,
    })
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.export_prometheus(),
    )
}
