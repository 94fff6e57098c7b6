/// Execution endpoints
///
/// Synchronous execution posts a wiring (and optionally a configuration
/// override) and blocks until the engine answers. The jobs endpoint is a thin
/// shim standing in for the external queue transport: it enqueues onto the
/// bounded job channel and returns immediately; results go to the configured
/// result publisher.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::{error_status, items::AppState},
    catalog::types::Wiring,
    runtime::{
        channel::{ExecutionJob, QueuedJob},
        engine::ExecutionResponse,
        orchestrator::RunConfig,
    },
};

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub wiring: Wiring,
    #[serde(default)]
    pub configuration: Option<RunConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQuery {
    #[serde(default)]
    pub run_pure_plot_operators: bool,
}

/// Enqueue request for the async job shim.
#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub key: String,
    pub job: ExecutionJob,
}

/// Create execution routes
pub fn create_execution_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows/{id}/execute", post(execute_workflow))
        .route("/api/components/{id}/execute", post(execute_component))
        .route("/api/jobs", post(enqueue_job))
}

/// POST /api/workflows/:id/execute
async fn execute_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExecuteQuery>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResponse>, StatusCode> {
    let start = std::time::Instant::now();
    let response = state
        .orchestrator
        .execute_workflow(
            id,
            &request.wiring,
            request.configuration.as_ref(),
            query.run_pure_plot_operators,
        )
        .await
        .map_err(|e| {
            tracing::error!("workflow execution failed for {}: {}", id, e);
            error_status(&e)
        })?;

    tracing::info!("workflow {} executed in {:?}", id, start.elapsed());
    Ok(Json(response))
}

/// POST /api/components/:id/execute
async fn execute_component(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExecuteQuery>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResponse>, StatusCode> {
    let start = std::time::Instant::now();
    let response = state
        .orchestrator
        .execute_component(id, &request.wiring, query.run_pure_plot_operators)
        .await
        .map_err(|e| {
            tracing::error!("component execution failed for {}: {}", id, e);
            error_status(&e)
        })?;

    tracing::info!("component {} executed in {:?}", id, start.elapsed());
    Ok(Json(response))
}

/// POST /api/jobs: enqueue an async execution job
///
/// Returns 202 once the job is on the channel; the worker publishes the
/// result envelope under the given key.
async fn enqueue_job(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let payload = serde_json::to_string(&request.job).map_err(|e| {
        tracing::error!("failed to serialize job: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    state
        .jobs
        .send(QueuedJob {
            key: request.key.clone(),
            payload,
        })
        .await
        .map_err(|e| {
            tracing::error!("job channel unavailable: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    tracing::info!("enqueued job {}", request.key);
    Ok((StatusCode::ACCEPTED, Json(json!({ "queued": request.key }))))
}
