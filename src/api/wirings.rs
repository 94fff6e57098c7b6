/// Wiring management and adapter metadata endpoints
///
/// Wirings are created and updated independently of the items they feed, then
/// bound to components/workflows after the fact; the bind is idempotent by
/// wiring id. Adapter metadata is advisory: unknown adapter/source/sink ids
/// are logged, never rejected.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::{error_status, items::AppState},
    catalog::types::{bind_wiring, Wiring},
};

/// Bind request: only the wiring id matters, the binding references the
/// stored wiring.
#[derive(Debug, Deserialize)]
pub struct BindWiringRequest {
    pub id: Uuid,
}

/// Create wiring and adapter routes
pub fn create_wiring_routes() -> Router<AppState> {
    Router::new()
        .route("/api/wirings", post(create_wiring))
        .route("/api/wirings", get(list_wirings))
        .route("/api/wirings/{id}", put(update_wiring))
        .route("/api/components/{id}/wirings", post(bind_component_wiring))
        .route("/api/workflows/{id}/wirings", post(bind_workflow_wiring))
        .route("/api/adapters", get(list_adapters))
}

/// POST /api/wirings
async fn create_wiring(
    State(state): State<AppState>,
    Json(wiring): Json<Wiring>,
) -> Result<Json<Wiring>, StatusCode> {
    match state.storage.get_wiring(wiring.id).await {
        Ok(Some(_)) => return Err(StatusCode::CONFLICT),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("failed to check wiring {}: {}", wiring.id, e);
            return Err(error_status(&e));
        }
    }

    warn_unknown_adapter_refs(&state, &wiring);

    state.storage.save_wiring(&wiring).await.map_err(|e| {
        tracing::error!("failed to save wiring: {}", e);
        error_status(&e)
    })?;

    tracing::info!("created wiring {} ({})", wiring.id, wiring.name);
    Ok(Json(wiring))
}

/// GET /api/wirings
async fn list_wirings(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_wirings().await {
        Ok(wirings) => Ok(Json(json!({ "wirings": wirings }))),
        Err(e) => {
            tracing::error!("failed to list wirings: {}", e);
            Err(error_status(&e))
        }
    }
}

/// PUT /api/wirings/:id
async fn update_wiring(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut wiring): Json<Wiring>,
) -> Result<Json<Wiring>, StatusCode> {
    wiring.id = id;

    match state.storage.get_wiring(id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => return Err(error_status(&e)),
    }

    warn_unknown_adapter_refs(&state, &wiring);

    state.storage.save_wiring(&wiring).await.map_err(|e| {
        tracing::error!("failed to save wiring: {}", e);
        error_status(&e)
    })?;

    tracing::info!("updated wiring {}", id);
    Ok(Json(wiring))
}

/// POST /api/components/:id/wirings (idempotent bind)
async fn bind_component_wiring(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BindWiringRequest>,
) -> Result<Json<Value>, StatusCode> {
    let wiring = state
        .storage
        .get_wiring(request.id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut component = state
        .storage
        .get_component(id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    if bind_wiring(&mut component.wirings, wiring) {
        state.storage.save_component(&component).await.map_err(|e| {
            tracing::error!("failed to save component: {}", e);
            error_status(&e)
        })?;
        tracing::info!("bound wiring {} to component {}", request.id, id);
    } else {
        tracing::info!("wiring {} already bound to component {}", request.id, id);
    }

    Ok(Json(json!({ "bound": request.id })))
}

/// POST /api/workflows/:id/wirings (idempotent bind)
async fn bind_workflow_wiring(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BindWiringRequest>,
) -> Result<Json<Value>, StatusCode> {
    let wiring = state
        .storage
        .get_wiring(request.id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    let mut workflow = state
        .storage
        .get_workflow(id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    if bind_wiring(&mut workflow.wirings, wiring) {
        state.storage.save_workflow(&workflow).await.map_err(|e| {
            tracing::error!("failed to save workflow: {}", e);
            error_status(&e)
        })?;
        tracing::info!("bound wiring {} to workflow {}", request.id, id);
    } else {
        tracing::info!("wiring {} already bound to workflow {}", request.id, id);
    }

    Ok(Json(json!({ "bound": request.id })))
}

/// GET /api/adapters
async fn list_adapters(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "adapters": state.adapters.list() }))
}

/// Advisory check of wiring references against the adapter catalog.
fn warn_unknown_adapter_refs(state: &AppState, wiring: &Wiring) {
    for input in &wiring.input_wirings {
        if !state.adapters.knows_source(&input.adapter_id, &input.source_id) {
            tracing::warn!(
                "wiring {}: source {}/{} not present in adapter catalog",
                wiring.id,
                input.adapter_id,
                input.source_id
            );
        }
    }
    for output in &wiring.output_wirings {
        if !state.adapters.knows_sink(&output.adapter_id, &output.sink_id) {
            tracing::warn!(
                "wiring {}: sink {}/{} not present in adapter catalog",
                wiring.id,
                output.adapter_id,
                output.sink_id
            );
        }
    }
}
