/// Component and workflow management REST endpoints
///
/// CRUD for catalog items. Updates run through the lifecycle write guard;
/// workflow updates additionally run the compiler's update pipeline (link
/// pruning, name dedupe, boundary IO re-synthesis) before persisting, so the
/// stored inputs/outputs are always derived state.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    adapters::AdapterCatalog,
    api::error_status,
    catalog::{
        storage::CatalogStorage,
        types::{ensure_deletable, write_action, Component, ItemKind, Workflow, WriteAction},
    },
    compiler::{validate::refresh_workflow, ItemIndex},
    error::FlowError,
    runtime::{
        channel::QueuedJob,
        engine::{CodegenRequest, EngineClient},
        orchestrator::Orchestrator,
    },
};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Catalog persistence
    pub storage: CatalogStorage,
    /// Execution orchestrator
    pub orchestrator: Arc<Orchestrator>,
    /// Engine client, used directly for code generation
    pub engine: Arc<dyn EngineClient>,
    /// Read-only adapter metadata
    pub adapters: Arc<AdapterCatalog>,
    /// Inbound side of the async job channel
    pub jobs: mpsc::Sender<QueuedJob>,
}

/// Response for item creation/update operations
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub message: String,
}

/// Create catalog item management routes
pub fn create_item_routes() -> Router<AppState> {
    Router::new()
        .route("/api/components", post(create_component))
        .route("/api/components", get(list_components))
        .route("/api/components/{id}", get(get_component))
        .route("/api/components/{id}", put(update_component))
        .route("/api/components/{id}", delete(delete_component))
        .route("/api/workflows", post(create_workflow))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}", put(update_workflow))
        .route("/api/workflows/{id}", delete(delete_workflow))
}

/// Create a new component
///
/// POST /api/components
/// An empty code field is filled in by the code generator before saving.
async fn create_component(
    State(state): State<AppState>,
    Json(mut component): Json<Component>,
) -> Result<Json<ItemResponse>, StatusCode> {
    if component.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.storage.get_component(component.id).await {
        Ok(Some(_)) => return Err(StatusCode::CONFLICT),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("failed to check component {}: {}", component.id, e);
            return Err(error_status(&e));
        }
    }

    if component.code.is_empty() {
        component.code = state
            .engine
            .generate_code(&CodegenRequest::for_component(&component))
            .await
            .map_err(|e| {
                tracing::error!("code generation failed for {}: {}", component.id, e);
                error_status(&e)
            })?;
    }

    state.storage.save_component(&component).await.map_err(|e| {
        tracing::error!("failed to save component: {}", e);
        error_status(&e)
    })?;

    tracing::info!("created component {} ({})", component.id, component.name);
    Ok(Json(ItemResponse {
        id: component.id,
        message: format!("Component '{}' created successfully", component.name),
    }))
}

/// GET /api/components
async fn list_components(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_components().await {
        Ok(components) => Ok(Json(json!({ "components": components }))),
        Err(e) => {
            tracing::error!("failed to list components: {}", e);
            Err(error_status(&e))
        }
    }
}

/// GET /api/components/:id
async fn get_component(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Component>, StatusCode> {
    match state.storage.get_component(id).await {
        Ok(Some(component)) => Ok(Json(component)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("failed to get component {}: {}", id, e);
            Err(error_status(&e))
        }
    }
}

/// Update a component
///
/// PUT /api/components/:id
/// RELEASED components only accept the transition to DISABLED. An IO
/// signature change (or still-empty code) triggers code regeneration.
async fn update_component(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut incoming): Json<Component>,
) -> Result<Json<Component>, StatusCode> {
    incoming.id = id;

    let existing = state
        .storage
        .get_component(id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    let action = write_action(existing.state, incoming.state, "component", id).map_err(|e| {
        tracing::error!("{}", e);
        error_status(&e)
    })?;

    let updated = match action {
        WriteAction::Merge => {
            if incoming.code.is_empty() || existing.io_signature_changed(&incoming) {
                incoming.code = state
                    .engine
                    .generate_code(&CodegenRequest::for_component(&incoming))
                    .await
                    .map_err(|e| {
                        tracing::error!("code generation failed for {}: {}", id, e);
                        error_status(&e)
                    })?;
            }
            incoming
        }
        WriteAction::Disable => {
            let mut disabled = existing;
            disabled.state = crate::catalog::types::ItemState::Disabled;
            disabled
        }
        WriteAction::Noop => existing,
    };

    state.storage.save_component(&updated).await.map_err(|e| {
        tracing::error!("failed to save component: {}", e);
        error_status(&e)
    })?;

    tracing::info!("updated component {}", id);
    Ok(Json(updated))
}

/// DELETE /api/components/:id (DRAFT and DISABLED only)
async fn delete_component(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    let component = state
        .storage
        .get_component(id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    ensure_deletable(component.state, "component", id).map_err(|e| {
        tracing::error!("{}", e);
        error_status(&e)
    })?;

    state.storage.delete_component(id).await.map_err(|e| {
        tracing::error!("failed to delete component: {}", e);
        error_status(&e)
    })?;

    tracing::info!("deleted component {}", id);
    Ok(Json(json!({ "message": "Component deleted successfully" })))
}

/// POST /api/workflows
async fn create_workflow(
    State(state): State<AppState>,
    Json(workflow): Json<Workflow>,
) -> Result<Json<ItemResponse>, StatusCode> {
    if workflow.name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    match state.storage.get_workflow(workflow.id).await {
        Ok(Some(_)) => return Err(StatusCode::CONFLICT),
        Ok(None) => {}
        Err(e) => {
            tracing::error!("failed to check workflow {}: {}", workflow.id, e);
            return Err(error_status(&e));
        }
    }

    state.storage.save_workflow(&workflow).await.map_err(|e| {
        tracing::error!("failed to save workflow: {}", e);
        error_status(&e)
    })?;

    tracing::info!("created workflow {} ({})", workflow.id, workflow.name);
    Ok(Json(ItemResponse {
        id: workflow.id,
        message: format!("Workflow '{}' created successfully", workflow.name),
    }))
}

/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    match state.storage.list_workflows().await {
        Ok(workflows) => Ok(Json(json!({ "workflows": workflows }))),
        Err(e) => {
            tracing::error!("failed to list workflows: {}", e);
            Err(error_status(&e))
        }
    }
}

/// GET /api/workflows/:id
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Workflow>, StatusCode> {
    match state.storage.get_workflow(id).await {
        Ok(Some(workflow)) => Ok(Json(workflow)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("failed to get workflow {}: {}", id, e);
            Err(error_status(&e))
        }
    }
}

/// Update a workflow
///
/// PUT /api/workflows/:id
/// Runs the full update pipeline: write guard, link pruning, operator-name
/// dedupe and boundary IO re-synthesis. The response carries the refreshed
/// workflow including its derived inputs/outputs.
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut incoming): Json<Workflow>,
) -> Result<Json<Workflow>, StatusCode> {
    incoming.id = id;

    let existing = state
        .storage
        .get_workflow(id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    let action = write_action(existing.state, incoming.state, "workflow", id).map_err(|e| {
        tracing::error!("{}", e);
        error_status(&e)
    })?;

    let updated = match action {
        WriteAction::Merge => {
            refresh_incoming_workflow(&state.storage, &mut incoming).await.map_err(|e| {
                tracing::error!("workflow refresh failed for {}: {}", id, e);
                error_status(&e)
            })?;
            incoming
        }
        WriteAction::Disable => {
            let mut disabled = existing;
            disabled.state = crate::catalog::types::ItemState::Disabled;
            disabled
        }
        WriteAction::Noop => existing,
    };

    state.storage.save_workflow(&updated).await.map_err(|e| {
        tracing::error!("failed to save workflow: {}", e);
        error_status(&e)
    })?;

    tracing::info!("updated workflow {}", id);
    Ok(Json(updated))
}

/// Fetch the items referenced by the workflow's operators and run the
/// compiler's update pipeline on it.
async fn refresh_incoming_workflow(
    storage: &CatalogStorage,
    workflow: &mut Workflow,
) -> Result<(), FlowError> {
    let component_ids: Vec<Uuid> = workflow
        .operators
        .iter()
        .filter(|op| op.kind == ItemKind::Component)
        .map(|op| op.item_id)
        .collect();
    let workflow_ids: Vec<Uuid> = workflow
        .operators
        .iter()
        .filter(|op| op.kind == ItemKind::Workflow)
        .map(|op| op.item_id)
        .collect();

    let components = storage.get_components_by_ids(&component_ids).await?;
    let workflows = storage.get_workflows_by_ids(&workflow_ids).await?;
    let items = ItemIndex::new(&components, &workflows);

    refresh_workflow(workflow, &items)
}

/// DELETE /api/workflows/:id (DRAFT and DISABLED only)
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    let workflow = state
        .storage
        .get_workflow(id)
        .await
        .map_err(|e| error_status(&e))?
        .ok_or(StatusCode::NOT_FOUND)?;

    ensure_deletable(workflow.state, "workflow", id).map_err(|e| {
        tracing::error!("{}", e);
        error_status(&e)
    })?;

    state.storage.delete_workflow(id).await.map_err(|e| {
        tracing::error!("failed to delete workflow: {}", e);
        error_status(&e)
    })?;

    tracing::info!("deleted workflow {}", id);
    Ok(Json(json!({ "message": "Workflow deleted successfully" })))
}
