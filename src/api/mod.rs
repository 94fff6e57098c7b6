/// HTTP API layer
///
/// REST endpoints for catalog management (components, workflows, wirings),
/// adapter metadata, and execution. Handlers stay thin: they run the write
/// guard and the compiler's update pipeline, then delegate to storage and the
/// orchestrator.

// Component and workflow CRUD
pub mod items;

// Wiring CRUD, wiring binds and adapter metadata
pub mod wirings;

// Synchronous execution endpoints and the async job shim
pub mod execution;

use axum::http::StatusCode;

use crate::error::FlowError;

/// Map core errors onto HTTP status codes.
pub(crate) fn error_status(err: &FlowError) -> StatusCode {
    match err {
        FlowError::ComponentNotFound(_) | FlowError::WorkflowNotFound(_) | FlowError::WiringNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        FlowError::NotWriteable { .. } => StatusCode::FORBIDDEN,
        FlowError::ExecutionRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FlowError::Engine(_) => StatusCode::BAD_GATEWAY,
        FlowError::WiringFilter(_) => StatusCode::BAD_REQUEST,
        FlowError::Storage(_) | FlowError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
