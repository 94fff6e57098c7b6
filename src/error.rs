/// Error taxonomy for the flowsmith core
///
/// Structural and validation errors (not-found, write guard, graph resolution)
/// are raised synchronously to the caller and never retried. Engine errors are
/// mapped at the dispatch seam; the async job channel converts every failure
/// into a result envelope instead of propagating.

use uuid::Uuid;

/// Typed errors shared by the catalog, compiler and runtime layers.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("component not found: {0}")]
    ComponentNotFound(Uuid),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("wiring not found: {0}")]
    WiringNotFound(Uuid),

    /// Mutation attempted on a RELEASED (or terminal DISABLED) item.
    #[error("{kind} {id} is not writeable in its current state")]
    NotWriteable { kind: &'static str, id: Uuid },

    /// Graph resolution failure during plan compilation: a dangling
    /// operator/connector reference or a cyclic workflow nesting.
    #[error("invalid execution request: {0}")]
    ExecutionRequest(String),

    /// Downstream engine unreachable, non-2xx, or malformed response.
    #[error("engine call failed: {0}")]
    Engine(String),

    /// A wiring filter value that can be stored neither as JSON nor as a raw
    /// string. Practically unreachable since raw-string is always a valid
    /// fallback; kept so the failure mode has a name.
    #[error("wiring filter not storable: {0}")]
    WiringFilter(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlowError {
    /// Stable machine-readable code, used in async result envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::ComponentNotFound(_) => "COMPONENT_NOT_FOUND",
            FlowError::WorkflowNotFound(_) => "WORKFLOW_NOT_FOUND",
            FlowError::WiringNotFound(_) => "WIRING_NOT_FOUND",
            FlowError::NotWriteable { .. } => "NOT_WRITEABLE",
            FlowError::ExecutionRequest(_) => "EXECUTION_REQUEST",
            FlowError::Engine(_) => "ENGINE",
            FlowError::WiringFilter(_) => "WIRING_FILTER",
            FlowError::Storage(_) => "STORAGE",
            FlowError::Serialization(_) => "SERIALIZATION",
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
