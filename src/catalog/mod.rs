/// Catalog layer
///
/// Holds the persisted graph model: components, workflows, wirings, and the
/// lifecycle state machine guarding updates. Persistence is SQLite behind
/// `CatalogStorage`; everything else in the crate works on the plain types.

// Core graph model type definitions
pub mod types;

// SQLite persistence layer
pub mod storage;

// Re-export commonly used types
pub use storage::CatalogStorage;
pub use types::{
    bind_wiring, ensure_deletable, write_action, Component, ConstantValue, InputWiring, IoConnector,
    IoType, ItemKind, ItemState, OutputWiring, Wiring, Workflow, WorkflowIo, WorkflowLink,
    WorkflowOperator, WriteAction,
};
