/// Flowsmith: workflow compiler backend for composable computation graphs
///
/// This library maintains a catalog of reusable components and nested
/// workflows, derives workflow boundary IO from internal wiring, self-heals
/// the link graph, flattens arbitrarily deep nesting into execution plans,
/// and dispatches those plans to an external execution engine.

// Core configuration and setup
pub mod config;

// Typed error taxonomy shared across layers
pub mod error;

// Catalog layer - graph model, lifecycle state machine, SQLite persistence
pub mod catalog;

// Workflow compiler - IO synthesis, link validation, plan flattening, wiring
pub mod compiler;

// Adapter metadata catalog - read-only external data endpoint descriptions
pub mod adapters;

// Runtime execution layer - engine client, orchestrator, async job channel
pub mod runtime;

// HTTP API layer - REST endpoints for catalog management and execution
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use catalog::{Component, ItemKind, ItemState, Wiring, Workflow};
pub use compiler::plan::ExecutionPlan;
pub use error::{FlowError, Result};
pub use runtime::{ExecutionOutcome, ExecutionResponse, Orchestrator};
pub use server::start_server;
