/// Workflow compiler
///
/// Everything that turns the persisted graph model into derived state and
/// executable output: boundary-IO synthesis, link-graph self-healing,
/// operator-name deduplication, the execution-plan flattener, and the wiring
/// resolver. All of it is pure code over pre-fetched items; fetching the
/// transitive closure is the orchestrator's job.

// Boundary IO derivation from the operator graph and link set
pub mod synthesis;

// Link pruning and operator-name deduplication (the workflow update pipeline)
pub mod validate;

// Execution plan IR and the recursive flattener
pub mod plan;

// Wiring <-> engine wire-format resolver
pub mod wiring;

use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::types::{Component, Workflow};
use crate::error::{FlowError, Result};

/// The root item a plan is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    Component(Uuid),
    Workflow(Uuid),
}

/// Lookup capability over the pre-fetched transitive closure of catalog
/// items.
///
/// Maps stay keyed by the persisted item id even when a draft component has
/// had a fresh id substituted, so operator references keep resolving while
/// the plan carries the substituted id.
pub struct ItemIndex<'a> {
    components: &'a HashMap<Uuid, Component>,
    workflows: &'a HashMap<Uuid, Workflow>,
}

impl<'a> ItemIndex<'a> {
    pub fn new(components: &'a HashMap<Uuid, Component>, workflows: &'a HashMap<Uuid, Workflow>) -> Self {
        Self { components, workflows }
    }

    pub fn component(&self, id: Uuid) -> Result<&'a Component> {
        self.components.get(&id).ok_or(FlowError::ComponentNotFound(id))
    }

    pub fn workflow(&self, id: Uuid) -> Result<&'a Workflow> {
        self.workflows.get(&id).ok_or(FlowError::WorkflowNotFound(id))
    }

    pub fn components(&self) -> &'a HashMap<Uuid, Component> {
        self.components
    }

    pub fn workflows(&self) -> &'a HashMap<Uuid, Workflow> {
        self.workflows
    }
}
