/// Execution plan compiler
///
/// Flattens an arbitrarily deep nested graph of components/workflows into the
/// intermediate representation consumed by the external execution engine: code
/// modules, per-component metadata, a recursive node tree, configuration and
/// resolved wiring. Compilation is pure over the pre-fetched closure; nothing
/// here touches storage.

use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::types::{
    Component, ConstantValue, IoConnector, IoType, ItemKind, ItemState, Wiring, Workflow, WorkflowIo,
    WorkflowOperator,
};
use crate::compiler::wiring::{to_wire_format, WireWiring};
use crate::compiler::{ItemIndex, ItemRef};
use crate::error::{FlowError, Result};

const ENGINE: &str = "plain";

/// The compiled execution plan, serialized as the engine request payload.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionPlan {
    pub code_modules: Vec<CodeModule>,
    pub components: Vec<PlanComponent>,
    pub node: WorkflowNode,
    pub configuration: PlanConfiguration,
    pub wiring: WireWiring,
}

/// Source blob of one distinct component referenced by the plan.
#[derive(Debug, Clone, Serialize)]
pub struct CodeModule {
    pub id: Uuid,
    pub code: String,
}

/// Per-component metadata entry.
#[derive(Debug, Clone, Serialize)]
pub struct PlanComponent {
    pub id: Uuid,
    pub inputs: Vec<IoConnector>,
    pub outputs: Vec<IoConnector>,
    pub code_module_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanConfiguration {
    /// Correlates the plan with the item it was compiled for. Serialized as
    /// `name`, matching the async channel's configuration block.
    #[serde(rename = "name")]
    pub plan_id: Uuid,
    pub engine: String,
    pub run_pure_plot_operators: bool,
}

/// A node of the flattened tree: either a compiled nested workflow or a leaf
/// component instance.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PlanNode {
    Workflow(WorkflowNode),
    Component(ComponentNode),
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowNode {
    pub id: Uuid,
    pub inputs: Vec<NodeIo>,
    pub outputs: Vec<NodeIo>,
    pub connections: Vec<Connection>,
    pub sub_nodes: Vec<PlanNode>,
}

/// Leaf node: one operator instantiating a component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentNode {
    pub id: Uuid,
    pub component_id: Uuid,
    pub inputs: Vec<IoConnector>,
    pub outputs: Vec<IoConnector>,
}

/// A boundary port resolved against the sub-node it is attached to.
#[derive(Debug, Clone, Serialize)]
pub struct NodeIo {
    pub id: Uuid,
    pub name: Option<String>,
    pub io_type: IoType,
    pub pos_x: i32,
    pub pos_y: i32,
    pub id_of_sub_node: Uuid,
    pub name_in_subnode: String,
    pub constant: bool,
    pub constant_value: Option<ConstantValue>,
}

/// An internal link resolved to human-readable names on both ends. Links
/// touching the boundary are represented via `inputs`/`outputs`, never here.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub from_operator: Uuid,
    pub from_connector: Uuid,
    pub from_connector_name: String,
    pub to_operator: Uuid,
    pub to_connector: Uuid,
    pub to_connector_name: String,
}

/// Compile `root` into an execution plan.
///
/// `items` must hold the transitive closure of everything reachable from the
/// root; a missing item is a NotFound error, an unresolvable connector or a
/// cyclic workflow nesting is an ExecutionRequest error.
pub fn compile(
    root: ItemRef,
    wiring: &Wiring,
    items: &ItemIndex,
    run_pure_plot_operators: bool,
) -> Result<ExecutionPlan> {
    let (plan_id, node) = match root {
        ItemRef::Workflow(id) => {
            let workflow = items.workflow(id)?;
            check_reference_cycles(items)?;
            let mut visited = Vec::new();
            (id, compile_node(Uuid::new_v4(), workflow, items, &mut visited)?)
        }
        ItemRef::Component(id) => {
            let component = items.component(id)?;
            let wrapper = wrap_component(id, component);
            let mut visited = Vec::new();
            (id, compile_node(Uuid::new_v4(), &wrapper, items, &mut visited)?)
        }
    };

    let (code_modules, components) = plan_components(items);

    Ok(ExecutionPlan {
        code_modules,
        components,
        node,
        configuration: PlanConfiguration {
            plan_id,
            engine: ENGINE.to_string(),
            run_pure_plot_operators,
        },
        wiring: to_wire_format(wiring),
    })
}

/// Validate the workflow-reference graph of the closure before flattening.
/// Any cycle would otherwise recurse without bound.
fn check_reference_cycles(items: &ItemIndex) -> Result<()> {
    let mut graph = DiGraph::<Uuid, ()>::new();
    let mut indices = HashMap::new();

    for id in items.workflows().keys() {
        indices.insert(*id, graph.add_node(*id));
    }
    for (id, workflow) in items.workflows() {
        for operator in &workflow.operators {
            if operator.kind == ItemKind::Workflow {
                if let Some(child) = indices.get(&operator.item_id) {
                    graph.add_edge(indices[id], *child, ());
                }
            }
        }
    }

    toposort(&graph, None)
        .map(|_| ())
        .map_err(|_| FlowError::ExecutionRequest("workflow reference graph contains a cycle".to_string()))
}

fn compile_node(node_id: Uuid, workflow: &Workflow, items: &ItemIndex, visited: &mut Vec<Uuid>) -> Result<WorkflowNode> {
    if visited.contains(&workflow.id) {
        return Err(FlowError::ExecutionRequest(format!(
            "cyclic workflow reference: {}",
            workflow.id
        )));
    }
    visited.push(workflow.id);

    let inputs = workflow
        .inputs
        .iter()
        .map(|io| node_io(io, &workflow.operators, items))
        .collect::<Result<Vec<_>>>()?;
    let outputs = workflow
        .outputs
        .iter()
        .map(|io| node_io(io, &workflow.operators, items))
        .collect::<Result<Vec<_>>>()?;

    let mut connections = Vec::new();
    for link in &workflow.links {
        let from_live = workflow.operators.iter().any(|op| op.id == link.from_operator);
        let to_live = workflow.operators.iter().any(|op| op.id == link.to_operator);
        // boundary-touching links are carried by inputs/outputs instead
        if !(from_live && to_live) {
            continue;
        }
        connections.push(Connection {
            from_operator: link.from_operator,
            from_connector: link.from_connector,
            from_connector_name: io_name(link.from_operator, link.from_connector, &workflow.operators, items)?,
            to_operator: link.to_operator,
            to_connector: link.to_connector,
            to_connector_name: io_name(link.to_operator, link.to_connector, &workflow.operators, items)?,
        });
    }

    let mut sub_nodes = Vec::new();
    for operator in &workflow.operators {
        match operator.kind {
            ItemKind::Component => {
                let component = items.component(operator.item_id)?;
                sub_nodes.push(PlanNode::Component(ComponentNode {
                    id: operator.id,
                    component_id: component.id,
                    inputs: component.inputs.clone(),
                    outputs: component.outputs.clone(),
                }));
            }
            ItemKind::Workflow => {
                let nested = items.workflow(operator.item_id)?;
                sub_nodes.push(PlanNode::Workflow(compile_node(operator.id, nested, items, visited)?));
            }
        }
    }

    visited.pop();

    Ok(WorkflowNode {
        id: node_id,
        inputs,
        outputs,
        connections,
        sub_nodes,
    })
}

fn node_io(io: &WorkflowIo, operators: &[WorkflowOperator], items: &ItemIndex) -> Result<NodeIo> {
    Ok(NodeIo {
        id: io.id,
        name: io.name.clone(),
        io_type: io.io_type,
        pos_x: io.pos_x,
        pos_y: io.pos_y,
        id_of_sub_node: io.operator,
        name_in_subnode: io_name(io.operator, io.connector, operators, items)?,
        constant: io.constant,
        constant_value: io.constant_value.clone(),
    })
}

/// Resolve a (operator, connector) pair to the connector's name in the
/// referenced sub-item's own IO lists: component connectors by connector id,
/// nested-workflow boundary ports by port id.
fn io_name(operator_id: Uuid, connector_id: Uuid, operators: &[WorkflowOperator], items: &ItemIndex) -> Result<String> {
    let operator = operators
        .iter()
        .find(|op| op.id == operator_id)
        .ok_or_else(|| FlowError::ExecutionRequest(format!("operator {} not found in workflow", operator_id)))?;

    match operator.kind {
        ItemKind::Component => {
            let component = items.component(operator.item_id)?;
            component
                .inputs
                .iter()
                .chain(component.outputs.iter())
                .find(|io| io.id == connector_id)
                .map(|io| io.name.clone())
                .ok_or_else(|| connector_error(operator_id, connector_id))
        }
        ItemKind::Workflow => {
            let nested = items.workflow(operator.item_id)?;
            nested
                .inputs
                .iter()
                .chain(nested.outputs.iter())
                .find(|io| io.id == connector_id)
                .and_then(|io| io.name.clone())
                .ok_or_else(|| connector_error(operator_id, connector_id))
        }
    }
}

fn connector_error(operator_id: Uuid, connector_id: Uuid) -> FlowError {
    FlowError::ExecutionRequest(format!(
        "connector {} of operator {} cannot be resolved to a named IO",
        connector_id, operator_id
    ))
}

/// Wrap a single component into a synthetic one-operator workflow so that
/// component execution shares the workflow compilation path. Every connector
/// is mirrored as a named boundary port.
fn wrap_component(item_id: Uuid, component: &Component) -> Workflow {
    let operator = WorkflowOperator {
        id: Uuid::new_v4(),
        item_id,
        kind: ItemKind::Component,
        name: component.name.clone(),
        pos_x: 0,
        pos_y: 0,
    };

    let operator_id = operator.id;
    let mirror = |io: &IoConnector| WorkflowIo {
        id: Uuid::new_v4(),
        name: Some(io.name.clone()),
        io_type: io.io_type,
        pos_x: 0,
        pos_y: 0,
        operator: operator_id,
        connector: io.id,
        constant: false,
        constant_value: None,
    };

    Workflow {
        id: Uuid::new_v4(),
        group_id: Uuid::new_v4(),
        name: component.name.clone(),
        description: String::new(),
        category: component.category.clone(),
        tag: component.tag.clone(),
        state: ItemState::Draft,
        inputs: component.inputs.iter().map(mirror).collect(),
        outputs: component.outputs.iter().map(mirror).collect(),
        operators: vec![operator],
        links: vec![],
        wirings: vec![],
    }
}

/// One code module and one metadata entry per distinct component in the
/// closure, ordered by id so plans are deterministic.
fn plan_components(items: &ItemIndex) -> (Vec<CodeModule>, Vec<PlanComponent>) {
    let mut components: Vec<&Component> = items.components().values().collect();
    components.sort_by_key(|component| component.id);

    let code_modules = components
        .iter()
        .map(|component| CodeModule {
            id: component.id,
            code: component.code.clone(),
        })
        .collect();

    let plan_components = components
        .iter()
        .map(|component| PlanComponent {
            id: component.id,
            inputs: component.inputs.clone(),
            outputs: component.outputs.clone(),
            code_module_id: component.id,
        })
        .collect();

    (code_modules, plan_components)
}
