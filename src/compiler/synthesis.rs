/// Boundary IO synthesis
///
/// Recomputes a workflow's input/output lists from its operator graph and link
/// set. A connector that no internal link feeds (or drains) is promoted to a
/// workflow-level boundary port; connectors already satisfied internally never
/// appear at the boundary. Synthesis is idempotent: existing ports are matched
/// by (operator, connector) and reused verbatim, so re-running on an unchanged
/// graph returns bit-identical results.

use crate::catalog::types::{ItemKind, Workflow, WorkflowIo};
use crate::compiler::ItemIndex;
use crate::error::Result;

/// Horizontal offset applied when placing a synthesized port next to the
/// connector it exposes.
const INPUT_OFFSET: i32 = -200;
const OUTPUT_OFFSET: i32 = 200;

/// Derive the boundary input and output lists for `workflow`.
///
/// Referenced items are resolved through the supplied index; a missing item is
/// a NotFound error. The returned lists fully replace the persisted ones.
pub fn synthesize_io(workflow: &Workflow, items: &ItemIndex) -> Result<(Vec<WorkflowIo>, Vec<WorkflowIo>)> {
    Ok((synthesize_inputs(workflow, items)?, synthesize_outputs(workflow, items)?))
}

fn synthesize_inputs(workflow: &Workflow, items: &ItemIndex) -> Result<Vec<WorkflowIo>> {
    let mut ios = Vec::new();

    for operator in &workflow.operators {
        match operator.kind {
            ItemKind::Component => {
                let component = items.component(operator.item_id)?;
                for io in &component.inputs {
                    if input_is_unused(workflow, operator.id, io.id) {
                        ios.push(reuse_or_synthesize(
                            &workflow.inputs,
                            io.io_type,
                            operator.id,
                            io.id,
                            io.pos_x + INPUT_OFFSET,
                            io.pos_y,
                        ));
                    }
                }
            }
            ItemKind::Workflow => {
                let nested = items.workflow(operator.item_id)?;
                for io in &nested.inputs {
                    // constant-valued nested inputs are internal, never promoted
                    if !io.constant && input_is_unused(workflow, operator.id, io.id) {
                        ios.push(reuse_or_synthesize(
                            &workflow.inputs,
                            io.io_type,
                            operator.id,
                            io.id,
                            io.pos_x + INPUT_OFFSET,
                            io.pos_y,
                        ));
                    }
                }
            }
        }
    }

    Ok(ios)
}

fn synthesize_outputs(workflow: &Workflow, items: &ItemIndex) -> Result<Vec<WorkflowIo>> {
    let mut ios = Vec::new();

    for operator in &workflow.operators {
        match operator.kind {
            ItemKind::Component => {
                let component = items.component(operator.item_id)?;
                for io in &component.outputs {
                    if output_is_unused(workflow, operator.id, io.id) {
                        ios.push(reuse_or_synthesize(
                            &workflow.outputs,
                            io.io_type,
                            operator.id,
                            io.id,
                            io.pos_x + OUTPUT_OFFSET,
                            io.pos_y,
                        ));
                    }
                }
            }
            ItemKind::Workflow => {
                let nested = items.workflow(operator.item_id)?;
                for io in &nested.outputs {
                    if output_is_unused(workflow, operator.id, io.id) {
                        ios.push(reuse_or_synthesize(
                            &workflow.outputs,
                            io.io_type,
                            operator.id,
                            io.id,
                            io.pos_x + OUTPUT_OFFSET,
                            io.pos_y,
                        ));
                    }
                }
            }
        }
    }

    Ok(ios)
}

/// An input connector is unused unless some link targets it from inside the
/// workflow. Links whose source is the workflow itself are boundary
/// pass-throughs from a higher nesting level and do not count.
fn input_is_unused(workflow: &Workflow, operator: uuid::Uuid, connector: uuid::Uuid) -> bool {
    !workflow.links.iter().any(|link| {
        link.to_operator == operator && link.to_connector == connector && link.from_operator != workflow.id
    })
}

/// Symmetric check for output connectors: a link draining the connector into
/// the workflow boundary does not count as internal use.
fn output_is_unused(workflow: &Workflow, operator: uuid::Uuid, connector: uuid::Uuid) -> bool {
    !workflow.links.iter().any(|link| {
        link.from_operator == operator && link.from_connector == connector && link.to_operator != workflow.id
    })
}

/// Reuse the existing boundary port for this exact (operator, connector) pair
/// if one exists, preserving its id, name and edits; otherwise synthesize a
/// fresh unnamed one.
fn reuse_or_synthesize(
    existing: &[WorkflowIo],
    io_type: crate::catalog::types::IoType,
    operator: uuid::Uuid,
    connector: uuid::Uuid,
    pos_x: i32,
    pos_y: i32,
) -> WorkflowIo {
    existing
        .iter()
        .find(|io| io.operator == operator && io.connector == connector)
        .cloned()
        .unwrap_or_else(|| WorkflowIo::synthesized(io_type, operator, connector, pos_x, pos_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{
        Component, ConstantValue, IoConnector, IoType, ItemState, WorkflowLink, WorkflowOperator,
    };
    use std::collections::HashMap;
    use uuid::Uuid;

    fn component(name: &str, inputs: Vec<IoConnector>, outputs: Vec<IoConnector>) -> Component {
        Component {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category: "Test".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            inputs,
            outputs,
            code: String::new(),
            wirings: vec![],
        }
    }

    fn connector(name: &str, pos_x: i32, pos_y: i32) -> IoConnector {
        IoConnector {
            id: Uuid::new_v4(),
            name: name.to_string(),
            io_type: IoType::Float,
            pos_x,
            pos_y,
        }
    }

    fn operator(item: &Component) -> WorkflowOperator {
        WorkflowOperator {
            id: Uuid::new_v4(),
            item_id: item.id,
            kind: ItemKind::Component,
            name: item.name.clone(),
            pos_x: 0,
            pos_y: 0,
        }
    }

    fn empty_workflow() -> Workflow {
        Workflow {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "wf".to_string(),
            description: String::new(),
            category: "Test".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            operators: vec![],
            links: vec![],
            inputs: vec![],
            outputs: vec![],
            wirings: vec![],
        }
    }

    /// Producer (one output "c") linked into consumer (one input "c"), plus a
    /// dangling extra input on the consumer.
    fn linked_pair() -> (Workflow, HashMap<Uuid, Component>) {
        let producer = component("producer", vec![], vec![connector("c", 300, 50)]);
        let consumer = component(
            "consumer",
            vec![connector("c", 600, 50), connector("threshold", 600, 90)],
            vec![],
        );

        let producer_op = operator(&producer);
        let consumer_op = operator(&consumer);

        let mut workflow = empty_workflow();
        workflow.links = vec![WorkflowLink {
            id: Uuid::new_v4(),
            from_operator: producer_op.id,
            from_connector: producer.outputs[0].id,
            to_operator: consumer_op.id,
            to_connector: consumer.inputs[0].id,
            path: vec![],
        }];
        workflow.operators = vec![producer_op, consumer_op];

        let mut components = HashMap::new();
        components.insert(producer.id, producer);
        components.insert(consumer.id, consumer);
        (workflow, components)
    }

    #[test]
    fn linked_connectors_stay_internal() {
        let (workflow, components) = linked_pair();
        let workflows = HashMap::new();
        let items = ItemIndex::new(&components, &workflows);

        let (inputs, outputs) = synthesize_io(&workflow, &items).unwrap();

        // only the unlinked "threshold" input is promoted; the linked pair is
        // fully internal
        assert_eq!(inputs.len(), 1);
        assert!(outputs.is_empty());
    }

    #[test]
    fn unused_connectors_are_promoted_with_offset() {
        let (mut workflow, components) = linked_pair();
        workflow.links.clear();
        let workflows = HashMap::new();
        let items = ItemIndex::new(&components, &workflows);

        let (inputs, outputs) = synthesize_io(&workflow, &items).unwrap();

        assert_eq!(inputs.len(), 2);
        assert_eq!(outputs.len(), 1);
        // offsets are applied relative to the exposed connector
        assert_eq!(outputs[0].pos_x, 300 + 200);
        assert_eq!(outputs[0].pos_y, 50);
        assert!(inputs.iter().any(|io| io.pos_x == 600 - 200 && io.pos_y == 50));
        // fresh ports are unnamed until a user names them
        assert!(inputs.iter().all(|io| io.name.is_none()));
    }

    #[test]
    fn boundary_pass_through_does_not_count_as_used() {
        let (mut workflow, components) = linked_pair();
        // rewrite the link so it originates at the workflow boundary itself
        workflow.links[0].from_operator = workflow.id;
        let workflows = HashMap::new();
        let items = ItemIndex::new(&components, &workflows);

        let (inputs, _) = synthesize_io(&workflow, &items).unwrap();
        // both consumer inputs are promoted: the pass-through feed comes from
        // a higher nesting level, not from inside this workflow
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn existing_ports_are_reused_verbatim() {
        let (mut workflow, components) = linked_pair();
        workflow.links.clear();
        let workflows = HashMap::new();
        let items = ItemIndex::new(&components, &workflows);

        let (mut inputs, outputs) = synthesize_io(&workflow, &items).unwrap();
        // user names one of the derived ports
        inputs[0].name = Some("series_in".to_string());
        workflow.inputs = inputs.clone();
        workflow.outputs = outputs.clone();

        let (second_inputs, second_outputs) = synthesize_io(&workflow, &items).unwrap();
        assert_eq!(second_inputs, inputs);
        assert_eq!(second_outputs, outputs);
    }

    #[test]
    fn constant_nested_inputs_are_never_promoted() {
        let mut nested = empty_workflow();
        let op_id = Uuid::new_v4();
        nested.inputs = vec![
            WorkflowIo {
                id: Uuid::new_v4(),
                name: Some("free".to_string()),
                io_type: IoType::Float,
                pos_x: 10,
                pos_y: 10,
                operator: op_id,
                connector: Uuid::new_v4(),
                constant: false,
                constant_value: None,
            },
            WorkflowIo {
                id: Uuid::new_v4(),
                name: None,
                io_type: IoType::Int,
                pos_x: 10,
                pos_y: 40,
                operator: op_id,
                connector: Uuid::new_v4(),
                constant: true,
                constant_value: Some(ConstantValue::Int(3)),
            },
        ];

        let mut parent = empty_workflow();
        parent.operators = vec![WorkflowOperator {
            id: Uuid::new_v4(),
            item_id: nested.id,
            kind: ItemKind::Workflow,
            name: "nested".to_string(),
            pos_x: 0,
            pos_y: 0,
        }];

        let components = HashMap::new();
        let mut workflows = HashMap::new();
        workflows.insert(nested.id, nested);
        let items = ItemIndex::new(&components, &workflows);

        let (inputs, _) = synthesize_io(&parent, &items).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].io_type, IoType::Float);
    }
}
