/// Core catalog type definitions
///
/// Defines components (leaf computation units), workflows (composite graphs of
/// operators and links), their boundary IO, and the wiring bindings that
/// connect boundary ports to external data adapters. These types are
/// serialized/deserialized from JSON for persistence and for the REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{FlowError, Result};

/// Lifecycle state of a component or workflow.
///
/// DRAFT items accept arbitrary edits and deletion. Once RELEASED, the only
/// permitted mutation is the transition to DISABLED; DISABLED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    Draft,
    Released,
    Disabled,
}

/// What a workflow operator instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Component,
    Workflow,
}

/// Data type carried by a connector or boundary port.
///
/// DataFrame/Series payloads are opaque to the compiler; only the engine
/// interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IoType {
    Int,
    Float,
    Bool,
    String,
    DataFrame,
    Series,
    Any,
}

/// A typed literal bound to a constant workflow input.
///
/// Tagged over the known IO types with a raw-JSON fallback; resolved once at
/// the boundary instead of re-inspected ad hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstantValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(Value),
}

/// A named, typed connector on a component (input or output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoConnector {
    pub id: Uuid,
    pub name: String,
    pub io_type: IoType,
    /// Canvas position hints, used to place auto-derived boundary IO.
    pub pos_x: i32,
    pub pos_y: i32,
}

/// A leaf computation unit.
///
/// Identity is `id`; `group_id` links successive tagged revisions of the same
/// logical component. The `code` blob is opaque here and only interpreted by
/// the external engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Revision tag within the group (e.g. "1.0.0").
    pub tag: String,
    pub state: ItemState,
    pub inputs: Vec<IoConnector>,
    pub outputs: Vec<IoConnector>,
    pub code: String,
    /// Adapter bindings attached to this component (many-to-many).
    #[serde(default)]
    pub wirings: Vec<Wiring>,
}

impl Component {
    /// Whether an update changes the IO signature: a connector added or
    /// removed, or an existing connector renamed or retyped. Signature changes
    /// require the component code to be regenerated.
    pub fn io_signature_changed(&self, other: &Component) -> bool {
        signature_changed(&self.inputs, &other.inputs) || signature_changed(&self.outputs, &other.outputs)
    }
}

fn signature_changed(current: &[IoConnector], incoming: &[IoConnector]) -> bool {
    let removed = current
        .iter()
        .any(|existing| !incoming.iter().any(|io| io.id == existing.id));

    let changed = incoming.iter().any(|io| {
        match current.iter().find(|existing| existing.id == io.id) {
            Some(existing) => existing.name != io.name || existing.io_type != io.io_type,
            None => true,
        }
    });

    removed || changed
}

/// An instance of a component or workflow placed as a node inside a parent
/// workflow. `id` is instance-local; `item_id` references the instantiated
/// catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOperator {
    pub id: Uuid,
    pub item_id: Uuid,
    pub kind: ItemKind,
    pub name: String,
    pub pos_x: i32,
    pub pos_y: i32,
}

/// A cosmetic waypoint on a link's rendered path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPoint {
    pub pos_x: i32,
    pub pos_y: i32,
}

/// Directed edge between two operator connectors.
///
/// Endpoints reference either a live operator in the same workflow or the
/// workflow itself (a boundary pass-through from a higher nesting level).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowLink {
    pub id: Uuid,
    pub from_operator: Uuid,
    pub from_connector: Uuid,
    pub to_operator: Uuid,
    pub to_connector: Uuid,
    #[serde(default)]
    pub path: Vec<LinkPoint>,
}

/// A boundary port of a workflow, attached to one connector of one internal
/// operator.
///
/// Boundary ports are derived state: they are recomputed wholesale from the
/// operator graph and link set on every workflow update. A freshly synthesized
/// port has no name until a user assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowIo {
    pub id: Uuid,
    pub name: Option<String>,
    pub io_type: IoType,
    pub pos_x: i32,
    pub pos_y: i32,
    /// Internal operator this port is attached to.
    pub operator: Uuid,
    /// Connector of that operator (component connector id, or nested
    /// workflow's boundary port id).
    pub connector: Uuid,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub constant_value: Option<ConstantValue>,
}

impl WorkflowIo {
    /// Fresh unnamed boundary port inheriting type and offset position from
    /// the connector it exposes.
    pub fn synthesized(io_type: IoType, operator: Uuid, connector: Uuid, pos_x: i32, pos_y: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            io_type,
            pos_x,
            pos_y,
            operator,
            connector,
            constant: false,
            constant_value: None,
        }
    }
}

/// A composite computation unit: a directed graph of operators and links with
/// derived boundary IO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub group_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub tag: String,
    pub state: ItemState,
    #[serde(default)]
    pub operators: Vec<WorkflowOperator>,
    #[serde(default)]
    pub links: Vec<WorkflowLink>,
    /// Derived boundary inputs; never directly authored.
    #[serde(default)]
    pub inputs: Vec<WorkflowIo>,
    /// Derived boundary outputs; never directly authored.
    #[serde(default)]
    pub outputs: Vec<WorkflowIo>,
    #[serde(default)]
    pub wirings: Vec<Wiring>,
}

/// Binding of one workflow input to an external adapter source, with a
/// per-source filter map. Filter values are persisted as raw strings and only
/// interpreted when resolved into the engine wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputWiring {
    pub id: Uuid,
    pub workflow_input_name: String,
    pub adapter_id: String,
    pub source_id: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

/// Binding of one workflow output to an external adapter sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputWiring {
    pub id: Uuid,
    pub workflow_output_name: String,
    pub adapter_id: String,
    pub sink_id: String,
}

/// Named, reusable set of adapter bindings. A wiring may be bound to many
/// components/workflows; binding is idempotent by wiring id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wiring {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub input_wirings: Vec<InputWiring>,
    #[serde(default)]
    pub output_wirings: Vec<OutputWiring>,
}

/// Append `wiring` to an item's binding list unless a wiring with the same id
/// is already bound. Returns whether the list changed.
pub fn bind_wiring(wirings: &mut Vec<Wiring>, wiring: Wiring) -> bool {
    if wirings.iter().any(|w| w.id == wiring.id) {
        return false;
    }
    wirings.push(wiring);
    true
}

/// Outcome of the write guard for an item update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    /// DRAFT item: take the incoming item as-is.
    Merge,
    /// RELEASED item being disabled: apply the state transition only, keep
    /// every other persisted field.
    Disable,
    /// DISABLED item re-submitted as DISABLED: nothing to do.
    Noop,
}

/// Write guard shared by the component and workflow update paths.
///
/// DRAFT accepts arbitrary edits. RELEASED accepts exactly one mutation, the
/// transition to DISABLED; anything else fails with NotWriteable. DISABLED is
/// terminal, with the idempotent re-disable as a no-op.
pub fn write_action(existing: ItemState, incoming: ItemState, kind: &'static str, id: Uuid) -> Result<WriteAction> {
    match existing {
        ItemState::Draft => Ok(WriteAction::Merge),
        ItemState::Released => {
            if incoming == ItemState::Disabled {
                Ok(WriteAction::Disable)
            } else {
                Err(FlowError::NotWriteable { kind, id })
            }
        }
        ItemState::Disabled => {
            if incoming == ItemState::Disabled {
                Ok(WriteAction::Noop)
            } else {
                Err(FlowError::NotWriteable { kind, id })
            }
        }
    }
}

/// Delete guard: RELEASED items may not be deleted.
pub fn ensure_deletable(state: ItemState, kind: &'static str, id: Uuid) -> Result<()> {
    if state == ItemState::Released {
        return Err(FlowError::NotWriteable { kind, id });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(name: &str, io_type: IoType) -> IoConnector {
        IoConnector {
            id: Uuid::new_v4(),
            name: name.to_string(),
            io_type,
            pos_x: 0,
            pos_y: 0,
        }
    }

    fn wiring(id: Uuid) -> Wiring {
        Wiring {
            id,
            name: "w".to_string(),
            input_wirings: vec![],
            output_wirings: vec![],
        }
    }

    #[test]
    fn draft_accepts_arbitrary_edits() {
        let id = Uuid::new_v4();
        assert_eq!(
            write_action(ItemState::Draft, ItemState::Released, "component", id).unwrap(),
            WriteAction::Merge
        );
    }

    #[test]
    fn released_rejects_everything_but_disable() {
        let id = Uuid::new_v4();
        let err = write_action(ItemState::Released, ItemState::Released, "component", id).unwrap_err();
        assert!(matches!(err, FlowError::NotWriteable { .. }));

        assert_eq!(
            write_action(ItemState::Released, ItemState::Disabled, "component", id).unwrap(),
            WriteAction::Disable
        );
    }

    #[test]
    fn redisabling_is_a_noop() {
        let id = Uuid::new_v4();
        assert_eq!(
            write_action(ItemState::Disabled, ItemState::Disabled, "workflow", id).unwrap(),
            WriteAction::Noop
        );
        assert!(write_action(ItemState::Disabled, ItemState::Draft, "workflow", id).is_err());
    }

    #[test]
    fn released_items_are_not_deletable() {
        let id = Uuid::new_v4();
        assert!(ensure_deletable(ItemState::Draft, "workflow", id).is_ok());
        assert!(ensure_deletable(ItemState::Disabled, "workflow", id).is_ok());
        assert!(ensure_deletable(ItemState::Released, "workflow", id).is_err());
    }

    #[test]
    fn binding_the_same_wiring_twice_keeps_one() {
        let id = Uuid::new_v4();
        let mut wirings = Vec::new();
        assert!(bind_wiring(&mut wirings, wiring(id)));
        assert!(!bind_wiring(&mut wirings, wiring(id)));
        assert_eq!(wirings.len(), 1);
    }

    #[test]
    fn io_signature_change_detection() {
        let mut a = Component {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            name: "c".to_string(),
            description: String::new(),
            category: "Test".to_string(),
            tag: "1.0.0".to_string(),
            state: ItemState::Draft,
            inputs: vec![connector("x", IoType::Float)],
            outputs: vec![connector("y", IoType::Float)],
            code: String::new(),
            wirings: vec![],
        };
        let b = a.clone();
        assert!(!a.io_signature_changed(&b));

        // renaming a connector changes the signature
        let mut renamed = b.clone();
        renamed.inputs[0].name = "z".to_string();
        assert!(a.io_signature_changed(&renamed));

        // retyping does too
        let mut retyped = b.clone();
        retyped.outputs[0].io_type = IoType::Series;
        assert!(a.io_signature_changed(&retyped));

        // adding a connector on the incoming side
        let mut extended = b.clone();
        extended.inputs.push(connector("extra", IoType::Int));
        assert!(a.io_signature_changed(&extended));

        // removing one
        a.inputs.push(connector("gone", IoType::Int));
        assert!(a.io_signature_changed(&b));
    }

    #[test]
    fn constant_values_round_trip_untagged() {
        let v: ConstantValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, ConstantValue::Int(42));
        let v: ConstantValue = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(v, ConstantValue::Text("hello".to_string()));
        let v: ConstantValue = serde_json::from_str("{\"a\":1}").unwrap();
        assert!(matches!(v, ConstantValue::Json(_)));
    }
}
