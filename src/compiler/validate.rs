/// Link validation and operator-name deduplication
///
/// Self-healing for the persisted link graph: links left dangling by operator
/// deletion are pruned on update, and operator display names are made unique
/// within each group of operators instantiating the same catalog item. Both
/// passes run as part of the workflow update pipeline, before boundary IO is
/// re-synthesized.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::catalog::types::Workflow;
use crate::compiler::{synthesis, ItemIndex};
use crate::error::Result;

/// Remove links whose endpoints reference neither a live operator nor a
/// boundary port's operator.
///
/// A link is removed only when both of these hold at once:
/// - no operator id equals `from_operator` and no boundary IO's operator
///   equals `to_operator`;
/// - no operator id equals `to_operator` and no boundary IO's operator
///   equals `from_operator`.
/// The cross-wise shape of the check is inherited behavior: a link with
/// exactly one dangling endpoint is kept. Pruning is idempotent.
pub fn prune_invalid_links(workflow: &mut Workflow) {
    let operator_ids: HashSet<Uuid> = workflow.operators.iter().map(|op| op.id).collect();
    let boundary_operators: HashSet<Uuid> = workflow
        .inputs
        .iter()
        .chain(workflow.outputs.iter())
        .map(|io| io.operator)
        .collect();

    workflow.links.retain(|link| {
        let from_dangling =
            !operator_ids.contains(&link.from_operator) && !boundary_operators.contains(&link.to_operator);
        let to_dangling =
            !operator_ids.contains(&link.to_operator) && !boundary_operators.contains(&link.from_operator);

        if from_dangling && to_dangling {
            tracing::error!(
                "invalid link {}: neither endpoint resolves (from {} to {}), pruning",
                link.id,
                link.from_operator,
                link.to_operator
            );
            return false;
        }
        true
    });
}

/// Make operator display names unique within each group of operators sharing
/// the same `item_id`, by suffixing " (2)", " (3)", ... in persisted order.
pub fn dedupe_operator_names(workflow: &mut Workflow) {
    let mut groups: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (index, operator) in workflow.operators.iter().enumerate() {
        groups.entry(operator.item_id).or_default().push(index);
    }

    for indices in groups.values() {
        let mut taken: HashSet<String> = HashSet::new();
        for &index in indices {
            let base = workflow.operators[index].name.clone();
            let mut suffix = 1;
            let mut candidate = base.clone();
            while taken.contains(&candidate) {
                suffix += 1;
                candidate = format!("{} ({})", base, suffix);
            }
            taken.insert(candidate.clone());
            workflow.operators[index].name = candidate;
        }
    }
}

/// The workflow update pipeline: prune dangling links, dedupe operator names,
/// then recompute the boundary IO lists wholesale.
pub fn refresh_workflow(workflow: &mut Workflow, items: &ItemIndex) -> Result<()> {
    prune_invalid_links(workflow);
    dedupe_operator_names(workflow);

    let (inputs, outputs) = synthesis::synthesize_io(workflow, items)?;
    workflow.inputs = inputs;
    workflow.outputs = outputs;
    Ok(())
}
