use crate::graph::{GraphModel, NodeId};
use crate::step::StepId;

/// A step is new when it has no identifier or one at/above the watermark.
pub fn is_new(step_id: Option<StepId>, watermark: StepId) -> bool {
    step_id.is_none_or(|id| id >= watermark)
}

/// Gives every new step a provisional identifier, counting up from `watermark`.
///
/// All new steps are numbered before any action is resolved, so a new step can point
/// at another new step. Identifiers follow graph order and are contiguous.
pub fn assign_provisional_ids(graph: &mut GraphModel, watermark: StepId) -> Vec<(NodeId, StepId)> {
    let fresh: Vec<NodeId> = graph
        .steps()
        .filter(|(_, step)| is_new(step.step_id, watermark))
        .map(|(node, _)| node.id.clone())
        .collect();

    let mut assigned = Vec::with_capacity(fresh.len());
    for (offset, node) in fresh.into_iter().enumerate() {
        let id = watermark + offset as StepId;
        if let Some(step) = graph.step_mut(&node) {
            step.step_id = Some(id);
            assigned.push((node, id));
        }
    }
    assigned
}
