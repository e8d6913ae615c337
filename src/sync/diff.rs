use super::snapshot::StepSnapshot;
use crate::graph::NodeId;
use crate::step::{Action, ActionKind, Branch, Operator, Position, StepId, StepRecord};
use serde::Serialize;

/// Every persisted field of one step, with actions already resolved from the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPayload {
    pub node: NodeId,
    pub step_id: StepId,
    pub name: String,
    pub order: u32,
    pub position: Option<Position>,
    pub left_expression: String,
    pub operator: Operator,
    pub right_expression: String,
    pub if_true_action: Action,
    pub if_false_action: Action,
    pub failure_message: Option<String>,
    pub is_active: bool,
}

impl StepPayload {
    pub fn action(&self, branch: Branch) -> &Action {
        match branch {
            Branch::True => &self.if_true_action,
            Branch::False => &self.if_false_action,
        }
    }

    /// The wire form sent in a bulk-create request.
    pub fn to_record(&self) -> StepRecord {
        StepRecord {
            id: Some(self.step_id),
            name: self.name.clone(),
            order: self.order,
            x: self.position.map(|p| p.x),
            y: self.position.map(|p| p.y),
            left_expression: self.left_expression.clone(),
            operator: self.operator,
            right_expression: self.right_expression.clone(),
            if_true_action: self.if_true_action.kind(),
            if_true_action_data: self.if_true_action.data(),
            if_false_action: self.if_false_action.kind(),
            if_false_action_data: self.if_false_action.data(),
            failure_message: self.failure_message.clone(),
            is_active: self.is_active,
        }
    }
}

/// Partial update for an existing step.
///
/// Only changed fields are set, except `order` and the position, which are always sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "PatchRecord")]
pub struct StepPatch {
    pub step_id: StepId,
    pub order: u32,
    pub position: Option<Position>,
    pub name: Option<String>,
    pub left_expression: Option<String>,
    pub operator: Option<Operator>,
    pub right_expression: Option<String>,
    pub if_true_action: Option<Action>,
    pub if_false_action: Option<Action>,
    pub failure_message: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl StepPatch {
    /// Names of the optional fields this patch carries.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut mark = |present: bool, name: &'static str| {
            if present {
                fields.push(name);
            }
        };
        mark(self.name.is_some(), "name");
        mark(self.left_expression.is_some(), "left_expression");
        mark(self.operator.is_some(), "operator");
        mark(self.right_expression.is_some(), "right_expression");
        mark(self.if_true_action.is_some(), "if_true_action");
        mark(self.if_false_action.is_some(), "if_false_action");
        mark(self.failure_message.is_some(), "failure_message");
        mark(self.is_active.is_some(), "is_active");
        fields
    }
}

#[derive(Serialize)]
struct PatchRecord {
    step_id: StepId,
    order: u32,
    x: Option<f64>,
    y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    left_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<Operator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    right_expression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    if_true_action: Option<ActionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    if_true_action_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    if_false_action: Option<ActionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    if_false_action_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_message: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_active: Option<bool>,
}

impl From<StepPatch> for PatchRecord {
    fn from(patch: StepPatch) -> Self {
        PatchRecord {
            step_id: patch.step_id,
            order: patch.order,
            x: patch.position.map(|p| p.x),
            y: patch.position.map(|p| p.y),
            name: patch.name,
            left_expression: patch.left_expression,
            operator: patch.operator,
            right_expression: patch.right_expression,
            if_true_action: patch.if_true_action.as_ref().map(Action::kind),
            if_true_action_data: patch.if_true_action.as_ref().map(Action::data),
            if_false_action: patch.if_false_action.as_ref().map(Action::kind),
            if_false_action_data: patch.if_false_action.as_ref().map(Action::data),
            failure_message: patch.failure_message,
            is_active: patch.is_active,
        }
    }
}

fn changed<T: PartialEq + Clone>(current: &T, original: Option<&T>) -> Option<T> {
    if original == Some(current) {
        None
    } else {
        Some(current.clone())
    }
}

/// Compares a step against its snapshot.
///
/// Returns `None` when nothing differs. Fields missing from the snapshot count as
/// changed, so a step without a snapshot produces a full patch.
pub fn diff_step(payload: &StepPayload, snapshot: Option<&StepSnapshot>) -> Option<StepPatch> {
    let empty = StepSnapshot::default();
    let original = snapshot.unwrap_or(&empty);

    let patch = StepPatch {
        step_id: payload.step_id,
        order: payload.order,
        position: payload.position,
        name: changed(&payload.name, original.name.as_ref()),
        left_expression: changed(&payload.left_expression, original.left_expression.as_ref()),
        operator: changed(&payload.operator, original.operator.as_ref()),
        right_expression: changed(&payload.right_expression, original.right_expression.as_ref()),
        if_true_action: changed(&payload.if_true_action, original.if_true_action.as_ref()),
        if_false_action: changed(&payload.if_false_action, original.if_false_action.as_ref()),
        failure_message: changed(&payload.failure_message, original.failure_message.as_ref()),
        is_active: changed(&payload.is_active, original.is_active.as_ref()),
    };

    let order_changed = original.order != Some(payload.order);
    let position_changed = original.position != payload.position;

    if patch.changed_fields().is_empty() && !order_changed && !position_changed {
        None
    } else {
        Some(patch)
    }
}
