use super::diff::{StepPatch, StepPayload};
use crate::error::ConversionError;
use crate::graph::NodeId;
use crate::step::{Action, Branch, Operator, Position, StepId, StepRecord};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Last confirmed server state of one step.
///
/// A `None` field means "no original value": the diff treats it as changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    pub step_id: Option<StepId>,
    pub name: Option<String>,
    pub order: Option<u32>,
    pub position: Option<Position>,
    pub left_expression: Option<String>,
    pub operator: Option<Operator>,
    pub right_expression: Option<String>,
    pub if_true_action: Option<Action>,
    pub if_false_action: Option<Action>,
    pub failure_message: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl StepSnapshot {
    /// Snapshot of everything a save is about to send.
    pub fn capture(payload: &StepPayload) -> Self {
        Self {
            step_id: Some(payload.step_id),
            name: Some(payload.name.clone()),
            order: Some(payload.order),
            position: payload.position,
            left_expression: Some(payload.left_expression.clone()),
            operator: Some(payload.operator),
            right_expression: Some(payload.right_expression.clone()),
            if_true_action: Some(payload.if_true_action.clone()),
            if_false_action: Some(payload.if_false_action.clone()),
            failure_message: Some(payload.failure_message.clone()),
            is_active: Some(payload.is_active),
        }
    }

    /// Snapshot of a step as loaded from the store.
    pub fn from_record(record: &StepRecord) -> Result<Self, ConversionError> {
        Ok(Self {
            step_id: record.id,
            name: Some(record.name.clone()),
            order: Some(record.order),
            position: record.position(),
            left_expression: Some(record.left_expression.clone()),
            operator: Some(record.operator),
            right_expression: Some(record.right_expression.clone()),
            if_true_action: Some(record.action(Branch::True)?),
            if_false_action: Some(record.action(Branch::False)?),
            failure_message: Some(record.failure_message.clone()),
            is_active: Some(record.is_active),
        })
    }

    /// Folds a confirmed partial update in, leaving fields the patch did not carry alone.
    pub fn merge_patch(&mut self, patch: &StepPatch) {
        self.step_id = Some(patch.step_id);
        self.order = Some(patch.order);
        self.position = patch.position;
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(left) = &patch.left_expression {
            self.left_expression = Some(left.clone());
        }
        if let Some(operator) = patch.operator {
            self.operator = Some(operator);
        }
        if let Some(right) = &patch.right_expression {
            self.right_expression = Some(right.clone());
        }
        if let Some(action) = &patch.if_true_action {
            self.if_true_action = Some(action.clone());
        }
        if let Some(action) = &patch.if_false_action {
            self.if_false_action = Some(action.clone());
        }
        if let Some(message) = &patch.failure_message {
            self.failure_message = Some(message.clone());
        }
        if let Some(active) = patch.is_active {
            self.is_active = Some(active);
        }
    }
}

/// Snapshots keyed by presentation-node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTable {
    entries: AHashMap<NodeId, StepSnapshot>,
}

impl SnapshotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &str) -> Option<&StepSnapshot> {
        self.entries.get(node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.entries.contains_key(node)
    }

    pub fn insert(&mut self, node: NodeId, snapshot: StepSnapshot) -> Option<StepSnapshot> {
        self.entries.insert(node, snapshot)
    }

    pub fn remove(&mut self, node: &str) -> Option<StepSnapshot> {
        self.entries.remove(node)
    }

    pub fn entry(&mut self, node: NodeId) -> &mut StepSnapshot {
        self.entries.entry(node).or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
