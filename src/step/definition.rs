use super::action::{Action, ActionKind, Branch};
use super::operator::Operator;
use crate::error::ConversionError;
use serde::{Deserialize, Serialize};

/// Server-issued (or provisional) step identifier.
pub type StepId = i64;
pub type WorkflowId = i64;

/// A point on the editing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A condition step as exchanged with the step store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<StepId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub left_expression: String,
    pub operator: Operator,
    #[serde(default)]
    pub right_expression: String,
    pub if_true_action: ActionKind,
    #[serde(default)]
    pub if_true_action_data: serde_json::Value,
    pub if_false_action: ActionKind,
    #[serde(default)]
    pub if_false_action_data: serde_json::Value,
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl StepRecord {
    /// The stored position, if both coordinates are present.
    pub fn position(&self) -> Option<Position> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        }
    }

    pub fn action(&self, branch: Branch) -> Result<Action, ConversionError> {
        let (kind, data) = match branch {
            Branch::True => (self.if_true_action, &self.if_true_action_data),
            Branch::False => (self.if_false_action, &self.if_false_action_data),
        };
        Action::from_wire(kind, data, self.id, branch)
    }

    pub fn set_action(&mut self, branch: Branch, action: &Action) {
        match branch {
            Branch::True => {
                self.if_true_action = action.kind();
                self.if_true_action_data = action.data();
            }
            Branch::False => {
                self.if_false_action = action.kind();
                self.if_false_action_data = action.data();
            }
        }
    }
}

/// A workflow as returned by the fetch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    #[serde(default)]
    pub id: Option<WorkflowId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub execution_point: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub initial_step: Option<StepId>,
    /// Watermark: identifiers at or above this value are not yet created.
    pub new_step_id: StepId,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowRecord {
    pub fn meta(&self) -> WorkflowMeta {
        WorkflowMeta {
            id: self.id,
            name: self.name.clone(),
            execution_point: self.execution_point.clone(),
            is_active: self.is_active,
            is_default: self.is_default,
            extra: self.extra.clone(),
        }
    }
}

/// Workflow-level metadata carried through the editor untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMeta {
    pub id: Option<WorkflowId>,
    pub name: String,
    pub execution_point: String,
    pub is_active: bool,
    pub is_default: bool,
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
