use super::definition::StepId;
use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

/// One of the two mandatory outgoing directions of a condition step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    True,
    False,
}

impl Branch {
    pub const BOTH: [Branch; 2] = [Branch::True, Branch::False];

    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::True => "true",
            Branch::False => "false",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "true" => Some(Branch::True),
            "false" => Some(Branch::False),
            _ => None,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The wire tag stored in `if_true_action` / `if_false_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ProceedToStepById,
    CompleteSuccess,
    CompleteFailure,
}

/// The persisted effect of taking a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    ProceedToStep { next_step_id: StepId, note: String },
    CompleteSuccess { message: String },
    CompleteFailure { error: String },
}

impl Action {
    /// The action substituted for a branch that has no outgoing edge.
    pub fn default_for(branch: Branch) -> Self {
        match branch {
            Branch::True => Action::CompleteSuccess {
                message: String::new(),
            },
            Branch::False => Action::CompleteFailure {
                error: String::new(),
            },
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::ProceedToStep { .. } => ActionKind::ProceedToStepById,
            Action::CompleteSuccess { .. } => ActionKind::CompleteSuccess,
            Action::CompleteFailure { .. } => ActionKind::CompleteFailure,
        }
    }

    pub fn next_step_id(&self) -> Option<StepId> {
        match self {
            Action::ProceedToStep { next_step_id, .. } => Some(*next_step_id),
            _ => None,
        }
    }

    /// Encodes the payload that travels in `if_*_action_data`.
    pub fn data(&self) -> serde_json::Value {
        match self {
            Action::ProceedToStep { next_step_id, note } => {
                json!({ "next_step_id": next_step_id, "note": note })
            }
            Action::CompleteSuccess { message } => json!({ "message": message }),
            Action::CompleteFailure { error } => json!({ "error": error }),
        }
    }

    /// Decodes an action from its wire tag and data object.
    ///
    /// Missing text keys decode to empty strings, a proceed action without a
    /// numeric `next_step_id` is rejected.
    pub fn from_wire(
        kind: ActionKind,
        data: &serde_json::Value,
        step_id: Option<StepId>,
        branch: Branch,
    ) -> Result<Self, ConversionError> {
        let text = |key: &str| {
            data.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        match kind {
            ActionKind::ProceedToStepById => {
                let next_step_id = data
                    .get("next_step_id")
                    .and_then(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok()))
                    .ok_or_else(|| ConversionError::InvalidActionData {
                        step_id,
                        branch,
                        message: format!("proceed action without a numeric next_step_id: {}", data),
                    })?;
                Ok(Action::ProceedToStep {
                    next_step_id,
                    note: text("note"),
                })
            }
            ActionKind::CompleteSuccess => Ok(Action::CompleteSuccess {
                message: text("message"),
            }),
            ActionKind::CompleteFailure => Ok(Action::CompleteFailure {
                error: text("error"),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ProceedToStep { next_step_id, .. } => write!(f, "-> step {}", next_step_id),
            Action::CompleteSuccess { message } => write!(f, "success ({})", message),
            Action::CompleteFailure { error } => write!(f, "failure ({})", error),
        }
    }
}
