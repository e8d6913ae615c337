use crate::step::Branch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a terminal node ends the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "success" => Some(Outcome::Success),
            "failure" => Some(Outcome::Failure),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A presentation-only success/failure endpoint. Never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalNode {
    pub outcome: Outcome,
    /// Success message or failure error, folded into the owning step's action on save.
    pub text: String,
}

/// Node id of the terminal owned by `owner` on `branch`: `{owner}:{branch}:{outcome}`.
pub fn terminal_id(owner: &str, branch: Branch, outcome: Outcome) -> String {
    format!("{}:{}:{}", owner, branch, outcome)
}

/// Splits a conventional terminal id back into `(owner, branch, outcome)`.
pub fn parse_terminal_id(id: &str) -> Option<(&str, Branch, Outcome)> {
    let mut parts = id.rsplitn(3, ':');
    let outcome = Outcome::from_name(parts.next()?)?;
    let branch = Branch::from_name(parts.next()?)?;
    let owner = parts.next()?;
    if owner.is_empty() {
        return None;
    }
    Some((owner, branch, outcome))
}

/// Whether `id` names one of `owner`'s own terminals.
pub fn is_owned_by(id: &str, owner: &str) -> bool {
    parse_terminal_id(id).is_some_and(|(o, _, _)| o == owner)
}
