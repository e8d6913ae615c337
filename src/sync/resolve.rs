use super::diff::StepPayload;
use crate::config::NoteConfig;
use crate::error::ValidationError;
use crate::graph::{BranchTarget, GraphModel, Node, Outcome, StepNode};
use crate::step::{Action, Branch};

/// Turns the edges leaving a condition step into its persisted actions.
pub struct ActionResolver<'a> {
    graph: &'a GraphModel,
    notes: &'a NoteConfig,
}

impl<'a> ActionResolver<'a> {
    pub fn new(graph: &'a GraphModel, notes: &'a NoteConfig) -> Self {
        Self { graph, notes }
    }

    /// The action for `branch` of `node`.
    ///
    /// - no edge: the branch's default completion with an empty text;
    /// - a terminal: completion carrying the terminal's text;
    /// - a condition step, directly or through a chained terminal: proceed to that step.
    pub fn resolve(&self, node: &str, branch: Branch) -> Result<Action, ValidationError> {
        let unresolvable = |reason: String| ValidationError::UnresolvableBranch {
            node: node.to_string(),
            branch,
            reason,
        };

        let target = self
            .graph
            .branch_target(node, branch)
            .map_err(|e| unresolvable(e.to_string()))?;

        match target {
            BranchTarget::Open => Ok(Action::default_for(branch)),
            BranchTarget::Terminal(terminal) => match terminal.as_terminal() {
                Some(t) if t.outcome == Outcome::Success => Ok(Action::CompleteSuccess {
                    message: t.text.clone(),
                }),
                Some(t) => Ok(Action::CompleteFailure {
                    error: t.text.clone(),
                }),
                None => Err(unresolvable(format!("'{}' is not a terminal", terminal.id))),
            },
            BranchTarget::Step { node: target, via } => {
                let next_step_id = target
                    .as_step()
                    .and_then(|step| step.step_id)
                    .ok_or_else(|| unresolvable(format!("step '{}' has no identifier", target.id)))?;
                Ok(Action::ProceedToStep {
                    next_step_id,
                    note: self.note_for(node, branch, via),
                })
            }
        }
    }

    fn note_for(&self, node: &str, branch: Branch, via: Option<&Node>) -> String {
        if let Some(text) = via
            .and_then(Node::as_terminal)
            .map(|t| t.text.as_str())
            .filter(|text| !text.is_empty())
        {
            return text.to_string();
        }
        self.graph
            .outgoing(node, branch.into())
            .and_then(|edge| edge.note.clone())
            .unwrap_or_else(|| match branch {
                Branch::True => self.notes.passed.clone(),
                Branch::False => self.notes.failed.clone(),
            })
    }

    /// The full persisted field set of one condition step.
    pub fn payload(&self, node: &Node, step: &StepNode) -> Result<StepPayload, ValidationError> {
        let step_id = step.step_id.ok_or_else(|| ValidationError::MissingStepId(node.id.clone()))?;
        Ok(StepPayload {
            node: node.id.clone(),
            step_id,
            name: step.name.clone(),
            order: step.order,
            position: node.position,
            left_expression: step.left_expression.clone(),
            operator: step.operator,
            right_expression: step.right_expression.clone(),
            if_true_action: self.resolve(&node.id, Branch::True)?,
            if_false_action: self.resolve(&node.id, Branch::False)?,
            failure_message: step.failure_message.clone(),
            is_active: step.is_active,
        })
    }
}
