use crate::graph::{EdgeId, Handle, NodeId};
use crate::step::{Branch, StepId};
use thiserror::Error;

/// Violations of the graph's structural rules.
///
/// The editing session repairs these before they happen; they only surface when the
/// model is driven directly.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{0}' not found in the graph")]
    NodeNotFound(NodeId),

    #[error("Node '{0}' already exists in the graph")]
    DuplicateNode(NodeId),

    #[error("Handle '{handle}' of node '{node}' already has outgoing edge '{existing}'")]
    OutgoingOccupied {
        node: NodeId,
        handle: Handle,
        existing: EdgeId,
    },

    #[error("Node '{target}' already has incoming edge '{existing}'")]
    IncomingOccupied { target: NodeId, existing: EdgeId },

    #[error("Node '{node}' has no '{handle}' handle")]
    InvalidHandle { node: NodeId, handle: Handle },

    #[error("Terminal chain through '{0}' loops back on itself")]
    TerminalCycle(NodeId),
}

/// Errors raised while converting store records into the editing model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Invalid {branch} action data on step {step_id:?}: {message}")]
    InvalidActionData {
        step_id: Option<StepId>,
        branch: Branch,
        message: String,
    },

    #[error("Step {0} appears more than once in the workflow")]
    DuplicateStep(StepId),

    #[error("Step record without an identifier cannot be loaded from the store")]
    MissingStepId,

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors in expression text entered by the operator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Invalid list expression: {0}")]
    InvalidList(String),

    #[error("List items must be strings, found {0}")]
    NonStringItem(String),
}

/// Problems that block a save before any network call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("The workflow has no identifier; it must be created before its steps can be saved")]
    MissingWorkflowId,

    #[error("The {branch} branch of node '{node}' cannot be resolved: {reason}")]
    UnresolvableBranch {
        node: NodeId,
        branch: Branch,
        reason: String,
    },

    #[error("Step '{node}' uses a set-membership operator but its right expression is invalid: {message}")]
    InvalidSetExpression { node: NodeId, message: String },

    #[error("Step '{0}' has no identifier")]
    MissingStepId(NodeId),
}

/// A call to the remote step store failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Request to the step store failed: {0}")]
    Request(String),

    #[error("Step store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode step store response: {0}")]
    Decode(String),

    #[error("Not found in the step store: {0}")]
    NotFound(String),

    #[error("Step store rejected the request: {0}")]
    Rejected(String),
}

/// Errors that stop a save attempt from starting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("A save is already in progress")]
    SaveInFlight,
}

/// Errors raised by editing operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Node '{0}' is not a condition step")]
    NotACondition(NodeId),

    #[error("Node '{0}' is not a terminal node")]
    NotATerminal(NodeId),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(EdgeId),
}

/// Errors surfaced by the workflow editor facade.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error("Deleting step {step_id} failed, nothing was removed: {cause}")]
    DeleteFailed { step_id: StepId, cause: StoreError },
}

/// Errors while persisting or restoring an editing draft.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error("Draft error: {0}")]
    Generic(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {cause}")]
    Read { path: String, cause: std::io::Error },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
