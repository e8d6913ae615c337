//! The in-memory step graph shown on the editing canvas.
//!
//! A [`GraphModel`] holds condition nodes, terminal (success/failure) nodes and the
//! labeled edges between them. Insertions are checked against the edge-cardinality
//! rules: a source handle carries at most one outgoing edge and a node receives at
//! most one incoming edge. The model rejects violations; repairing them is the job of
//! [`crate::session::EditSession`].

pub mod terminal;

pub use terminal::*;

use crate::error::GraphError;
use crate::step::{Branch, Operator, Position, StepId};
use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Presentation-node identifier, stable for the lifetime of an editing session.
pub type NodeId = String;
pub type EdgeId = String;

/// Node id used for a condition step loaded from the store.
pub fn step_node_id(step_id: StepId) -> NodeId {
    format!("step-{}", step_id)
}

/// The source handle an edge leaves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    True,
    False,
    /// The single pass-through output of a terminal node.
    Next,
}

impl Handle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Handle::True => "true",
            Handle::False => "false",
            Handle::Next => "next",
        }
    }

    pub fn branch(&self) -> Option<Branch> {
        match self {
            Handle::True => Some(Branch::True),
            Handle::False => Some(Branch::False),
            Handle::Next => None,
        }
    }
}

impl From<Branch> for Handle {
    fn from(branch: Branch) -> Self {
        match branch {
            Branch::True => Handle::True,
            Branch::False => Handle::False,
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Editable content of a condition step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepNode {
    /// `None` until a provisional or server identifier is assigned.
    pub step_id: Option<StepId>,
    pub name: String,
    pub order: u32,
    pub left_expression: String,
    pub operator: Operator,
    pub right_expression: String,
    pub failure_message: Option<String>,
    pub is_active: bool,
}

impl StepNode {
    pub fn new(name: &str, left_expression: &str, operator: Operator, right_expression: &str) -> Self {
        Self {
            step_id: None,
            name: name.to_string(),
            order: 0,
            left_expression: left_expression.to_string(),
            operator,
            right_expression: right_expression.to_string(),
            failure_message: None,
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Condition(StepNode),
    Terminal(TerminalNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Option<Position>,
    pub kind: NodeKind,
}

impl Node {
    pub fn condition(id: impl Into<NodeId>, step: StepNode, position: Option<Position>) -> Self {
        Self {
            id: id.into(),
            position,
            kind: NodeKind::Condition(step),
        }
    }

    pub fn terminal(id: impl Into<NodeId>, terminal: TerminalNode, position: Option<Position>) -> Self {
        Self {
            id: id.into(),
            position,
            kind: NodeKind::Terminal(terminal),
        }
    }

    pub fn as_step(&self) -> Option<&StepNode> {
        match &self.kind {
            NodeKind::Condition(step) => Some(step),
            NodeKind::Terminal(_) => None,
        }
    }

    pub fn as_terminal(&self) -> Option<&TerminalNode> {
        match &self.kind {
            NodeKind::Terminal(terminal) => Some(terminal),
            NodeKind::Condition(_) => None,
        }
    }

    pub fn is_condition(&self) -> bool {
        matches!(self.kind, NodeKind::Condition(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, NodeKind::Terminal(_))
    }

    /// Whether `handle` is a valid outgoing handle for this kind of node.
    pub fn accepts_handle(&self, handle: Handle) -> bool {
        match self.kind {
            NodeKind::Condition(_) => handle != Handle::Next,
            NodeKind::Terminal(_) => handle == Handle::Next,
        }
    }
}

/// A directed edge from one node's handle to another node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub handle: Handle,
    pub target: NodeId,
    /// Human-readable reason carried into a proceed action.
    pub note: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, handle: Handle, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        Self {
            id: edge_id(&source, handle),
            source,
            handle,
            target: target.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Edge ids are keyed by their source handle, which carries at most one edge.
pub fn edge_id(source: &str, handle: Handle) -> EdgeId {
    format!("edge:{}:{}", source, handle)
}

/// Where a branch leads once terminal pass-through edges have been followed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BranchTarget<'g> {
    /// No outgoing edge on the branch.
    Open,
    /// A condition step, reached directly or through `via` terminal.
    Step {
        node: &'g Node,
        via: Option<&'g Node>,
    },
    /// A terminal node with no further outgoing edge.
    Terminal(&'g Node),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn step(&self, id: &str) -> Option<&StepNode> {
        self.node(id).and_then(Node::as_step)
    }

    pub fn step_mut(&mut self, id: &str) -> Option<&mut StepNode> {
        match self.node_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Condition(step)) => Some(step),
            _ => None,
        }
    }

    /// Condition nodes in insertion order.
    pub fn steps(&self) -> impl Iterator<Item = (&Node, &StepNode)> {
        self.nodes
            .iter()
            .filter_map(|n| n.as_step().map(|step| (n, step)))
    }

    pub fn terminals(&self) -> impl Iterator<Item = (&Node, &TerminalNode)> {
        self.nodes
            .iter()
            .filter_map(|n| n.as_terminal().map(|terminal| (n, terminal)))
    }

    pub fn node_for_step(&self, step_id: StepId) -> Option<&Node> {
        self.steps()
            .find(|(_, step)| step.step_id == Some(step_id))
            .map(|(node, _)| node)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edge_mut(&mut self, id: &str) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.id == id)
    }

    pub fn outgoing(&self, source: &str, handle: Handle) -> Option<&Edge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.handle == handle)
    }

    pub fn incoming(&self, target: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.target == target)
    }

    /// Ids of every edge that starts or ends at `id`.
    pub fn edges_touching(&self, id: &str) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.contains(&node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<(Node, Vec<Edge>)> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        let node = self.nodes.remove(index);
        let (removed, kept): (Vec<Edge>, Vec<Edge>) = std::mem::take(&mut self.edges)
            .into_iter()
            .partition(|e| e.source == id || e.target == id);
        self.edges = kept;
        Some((node, removed))
    }

    /// Inserts an edge, rejecting anything that would break edge cardinality.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        let source = self
            .node(&edge.source)
            .ok_or_else(|| GraphError::NodeNotFound(edge.source.clone()))?;
        if !self.contains(&edge.target) {
            return Err(GraphError::NodeNotFound(edge.target.clone()));
        }
        if !source.accepts_handle(edge.handle) {
            return Err(GraphError::InvalidHandle {
                node: edge.source.clone(),
                handle: edge.handle,
            });
        }
        if let Some(existing) = self.outgoing(&edge.source, edge.handle) {
            return Err(GraphError::OutgoingOccupied {
                node: edge.source.clone(),
                handle: edge.handle,
                existing: existing.id.clone(),
            });
        }
        if let Some(existing) = self.incoming(&edge.target) {
            return Err(GraphError::IncomingOccupied {
                target: edge.target.clone(),
                existing: existing.id.clone(),
            });
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let index = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(index))
    }

    /// Follows a branch to its effective target, passing through chained terminals.
    pub fn branch_target(&self, source: &str, branch: Branch) -> Result<BranchTarget<'_>, GraphError> {
        let Some(first) = self.outgoing(source, branch.into()) else {
            return Ok(BranchTarget::Open);
        };

        let mut seen = AHashSet::new();
        let mut via = None;
        let mut current = self
            .node(&first.target)
            .ok_or_else(|| GraphError::NodeNotFound(first.target.clone()))?;

        loop {
            if current.is_condition() {
                return Ok(BranchTarget::Step { node: current, via });
            }
            if !seen.insert(current.id.as_str()) {
                return Err(GraphError::TerminalCycle(current.id.clone()));
            }
            match self.outgoing(&current.id, Handle::Next) {
                None => return Ok(BranchTarget::Terminal(current)),
                Some(next) => {
                    // The first terminal on the chain is the one reported as pass-through.
                    via.get_or_insert(current);
                    current = self
                        .node(&next.target)
                        .ok_or_else(|| GraphError::NodeNotFound(next.target.clone()))?;
                }
            }
        }
    }

    /// The condition step reached through `branch`, if any.
    pub fn next_step(&self, source: &str, branch: Branch) -> Option<&Node> {
        match self.branch_target(source, branch) {
            Ok(BranchTarget::Step { node, .. }) => Some(node),
            _ => None,
        }
    }

    /// Verifies edge cardinality and endpoint existence over the whole model.
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        let mut handles = AHashSet::new();
        let mut targets = AHashSet::new();
        for edge in &self.edges {
            let source = self
                .node(&edge.source)
                .ok_or_else(|| GraphError::NodeNotFound(edge.source.clone()))?;
            if !self.contains(&edge.target) {
                return Err(GraphError::NodeNotFound(edge.target.clone()));
            }
            if !source.accepts_handle(edge.handle) {
                return Err(GraphError::InvalidHandle {
                    node: edge.source.clone(),
                    handle: edge.handle,
                });
            }
            if !handles.insert((edge.source.as_str(), edge.handle)) {
                return Err(GraphError::OutgoingOccupied {
                    node: edge.source.clone(),
                    handle: edge.handle,
                    existing: edge.id.clone(),
                });
            }
            if !targets.insert(edge.target.as_str()) {
                return Err(GraphError::IncomingOccupied {
                    target: edge.target.clone(),
                    existing: edge.id.clone(),
                });
            }
        }
        Ok(())
    }
}
