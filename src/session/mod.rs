//! The mutation surface of the editor.
//!
//! Every operation keeps the graph's edge-cardinality rules intact by rewriting the
//! model around the operator's request instead of refusing it: connecting a branch
//! that is already wired replaces the old edge, and connecting into a node that
//! already has a parent steals that node from its previous parent.

use crate::error::{EditError, GraphError};
use crate::graph::{
    BranchTarget, Edge, EdgeId, GraphModel, Handle, Node, NodeId, NodeKind, Outcome, StepNode,
    TerminalNode, edge_id, is_owned_by, terminal_id,
};
use crate::step::{Branch, Operator, Position, StepId, normalize_list};
use ahash::AHashSet;
use itertools::Itertools;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// What a `connect` call had to rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectOutcome {
    pub edge: EdgeId,
    /// Edges removed to make room for the new one.
    pub replaced: Vec<Edge>,
    /// Terminal nodes dropped because their only edge was replaced.
    pub removed_terminals: Vec<NodeId>,
}

/// Field-level changes to a condition step. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepUpdate {
    pub name: Option<String>,
    pub order: Option<u32>,
    pub left_expression: Option<String>,
    pub operator: Option<Operator>,
    pub right_expression: Option<String>,
    pub failure_message: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// The nodes and edges a delete will remove.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    pub root: NodeId,
    /// Identifier of the condition step being deleted, if it has one.
    pub step_id: Option<StepId>,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
}

#[derive(Debug, Clone, Default)]
pub struct EditSession {
    graph: GraphModel,
    next_seq: u64,
}

impl EditSession {
    pub fn new(graph: GraphModel) -> Self {
        Self { graph, next_seq: 1 }
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut GraphModel {
        &mut self.graph
    }

    pub fn into_graph(self) -> GraphModel {
        self.graph
    }

    fn fresh_id(&mut self, prefix: &str) -> NodeId {
        loop {
            let id = format!("{}-{}", prefix, self.next_seq);
            self.next_seq += 1;
            if !self.graph.contains(&id) {
                return id;
            }
        }
    }

    /// Adds a new, not yet persisted condition step.
    ///
    /// A step with order `0` is placed after every existing step.
    pub fn add_step(&mut self, mut step: StepNode, position: Option<Position>) -> Result<NodeId, EditError> {
        if step.order == 0 {
            step.order = self.graph.steps().map(|(_, s)| s.order).max().unwrap_or(0) + 1;
        }
        let id = self.fresh_id("new");
        debug!(node = %id, name = %step.name, "adding step");
        self.graph.insert_node(Node::condition(id.clone(), step, position))?;
        Ok(id)
    }

    /// Adds a free-standing terminal node.
    pub fn add_terminal(
        &mut self,
        outcome: Outcome,
        text: &str,
        position: Option<Position>,
    ) -> Result<NodeId, EditError> {
        let id = self.fresh_id("terminal");
        let terminal = TerminalNode {
            outcome,
            text: text.to_string(),
        };
        self.graph.insert_node(Node::terminal(id.clone(), terminal, position))?;
        Ok(id)
    }

    /// Gives `owner`'s branch its own terminal, reusing the conventional node if it exists.
    pub fn attach_terminal(
        &mut self,
        owner: &str,
        branch: Branch,
        outcome: Outcome,
        text: &str,
    ) -> Result<NodeId, EditError> {
        if self.graph.step(owner).is_none() {
            return Err(self.not_a_condition(owner));
        }
        let id = terminal_id(owner, branch, outcome);
        match self.graph.node(&id).map(Node::is_terminal) {
            Some(true) => self.set_terminal_text(&id, text)?,
            Some(false) => return Err(EditError::NotATerminal(id)),
            None => {
                let terminal = TerminalNode {
                    outcome,
                    text: text.to_string(),
                };
                self.graph.insert_node(Node::terminal(id.clone(), terminal, None))?;
            }
        }
        self.connect(owner, branch.into(), &id)?;
        Ok(id)
    }

    /// Draws an edge from `source`'s `handle` to `target`, replacing whatever is in the way.
    pub fn connect(&mut self, source: &str, handle: Handle, target: &str) -> Result<ConnectOutcome, EditError> {
        let source_node = self
            .graph
            .node(source)
            .ok_or_else(|| GraphError::NodeNotFound(source.to_string()))?;
        if !self.graph.contains(target) {
            return Err(GraphError::NodeNotFound(target.to_string()).into());
        }
        if !source_node.accepts_handle(handle) {
            return Err(GraphError::InvalidHandle {
                node: source.to_string(),
                handle,
            }
            .into());
        }

        let mut outcome = ConnectOutcome {
            edge: edge_id(source, handle),
            ..Default::default()
        };

        if let Some(existing) = self.graph.outgoing(source, handle).cloned() {
            if existing.target == target {
                return Ok(outcome);
            }
            self.graph.remove_edge(&existing.id);
            let abandoned_terminal = existing.target != source
                && self.graph.node(&existing.target).is_some_and(Node::is_terminal);
            if abandoned_terminal {
                if let Some((_, edges)) = self.graph.remove_node(&existing.target) {
                    debug!(terminal = %existing.target, "dropping abandoned terminal");
                    outcome.removed_terminals.push(existing.target.clone());
                    outcome.replaced.extend(edges);
                }
            }
            outcome.replaced.push(existing);
        }

        if let Some(incoming) = self.graph.incoming(target).cloned() {
            debug!(edge = %incoming.id, target, "detaching previous parent");
            self.graph.remove_edge(&incoming.id);
            outcome.replaced.push(incoming);
        }

        self.graph.insert_edge(Edge::new(source, handle, target))?;
        debug!(source, %handle, target, replaced = outcome.replaced.len(), "connected");
        Ok(outcome)
    }

    /// Removes one edge. Nodes are never deleted by a disconnect.
    pub fn disconnect(&mut self, edge: &str) -> Result<Edge, EditError> {
        self.graph
            .remove_edge(edge)
            .ok_or_else(|| EditError::EdgeNotFound(edge.to_string()))
    }

    pub fn set_edge_note(&mut self, edge: &str, note: Option<String>) -> Result<(), EditError> {
        let edge_ref = self
            .graph
            .edge_mut(edge)
            .ok_or_else(|| EditError::EdgeNotFound(edge.to_string()))?;
        edge_ref.note = note;
        Ok(())
    }

    pub fn set_position(&mut self, node: &str, position: Position) -> Result<(), EditError> {
        let node_ref = self
            .graph
            .node_mut(node)
            .ok_or_else(|| GraphError::NodeNotFound(node.to_string()))?;
        node_ref.position = Some(position);
        Ok(())
    }

    pub fn set_terminal_text(&mut self, node: &str, text: &str) -> Result<(), EditError> {
        match self.graph.node_mut(node).map(|n| &mut n.kind) {
            Some(NodeKind::Terminal(terminal)) => {
                terminal.text = text.to_string();
                Ok(())
            }
            Some(NodeKind::Condition(_)) => Err(EditError::NotATerminal(node.to_string())),
            None => Err(GraphError::NodeNotFound(node.to_string()).into()),
        }
    }

    /// Applies field edits to a condition step.
    ///
    /// Right expressions of set-membership steps are normalized to JSON array text;
    /// text that cannot be normalized is kept as typed and rejected at save time.
    pub fn update_step(&mut self, node: &str, update: StepUpdate) -> Result<(), EditError> {
        if self.graph.step(node).is_none() {
            return Err(self.not_a_condition(node));
        }
        let step = self
            .graph
            .step_mut(node)
            .ok_or_else(|| EditError::NotACondition(node.to_string()))?;

        if let Some(name) = update.name {
            step.name = name;
        }
        if let Some(order) = update.order {
            step.order = order;
        }
        if let Some(left) = update.left_expression {
            step.left_expression = left;
        }
        let operator_changed = update.operator.is_some_and(|op| op != step.operator);
        if let Some(operator) = update.operator {
            step.operator = operator;
        }
        let right_changed = update.right_expression.is_some();
        if let Some(right) = update.right_expression {
            step.right_expression = right;
        }
        if let Some(message) = update.failure_message {
            step.failure_message = message;
        }
        if let Some(active) = update.is_active {
            step.is_active = active;
        }

        if step.operator.is_set_membership() && (operator_changed || right_changed) {
            match normalize_list(&step.right_expression) {
                Ok(normalized) => step.right_expression = normalized,
                Err(e) => warn!(node, error = %e, "right expression is not a valid list"),
            }
        }
        Ok(())
    }

    /// Works out what deleting `node` removes without touching the graph.
    ///
    /// A condition step takes its own terminals (by naming convention) with it.
    pub fn plan_delete(&self, node: &str) -> Result<DeletePlan, EditError> {
        let target = self
            .graph
            .node(node)
            .ok_or_else(|| GraphError::NodeNotFound(node.to_string()))?;

        let mut nodes = vec![target.id.clone()];
        let step_id = match &target.kind {
            NodeKind::Condition(step) => {
                nodes.extend(
                    self.graph
                        .terminals()
                        .filter(|(t, _)| is_owned_by(&t.id, node))
                        .map(|(t, _)| t.id.clone()),
                );
                step.step_id
            }
            NodeKind::Terminal(_) => None,
        };

        let edges = nodes
            .iter()
            .flat_map(|id| self.graph.edges_touching(id))
            .unique()
            .collect();

        Ok(DeletePlan {
            root: target.id.clone(),
            step_id,
            nodes,
            edges,
        })
    }

    /// Plans the deletion of `node` and every condition step reachable from it.
    ///
    /// `keep` (usually the workflow's initial step) is never included. Terminals hanging
    /// off a deleted step's branches go with it. Plans are returned in walk order.
    pub fn plan_delete_subtree(&self, node: &str, keep: Option<&str>) -> Result<Vec<DeletePlan>, EditError> {
        if self.graph.step(node).is_none() {
            return Err(self.not_a_condition(node));
        }

        let mut plans = Vec::new();
        let mut claimed: AHashSet<NodeId> = AHashSet::new();
        let mut visited: AHashSet<&str> = AHashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(node);
        queue.push_back(node);

        while let Some(current) = queue.pop_front() {
            let mut plan = self.plan_delete(current)?;

            for branch in Branch::BOTH {
                let mut cursor = self.graph.outgoing(current, branch.into());
                while let Some(edge) = cursor {
                    let Some(next) = self.graph.node(&edge.target) else {
                        break;
                    };
                    if next.is_condition() {
                        if keep != Some(next.id.as_str()) && visited.insert(next.id.as_str()) {
                            queue.push_back(next.id.as_str());
                        }
                        break;
                    }
                    if plan.nodes.contains(&next.id) || claimed.contains(&next.id) {
                        break;
                    }
                    plan.nodes.push(next.id.clone());
                    plan.edges.extend(self.graph.edges_touching(&next.id));
                    cursor = self.graph.outgoing(&next.id, Handle::Next);
                }
            }

            plan.nodes.retain(|id| !claimed.contains(id));
            claimed.extend(plan.nodes.iter().cloned());
            plan.edges = plan.edges.into_iter().unique().collect();
            plans.push(plan);
        }
        Ok(plans)
    }

    /// Removes everything named by `plan`. Returns how many nodes were removed.
    pub fn apply_delete(&mut self, plan: &DeletePlan) -> usize {
        for edge in &plan.edges {
            self.graph.remove_edge(edge);
        }
        let removed = plan
            .nodes
            .iter()
            .filter(|id| self.graph.remove_node(id).is_some())
            .count();
        debug!(root = %plan.root, removed, "deleted nodes");
        removed
    }

    /// The condition step a branch currently leads to, if any.
    pub fn next_step(&self, node: &str, branch: Branch) -> Option<&Node> {
        match self.graph.branch_target(node, branch) {
            Ok(BranchTarget::Step { node, .. }) => Some(node),
            _ => None,
        }
    }

    fn not_a_condition(&self, node: &str) -> EditError {
        if self.graph.contains(node) {
            EditError::NotACondition(node.to_string())
        } else {
            GraphError::NodeNotFound(node.to_string()).into()
        }
    }
}
