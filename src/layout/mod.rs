//! Automatic placement for steps that arrive without stored coordinates.
//!
//! The layout is a pure function of the graph: a breadth-first walk from the initial
//! step, where every child sits one vertical slot below its parent and is shifted left
//! (true branch) or right (false branch) by a spacing that shrinks geometrically with
//! depth. Steps the walk never reaches are lined up in a row below everything else.
//! Nodes that already carry a position are never moved.

use crate::graph::{BranchTarget, GraphModel, Handle, Node, NodeId};
use crate::step::{Branch, Position};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Geometry used by the [`LayoutEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Where the initial step lands when it has no stored position.
    pub root_x: f64,
    pub root_y: f64,
    /// Vertical distance between a step and its children.
    pub slot_height: f64,
    /// Extra vertical room when a step has a terminal child to show.
    pub terminal_slot_extra: f64,
    /// Horizontal branch offset at depth zero.
    pub base_spacing: f64,
    /// Per-level shrink factor applied to `base_spacing`.
    pub decay: f64,
    /// Lower bound for the horizontal branch offset.
    ///
    /// Subtrees are not packed. Once the offset has shrunk to this floor, sibling
    /// subtrees start to overlap: with the defaults, unpositioned steps four or more
    /// levels below the root can land on the same spot. Raise this or `base_spacing`
    /// for deeper trees.
    pub min_spacing: f64,
    /// Offset of a terminal node from the step that owns it.
    pub terminal_offset_x: f64,
    pub terminal_offset_y: f64,
    /// Gap between the deepest laid-out row and the row of unreachable nodes.
    pub disconnected_gap: f64,
    /// Horizontal distance between unreachable nodes.
    pub disconnected_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root_x: 400.0,
            root_y: 50.0,
            slot_height: 150.0,
            terminal_slot_extra: 100.0,
            base_spacing: 400.0,
            decay: 0.7,
            min_spacing: 200.0,
            terminal_offset_x: 160.0,
            terminal_offset_y: 130.0,
            disconnected_gap: 200.0,
            disconnected_spacing: 300.0,
        }
    }
}

impl LayoutConfig {
    /// Horizontal offset between a parent at `level` and its children.
    pub fn spacing_at(&self, level: u32) -> f64 {
        (self.base_spacing * self.decay.powi(level as i32)).max(self.min_spacing)
    }
}

/// Positions computed for nodes that had none. Ordered by node id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub positions: BTreeMap<NodeId, Position>,
}

impl Layout {
    pub fn get(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Writes the computed positions into the graph. Returns how many nodes moved.
    pub fn apply_to(&self, graph: &mut GraphModel) -> usize {
        let mut applied = 0;
        for (id, position) in &self.positions {
            if let Some(node) = graph.node_mut(id) {
                if node.position.is_none() {
                    node.position = Some(*position);
                    applied += 1;
                }
            }
        }
        applied
    }
}

pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Computes positions for every node of `graph` that lacks one.
    ///
    /// `initial` names the entry step. When it is missing or unknown the first step in
    /// order is used instead. A step reachable along several paths (or through a cycle)
    /// is placed on its first visit only.
    pub fn layout(&self, graph: &GraphModel, initial: Option<&str>) -> Layout {
        let mut effective: AHashMap<&str, Position> = graph
            .nodes()
            .iter()
            .filter_map(|n| n.position.map(|p| (n.id.as_str(), p)))
            .collect();
        let mut computed: BTreeMap<NodeId, Position> = BTreeMap::new();
        let mut visited: AHashSet<&str> = AHashSet::new();

        if let Some(root) = self.pick_root(graph, initial) {
            self.walk_from(graph, root, &mut effective, &mut computed, &mut visited);
        }
        self.place_terminals(graph, &mut effective, &mut computed);

        let unplaced: Vec<&Node> = graph
            .steps()
            .map(|(node, _)| node)
            .filter(|node| !visited.contains(node.id.as_str()) && !effective.contains_key(node.id.as_str()))
            .collect();
        let mut row = self.disconnected_row(&effective);
        for node in unplaced {
            let position = row.next_slot();
            effective.insert(node.id.as_str(), position);
            computed.insert(node.id.clone(), position);
        }
        self.place_terminals(graph, &mut effective, &mut computed);

        // Terminals without a positioned owner go at the end of a fresh row.
        let mut row = self.disconnected_row(&effective);
        for (node, _) in graph.terminals() {
            if !effective.contains_key(node.id.as_str()) {
                let position = row.next_slot();
                effective.insert(node.id.as_str(), position);
                computed.insert(node.id.clone(), position);
            }
        }

        debug!(placed = computed.len(), "layout computed");
        Layout {
            positions: computed,
        }
    }

    fn pick_root<'g>(&self, graph: &'g GraphModel, initial: Option<&str>) -> Option<&'g Node> {
        initial
            .and_then(|id| graph.node(id))
            .filter(|node| node.is_condition())
            .or_else(|| {
                graph
                    .steps()
                    .min_by_key(|(_, step)| step.order)
                    .map(|(node, _)| node)
            })
    }

    fn walk_from<'g>(
        &self,
        graph: &'g GraphModel,
        root: &'g Node,
        effective: &mut AHashMap<&'g str, Position>,
        computed: &mut BTreeMap<NodeId, Position>,
        visited: &mut AHashSet<&'g str>,
    ) {
        if !effective.contains_key(root.id.as_str()) {
            let position = Position::new(self.config.root_x, self.config.root_y);
            effective.insert(root.id.as_str(), position);
            computed.insert(root.id.clone(), position);
        }

        let mut queue: VecDeque<(&'g Node, u32)> = VecDeque::new();
        visited.insert(root.id.as_str());
        queue.push_back((root, 0));

        while let Some((node, level)) = queue.pop_front() {
            let Some(origin) = effective.get(node.id.as_str()).copied() else {
                continue;
            };
            let slot = self.slot_for(graph, node);
            let spacing = self.config.spacing_at(level);

            for branch in Branch::BOTH {
                let Ok(BranchTarget::Step { node: child, .. }) = graph.branch_target(&node.id, branch)
                else {
                    continue;
                };
                if !visited.insert(child.id.as_str()) {
                    continue;
                }
                if !effective.contains_key(child.id.as_str()) {
                    let dx = match branch {
                        Branch::True => -spacing,
                        Branch::False => spacing,
                    };
                    let position = origin.offset(dx, slot);
                    effective.insert(child.id.as_str(), position);
                    computed.insert(child.id.clone(), position);
                }
                queue.push_back((child, level + 1));
            }
        }
    }

    /// Vertical slot below `node`, enlarged when one of its branches ends in a terminal.
    fn slot_for(&self, graph: &GraphModel, node: &Node) -> f64 {
        let has_terminal_child = Branch::BOTH.iter().any(|branch| {
            graph
                .outgoing(&node.id, (*branch).into())
                .and_then(|edge| graph.node(&edge.target))
                .is_some_and(Node::is_terminal)
        });
        if has_terminal_child {
            self.config.slot_height + self.config.terminal_slot_extra
        } else {
            self.config.slot_height
        }
    }

    /// Places terminals next to whichever node feeds them, repeating until chains settle.
    fn place_terminals<'g>(
        &self,
        graph: &'g GraphModel,
        effective: &mut AHashMap<&'g str, Position>,
        computed: &mut BTreeMap<NodeId, Position>,
    ) {
        loop {
            let mut progressed = false;
            for (node, _) in graph.terminals() {
                if effective.contains_key(node.id.as_str()) {
                    continue;
                }
                let Some(edge) = graph.incoming(&node.id) else {
                    continue;
                };
                let Some(owner) = effective.get(edge.source.as_str()).copied() else {
                    continue;
                };
                let dx = match edge.handle {
                    Handle::True => -self.config.terminal_offset_x,
                    Handle::False => self.config.terminal_offset_x,
                    Handle::Next => 0.0,
                };
                let position = owner.offset(dx, self.config.terminal_offset_y);
                effective.insert(node.id.as_str(), position);
                computed.insert(node.id.clone(), position);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
    }

    fn disconnected_row(&self, effective: &AHashMap<&str, Position>) -> Row {
        if effective.is_empty() {
            return Row {
                x: self.config.root_x,
                y: self.config.root_y,
                spacing: self.config.disconnected_spacing,
            };
        }
        let max_y = effective.values().map(|p| p.y).fold(f64::MIN, f64::max);
        let min_x = effective.values().map(|p| p.x).fold(f64::MAX, f64::min);
        Row {
            x: min_x,
            y: max_y + self.config.disconnected_gap,
            spacing: self.config.disconnected_spacing,
        }
    }
}

struct Row {
    x: f64,
    y: f64,
    spacing: f64,
}

impl Row {
    fn next_slot(&mut self) -> Position {
        let position = Position::new(self.x, self.y);
        self.x += self.spacing;
        position
    }
}
