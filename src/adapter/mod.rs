//! Conversion between the store's flat step list and the editing graph.
//!
//! Loading turns every step into a condition node, every `proceed_to_step_by_id`
//! action into an edge between two condition nodes, and every completion into a
//! terminal node owned by the step. Positions missing from the store are filled in by
//! the [`LayoutEngine`], and the snapshot table is seeded from what was loaded so an
//! untouched workflow diffs to nothing.

pub mod render;

pub use render::{EditorStatus, RenderEdge, RenderGraph, RenderKind, RenderNode};

use crate::config::NoteConfig;
use crate::error::{ConversionError, ValidationError};
use crate::graph::{Edge, GraphModel, Node, NodeId, Outcome, StepNode, TerminalNode, step_node_id, terminal_id};
use crate::layout::{LayoutConfig, LayoutEngine};
use crate::step::{Action, Branch, StepId, StepRecord, WorkflowMeta, WorkflowRecord};
use crate::sync::{ActionResolver, SnapshotTable, StepSnapshot};
use ahash::AHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Something in the stored workflow that could not be shown as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadWarning {
    /// A step proceeds to a step that does not exist.
    DanglingReference {
        step_id: StepId,
        branch: Branch,
        target: StepId,
    },
    /// A step proceeds to a step that another branch already leads to.
    SharedTarget {
        step_id: StepId,
        branch: Branch,
        target: StepId,
    },
    /// The workflow names an initial step that does not exist.
    MissingInitialStep(StepId),
    /// The stored watermark was not above every existing identifier.
    WatermarkRaised { stored: StepId, raised: StepId },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::DanglingReference {
                step_id,
                branch,
                target,
            } => write!(f, "Step {} ({} branch) proceeds to missing step {}", step_id, branch, target),
            LoadWarning::SharedTarget {
                step_id,
                branch,
                target,
            } => write!(
                f,
                "Step {} ({} branch) proceeds to step {}, which is already targeted; the link is not shown",
                step_id, branch, target
            ),
            LoadWarning::MissingInitialStep(id) => write!(f, "Initial step {} does not exist", id),
            LoadWarning::WatermarkRaised { stored, raised } => {
                write!(f, "Watermark {} raised to {} to cover existing steps", stored, raised)
            }
        }
    }
}

/// A workflow ready for editing.
#[derive(Debug, Clone)]
pub struct LoadedWorkflow {
    pub meta: WorkflowMeta,
    pub initial_step: Option<NodeId>,
    pub graph: GraphModel,
    pub snapshots: SnapshotTable,
    pub watermark: StepId,
    pub warnings: Vec<LoadWarning>,
}

pub struct PresentationAdapter;

impl PresentationAdapter {
    /// Builds the editing graph for `record`.
    pub fn load(record: WorkflowRecord, layout: &LayoutConfig) -> Result<LoadedWorkflow, ConversionError> {
        let meta = record.meta();
        let mut warnings = Vec::new();

        let steps: Vec<&StepRecord> = record
            .steps
            .iter()
            .sorted_by_key(|s| (s.order, s.id))
            .collect();

        let mut graph = GraphModel::new();
        let mut seen: AHashSet<StepId> = AHashSet::new();
        for step in &steps {
            let id = step.id.ok_or(ConversionError::MissingStepId)?;
            if !seen.insert(id) {
                return Err(ConversionError::DuplicateStep(id));
            }
            graph.insert_node(Node::condition(step_node_id(id), step_node(step), step.position()))?;
        }

        for step in &steps {
            let id = step.id.ok_or(ConversionError::MissingStepId)?;
            let source = step_node_id(id);
            for branch in Branch::BOTH {
                Self::load_branch(&mut graph, &source, id, branch, step.action(branch)?, &mut warnings)?;
            }
        }

        let initial_step = match record.initial_step {
            Some(id) if seen.contains(&id) => Some(step_node_id(id)),
            Some(id) => {
                warn!(initial_step = id, "initial step does not exist");
                warnings.push(LoadWarning::MissingInitialStep(id));
                None
            }
            None => None,
        }
        .or_else(|| steps.first().and_then(|s| s.id).map(step_node_id));

        let computed = LayoutEngine::new(*layout).layout(&graph, initial_step.as_deref());
        let placed = computed.apply_to(&mut graph);
        debug!(placed, "laid out nodes without stored positions");

        let mut snapshots = SnapshotTable::new();
        for step in &steps {
            let Some(id) = step.id else { continue };
            let node = step_node_id(id);
            let mut snapshot = StepSnapshot::from_record(step)?;
            snapshot.position = graph.node(&node).and_then(|n| n.position);
            snapshots.insert(node, snapshot);
        }

        let mut watermark = record.new_step_id;
        if let Some(highest) = seen.iter().max()
            && *highest >= watermark
        {
            let raised = highest + 1;
            warn!(stored = watermark, raised, "watermark below existing step ids");
            warnings.push(LoadWarning::WatermarkRaised {
                stored: watermark,
                raised,
            });
            watermark = raised;
        }

        info!(
            workflow = ?meta.id,
            steps = steps.len(),
            nodes = graph.nodes().len(),
            warnings = warnings.len(),
            "workflow loaded"
        );

        Ok(LoadedWorkflow {
            meta,
            initial_step,
            graph,
            snapshots,
            watermark,
            warnings,
        })
    }

    fn load_branch(
        graph: &mut GraphModel,
        source: &str,
        step_id: StepId,
        branch: Branch,
        action: Action,
        warnings: &mut Vec<LoadWarning>,
    ) -> Result<(), ConversionError> {
        let (outcome, text) = match action {
            Action::ProceedToStep { next_step_id, note } => {
                let target = step_node_id(next_step_id);
                if !graph.contains(&target) {
                    warn!(step_id, %branch, target = next_step_id, "dropping reference to missing step");
                    warnings.push(LoadWarning::DanglingReference {
                        step_id,
                        branch,
                        target: next_step_id,
                    });
                    return Ok(());
                }
                if graph.incoming(&target).is_some() {
                    warn!(step_id, %branch, target = next_step_id, "dropping second reference to step");
                    warnings.push(LoadWarning::SharedTarget {
                        step_id,
                        branch,
                        target: next_step_id,
                    });
                    return Ok(());
                }
                graph.insert_edge(Edge::new(source, branch.into(), target).with_note(note))?;
                return Ok(());
            }
            Action::CompleteSuccess { message } => (Outcome::Success, message),
            Action::CompleteFailure { error } => (Outcome::Failure, error),
        };

        let id = terminal_id(source, branch, outcome);
        graph.insert_node(Node::terminal(id.clone(), TerminalNode { outcome, text }, None))?;
        graph.insert_edge(Edge::new(source, branch.into(), id))?;
        Ok(())
    }

    /// The full step list for `graph`, as bulk-create would send it.
    ///
    /// Every step must already carry an identifier.
    pub fn to_records(graph: &GraphModel, notes: &NoteConfig) -> Result<Vec<StepRecord>, ValidationError> {
        let resolver = ActionResolver::new(graph, notes);
        graph
            .steps()
            .map(|(node, step)| resolver.payload(node, step).map(|p| p.to_record()))
            .collect()
    }
}

fn step_node(record: &StepRecord) -> StepNode {
    StepNode {
        step_id: record.id,
        name: record.name.clone(),
        order: record.order,
        left_expression: record.left_expression.clone(),
        operator: record.operator,
        right_expression: record.right_expression.clone(),
        failure_message: record.failure_message.clone(),
        is_active: record.is_active,
    }
}
