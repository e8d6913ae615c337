use crate::graph::{GraphModel, Handle, NodeKind, Outcome};
use crate::step::Position;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderKind {
    Condition,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: String,
    pub kind: RenderKind,
    pub label: String,
    /// `left operator right` for condition nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub position: Option<Position>,
    #[serde(default)]
    pub is_initial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEdge {
    pub id: String,
    pub source: String,
    pub source_handle: Handle,
    pub target: String,
    pub label: String,
}

/// Flags that drive the editor's save affordances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorStatus {
    pub dirty: bool,
    pub saving: bool,
}

/// Node and edge lists ready for a canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub status: EditorStatus,
}

impl RenderGraph {
    pub fn build(graph: &GraphModel, initial_step: Option<&str>, status: EditorStatus) -> Self {
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Condition(step) => RenderNode {
                    id: node.id.clone(),
                    kind: RenderKind::Condition,
                    label: step.name.clone(),
                    detail: Some(format!(
                        "{} {} {}",
                        step.left_expression,
                        step.operator.symbol(),
                        step.right_expression
                    )),
                    position: node.position,
                    is_initial: initial_step == Some(node.id.as_str()),
                },
                NodeKind::Terminal(terminal) => RenderNode {
                    id: node.id.clone(),
                    kind: match terminal.outcome {
                        Outcome::Success => RenderKind::Success,
                        Outcome::Failure => RenderKind::Failure,
                    },
                    label: terminal.text.clone(),
                    detail: None,
                    position: node.position,
                    is_initial: false,
                },
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .map(|edge| RenderEdge {
                id: edge.id.clone(),
                source: edge.source.clone(),
                source_handle: edge.handle,
                target: edge.target.clone(),
                label: edge
                    .note
                    .clone()
                    .filter(|note| !note.is_empty())
                    .unwrap_or_else(|| edge.handle.as_str().to_string()),
            })
            .collect();

        Self { nodes, edges, status }
    }

    pub fn node(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
