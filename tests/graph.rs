//! Tests for the graph model's structural rules and branch resolution.
mod common;
use bunki::error::GraphError;
use bunki::graph::{BranchTarget, TerminalNode, is_owned_by, parse_terminal_id, terminal_id};
use bunki::prelude::*;
use common::*;

fn condition(id: &str) -> Node {
    Node::condition(id, new_step(id), None)
}

fn terminal(id: &str, outcome: Outcome, text: &str) -> Node {
    Node::terminal(
        id,
        TerminalNode {
            outcome,
            text: text.to_string(),
        },
        None,
    )
}

#[cfg(test)]
mod graph_tests {
    use super::*;

    #[test]
    fn test_outgoing_and_incoming_queries() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        graph.insert_node(condition("b")).unwrap();
        graph.insert_edge(Edge::new("a", Handle::True, "b")).unwrap();

        let edge = graph.outgoing("a", Handle::True).expect("true edge");
        assert_eq!(edge.target, "b");
        assert_eq!(edge.id, "edge:a:true");
        assert!(graph.outgoing("a", Handle::False).is_none());
        assert_eq!(graph.incoming("b").map(|e| e.source.as_str()), Some("a"));
        assert!(graph.incoming("a").is_none());
    }

    #[test]
    fn test_duplicate_node_is_rejected() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        let err = graph.insert_node(condition("a")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateNode("a".to_string()));
    }

    #[test]
    fn test_second_outgoing_edge_on_same_handle_is_rejected() {
        let mut graph = GraphModel::new();
        for id in ["a", "b", "c"] {
            graph.insert_node(condition(id)).unwrap();
        }
        graph.insert_edge(Edge::new("a", Handle::True, "b")).unwrap();

        let err = graph.insert_edge(Edge::new("a", Handle::True, "c")).unwrap_err();
        assert!(matches!(err, GraphError::OutgoingOccupied { ref node, handle: Handle::True, .. } if node == "a"));
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_second_incoming_edge_is_rejected() {
        let mut graph = GraphModel::new();
        for id in ["a", "b", "c"] {
            graph.insert_node(condition(id)).unwrap();
        }
        graph.insert_edge(Edge::new("a", Handle::True, "c")).unwrap();

        let err = graph.insert_edge(Edge::new("b", Handle::False, "c")).unwrap_err();
        assert!(matches!(err, GraphError::IncomingOccupied { ref target, .. } if target == "c"));
    }

    #[test]
    fn test_handles_are_checked_against_node_kind() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        graph.insert_node(terminal("t", Outcome::Success, "ok")).unwrap();

        let err = graph.insert_edge(Edge::new("t", Handle::True, "a")).unwrap_err();
        assert!(matches!(err, GraphError::InvalidHandle { handle: Handle::True, .. }));
        let err = graph.insert_edge(Edge::new("a", Handle::Next, "t")).unwrap_err();
        assert!(matches!(err, GraphError::InvalidHandle { handle: Handle::Next, .. }));

        graph.insert_edge(Edge::new("t", Handle::Next, "a")).unwrap();
    }

    #[test]
    fn test_remove_node_takes_touching_edges() {
        let mut graph = GraphModel::new();
        for id in ["a", "b", "c"] {
            graph.insert_node(condition(id)).unwrap();
        }
        graph.insert_edge(Edge::new("a", Handle::True, "b")).unwrap();
        graph.insert_edge(Edge::new("b", Handle::False, "c")).unwrap();

        let (node, edges) = graph.remove_node("b").expect("node exists");
        assert_eq!(node.id, "b");
        assert_eq!(edges.len(), 2);
        assert!(graph.edges().is_empty());
        assert!(graph.remove_node("b").is_none());
    }

    #[test]
    fn test_branch_target_resolves_each_case() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        graph.insert_node(condition("b")).unwrap();
        graph.insert_node(terminal("t", Outcome::Failure, "nope")).unwrap();
        graph.insert_edge(Edge::new("a", Handle::True, "b")).unwrap();
        graph.insert_edge(Edge::new("a", Handle::False, "t")).unwrap();

        match graph.branch_target("a", Branch::True).unwrap() {
            BranchTarget::Step { node, via } => {
                assert_eq!(node.id, "b");
                assert!(via.is_none());
            }
            other => panic!("expected step, got {:?}", other),
        }
        assert!(matches!(
            graph.branch_target("a", Branch::False).unwrap(),
            BranchTarget::Terminal(node) if node.id == "t"
        ));
        assert!(matches!(graph.branch_target("b", Branch::True).unwrap(), BranchTarget::Open));
    }

    #[test]
    fn test_branch_target_passes_through_chained_terminal() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        graph.insert_node(condition("b")).unwrap();
        graph.insert_node(terminal("t", Outcome::Success, "retry")).unwrap();
        graph.insert_edge(Edge::new("a", Handle::True, "t")).unwrap();
        graph.insert_edge(Edge::new("t", Handle::Next, "b")).unwrap();

        match graph.branch_target("a", Branch::True).unwrap() {
            BranchTarget::Step { node, via } => {
                assert_eq!(node.id, "b");
                assert_eq!(via.map(|v| v.id.as_str()), Some("t"));
            }
            other => panic!("expected pass-through to b, got {:?}", other),
        }
        assert_eq!(graph.next_step("a", Branch::True).map(|n| n.id.as_str()), Some("b"));
    }

    #[test]
    fn test_terminal_chain_cannot_loop_back() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        graph.insert_node(terminal("t1", Outcome::Success, "")).unwrap();
        graph.insert_node(terminal("t2", Outcome::Success, "done")).unwrap();
        graph.insert_edge(Edge::new("a", Handle::True, "t1")).unwrap();
        graph.insert_edge(Edge::new("t1", Handle::Next, "t2")).unwrap();

        // t1 already has its one parent.
        let err = graph.insert_edge(Edge::new("t2", Handle::Next, "t1")).unwrap_err();
        assert!(matches!(err, GraphError::IncomingOccupied { .. }));

        assert!(matches!(
            graph.branch_target("a", Branch::True).unwrap(),
            BranchTarget::Terminal(node) if node.id == "t2"
        ));
    }

    #[test]
    fn test_step_may_point_back_to_an_ancestor() {
        let mut graph = GraphModel::new();
        graph.insert_node(condition("a")).unwrap();
        graph.insert_node(condition("b")).unwrap();
        graph.insert_edge(Edge::new("a", Handle::True, "b")).unwrap();
        graph.insert_edge(Edge::new("b", Handle::False, "a")).unwrap();

        assert!(graph.check_invariants().is_ok());
        assert_eq!(graph.next_step("b", Branch::False).map(|n| n.id.as_str()), Some("a"));
    }

    #[test]
    fn test_terminal_ids_round_trip_through_naming_convention() {
        let id = terminal_id("step-42", Branch::False, Outcome::Failure);
        assert_eq!(id, "step-42:false:failure");
        assert_eq!(parse_terminal_id(&id), Some(("step-42", Branch::False, Outcome::Failure)));
        assert!(is_owned_by(&id, "step-42"));
        assert!(!is_owned_by(&id, "step-4"));
        assert!(!is_owned_by("terminal-3", "step-42"));
        assert_eq!(parse_terminal_id(":true:success"), None);
    }
}
