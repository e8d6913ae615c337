//! Tests for the editing surface and its self-repairing connect rules.
mod common;
use bunki::prelude::*;
use common::*;

fn session_with_steps(names: &[&str]) -> (EditSession, Vec<NodeId>) {
    let mut session = EditSession::new(GraphModel::new());
    let ids = names
        .iter()
        .map(|name| session.add_step(new_step(name), None).expect("add step"))
        .collect();
    (session, ids)
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_add_step_assigns_node_ids_and_order() {
        let (session, ids) = session_with_steps(&["a", "b"]);
        assert_eq!(ids, vec!["new-1".to_string(), "new-2".to_string()]);
        assert_eq!(session.graph().step("new-1").map(|s| s.order), Some(1));
        assert_eq!(session.graph().step("new-2").map(|s| s.order), Some(2));
        assert!(session.graph().step("new-1").unwrap().step_id.is_none());
    }

    #[test]
    fn test_connect_replaces_existing_branch_edge() {
        let (mut session, ids) = session_with_steps(&["a", "b", "c"]);
        session.connect(&ids[0], Handle::True, &ids[1]).unwrap();

        let outcome = session.connect(&ids[0], Handle::True, &ids[2]).unwrap();

        assert_eq!(outcome.replaced.len(), 1);
        assert_eq!(outcome.replaced[0].target, ids[1]);
        assert!(outcome.removed_terminals.is_empty());
        // A condition step is never deleted by a replacement.
        assert!(session.graph().contains(&ids[1]));
        assert_eq!(session.graph().outgoing(&ids[0], Handle::True).map(|e| e.target.as_str()), Some(ids[2].as_str()));
        assert!(session.graph().incoming(&ids[1]).is_none());
    }

    #[test]
    fn test_connect_drops_abandoned_terminal() {
        let (mut session, ids) = session_with_steps(&["a", "b"]);
        let terminal = session
            .attach_terminal(&ids[0], Branch::True, Outcome::Success, "ok")
            .unwrap();
        assert_eq!(terminal, format!("{}:true:success", ids[0]));

        let outcome = session.connect(&ids[0], Handle::True, &ids[1]).unwrap();

        assert_eq!(outcome.removed_terminals, vec![terminal.clone()]);
        assert!(!session.graph().contains(&terminal));
        assert_eq!(session.graph().edges().len(), 1);
    }

    #[test]
    fn test_connect_detaches_previous_parent_of_target() {
        let (mut session, ids) = session_with_steps(&["a", "b", "c"]);
        session.connect(&ids[0], Handle::True, &ids[2]).unwrap();

        let outcome = session.connect(&ids[1], Handle::False, &ids[2]).unwrap();

        assert_eq!(outcome.replaced.len(), 1);
        assert_eq!(outcome.replaced[0].source, ids[0]);
        assert!(session.graph().outgoing(&ids[0], Handle::True).is_none());
        assert_eq!(session.graph().incoming(&ids[2]).map(|e| e.source.as_str()), Some(ids[1].as_str()));
        assert!(session.graph().contains(&ids[0]));
    }

    #[test]
    fn test_connect_same_edge_twice_is_a_no_op() {
        let (mut session, ids) = session_with_steps(&["a", "b"]);
        session.connect(&ids[0], Handle::False, &ids[1]).unwrap();
        let outcome = session.connect(&ids[0], Handle::False, &ids[1]).unwrap();
        assert!(outcome.replaced.is_empty());
        assert_eq!(session.graph().edges().len(), 1);
    }

    #[test]
    fn test_connect_rejects_unknown_nodes_and_bad_handles() {
        let (mut session, ids) = session_with_steps(&["a"]);
        assert!(session.connect(&ids[0], Handle::True, "missing").is_err());
        assert!(session.connect("missing", Handle::True, &ids[0]).is_err());
        assert!(session.connect(&ids[0], Handle::Next, &ids[0]).is_err());
    }

    #[test]
    fn test_invariants_hold_after_any_sequence_of_edits() {
        let (mut session, ids) = session_with_steps(&["a", "b", "c", "d"]);
        let t1 = session.add_terminal(Outcome::Success, "done", None).unwrap();
        let t2 = session.add_terminal(Outcome::Failure, "stop", None).unwrap();

        let mut nodes = ids.clone();
        nodes.push(t1.clone());
        nodes.push(t2.clone());

        // A fixed pseudo-random walk over (source, handle, target) triples.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..200 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let source = &nodes[(seed % nodes.len() as u64) as usize];
            let target = &nodes[((seed >> 8) % nodes.len() as u64) as usize];
            let handle = match (seed >> 16) % 3 {
                0 => Handle::True,
                1 => Handle::False,
                _ => Handle::Next,
            };
            if session.graph().contains(source) && session.graph().contains(target) {
                let _ = session.connect(source, handle, target);
            }
            if (seed >> 24) % 7 == 0 {
                if let Some(edge) = session.graph().edges().first().map(|e| e.id.clone()) {
                    session.disconnect(&edge).unwrap();
                }
            }
            session.graph().check_invariants().expect("invariants hold");
        }
    }

    #[test]
    fn test_disconnect_never_deletes_nodes() {
        let (mut session, ids) = session_with_steps(&["a"]);
        let terminal = session
            .attach_terminal(&ids[0], Branch::False, Outcome::Failure, "no")
            .unwrap();
        let edge = session.graph().incoming(&terminal).unwrap().id.clone();

        session.disconnect(&edge).unwrap();

        assert!(session.graph().contains(&terminal));
        assert!(session.graph().edges().is_empty());
        assert!(session.disconnect(&edge).is_err());
    }

    #[test]
    fn test_plan_delete_of_step_takes_its_own_terminals() {
        let (mut session, ids) = session_with_steps(&["a", "b"]);
        session.connect(&ids[1], Handle::True, &ids[0]).unwrap();
        session.attach_terminal(&ids[0], Branch::True, Outcome::Success, "ok").unwrap();
        session.attach_terminal(&ids[0], Branch::False, Outcome::Failure, "no").unwrap();

        let plan = session.plan_delete(&ids[0]).unwrap();
        assert_eq!(plan.nodes.len(), 3);
        assert_eq!(plan.edges.len(), 3);

        let removed = session.apply_delete(&plan);
        assert_eq!(removed, 3);
        assert_eq!(session.graph().nodes().len(), 1);
        assert!(session.graph().edges().is_empty());
    }

    #[test]
    fn test_plan_delete_of_terminal_takes_only_that_node() {
        let (mut session, ids) = session_with_steps(&["a"]);
        let ok = session.attach_terminal(&ids[0], Branch::True, Outcome::Success, "ok").unwrap();
        session.attach_terminal(&ids[0], Branch::False, Outcome::Failure, "no").unwrap();

        let plan = session.plan_delete(&ok).unwrap();
        assert_eq!(plan.nodes, vec![ok.clone()]);
        assert_eq!(plan.step_id, None);
        session.apply_delete(&plan);

        assert!(session.graph().contains(&ids[0]));
        assert_eq!(session.graph().nodes().len(), 2);
        assert_eq!(session.graph().edges().len(), 1);
    }

    #[test]
    fn test_plan_delete_subtree_stops_at_kept_step() {
        let (mut session, ids) = session_with_steps(&["root", "a", "b", "c"]);
        session.connect(&ids[0], Handle::True, &ids[1]).unwrap();
        session.connect(&ids[1], Handle::True, &ids[2]).unwrap();
        session.connect(&ids[1], Handle::False, &ids[3]).unwrap();
        // Loop back to the root from deep in the tree.
        session.connect(&ids[3], Handle::True, &ids[0]).unwrap();

        let plans = session.plan_delete_subtree(&ids[1], Some(ids[0].as_str())).unwrap();
        let roots: Vec<&str> = plans.iter().map(|p| p.root.as_str()).collect();
        assert_eq!(roots, vec![ids[1].as_str(), ids[2].as_str(), ids[3].as_str()]);

        for plan in &plans {
            session.apply_delete(plan);
        }
        assert_eq!(session.graph().nodes().len(), 1);
        assert!(session.graph().contains(&ids[0]));
    }

    #[test]
    fn test_update_step_normalizes_set_membership_lists() {
        let (mut session, ids) = session_with_steps(&["a"]);
        session
            .update_step(
                &ids[0],
                StepUpdate {
                    operator: Some(Operator::In),
                    right_expression: Some("DE, FR ,NL".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(session.graph().step(&ids[0]).unwrap().right_expression, r#"["DE","FR","NL"]"#);

        // Unparseable text is kept as typed.
        session
            .update_step(
                &ids[0],
                StepUpdate {
                    right_expression: Some("[1, 2".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(session.graph().step(&ids[0]).unwrap().right_expression, "[1, 2");
    }

    #[test]
    fn test_update_step_rejects_terminals() {
        let (mut session, ids) = session_with_steps(&["a"]);
        let terminal = session.attach_terminal(&ids[0], Branch::True, Outcome::Success, "").unwrap();
        let err = session.update_step(&terminal, StepUpdate::default()).unwrap_err();
        assert_eq!(err, EditError::NotACondition(terminal));
    }

    #[test]
    fn test_attach_terminal_reuses_existing_terminal() {
        let (mut session, ids) = session_with_steps(&["a"]);
        let first = session.attach_terminal(&ids[0], Branch::True, Outcome::Success, "one").unwrap();
        let second = session.attach_terminal(&ids[0], Branch::True, Outcome::Success, "two").unwrap();
        assert_eq!(first, second);
        assert_eq!(session.graph().nodes().len(), 2);
        let text = session.graph().node(&first).and_then(|n| n.as_terminal()).map(|t| t.text.clone());
        assert_eq!(text.as_deref(), Some("two"));
    }
}
