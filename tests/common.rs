//! Common test utilities for building workflow records, graphs and stores.
use bunki::prelude::*;
use std::sync::Arc;

#[allow(dead_code)]
pub fn proceed(next_step_id: StepId, note: &str) -> Action {
    Action::ProceedToStep {
        next_step_id,
        note: note.to_string(),
    }
}

#[allow(dead_code)]
pub fn success(message: &str) -> Action {
    Action::CompleteSuccess {
        message: message.to_string(),
    }
}

#[allow(dead_code)]
pub fn failure(error: &str) -> Action {
    Action::CompleteFailure {
        error: error.to_string(),
    }
}

/// Builds a stored step record with both actions and an optional position.
#[allow(dead_code)]
pub fn step_record(
    id: StepId,
    name: &str,
    order: u32,
    if_true: Action,
    if_false: Action,
    position: Option<(f64, f64)>,
) -> StepRecord {
    let mut record = StepRecord {
        id: Some(id),
        name: name.to_string(),
        order,
        x: position.map(|(x, _)| x),
        y: position.map(|(_, y)| y),
        left_expression: format!("{{{{field_{}}}}}", id),
        operator: Operator::Equal,
        right_expression: "1".to_string(),
        if_true_action: if_true.kind(),
        if_true_action_data: serde_json::Value::Null,
        if_false_action: if_false.kind(),
        if_false_action_data: serde_json::Value::Null,
        failure_message: None,
        is_active: true,
    };
    record.set_action(Branch::True, &if_true);
    record.set_action(Branch::False, &if_false);
    record
}

#[allow(dead_code)]
pub fn workflow_record(
    id: WorkflowId,
    watermark: StepId,
    initial_step: Option<StepId>,
    steps: Vec<StepRecord>,
) -> WorkflowRecord {
    WorkflowRecord {
        id: Some(id),
        name: format!("Workflow {}", id),
        execution_point: "transaction".to_string(),
        is_active: true,
        is_default: false,
        initial_step,
        new_step_id: watermark,
        steps,
        extra: serde_json::Map::new(),
    }
}

/// A two-step workflow.
///
/// Step 42 (initial, positioned) checks an amount: true proceeds to 43, false fails
/// with "too small". Step 43 (no stored position) succeeds with "approved" or fails
/// with "blocked".
#[allow(dead_code)]
pub fn sample_workflow() -> WorkflowRecord {
    workflow_record(
        1,
        50,
        Some(42),
        vec![
            step_record(
                42,
                "Amount check",
                1,
                proceed(43, "amount ok"),
                failure("too small"),
                Some((400.0, 50.0)),
            ),
            step_record(43, "Country check", 2, success("approved"), failure("blocked"), None),
        ],
    )
}

/// An existing workflow without any steps yet.
#[allow(dead_code)]
pub fn empty_workflow(id: WorkflowId, watermark: StepId) -> WorkflowRecord {
    workflow_record(id, watermark, None, Vec::new())
}

#[allow(dead_code)]
pub fn store_with(record: WorkflowRecord) -> Arc<InMemoryStepStore> {
    Arc::new(InMemoryStepStore::new().with_workflow(record))
}

#[allow(dead_code)]
pub fn editor_for(record: WorkflowRecord) -> WorkflowEditor<InMemoryStepStore> {
    WorkflowEditor::from_record(store_with(record.clone()), record, EditorConfig::default()).expect("Failed to open workflow")
}

/// A fresh condition step with the given name.
#[allow(dead_code)]
pub fn new_step(name: &str) -> StepNode {
    StepNode::new(name, "{{amount}}", Operator::GreaterThan, "10")
}

#[allow(dead_code)]
pub fn sync_engine(watermark: StepId) -> SyncEngine {
    SyncEngine::new(Some(1), watermark, Default::default(), NoteConfig::default())
}
