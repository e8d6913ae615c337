use super::{BulkCreateRequest, BulkCreateResponse, BulkUpdateRequest, BulkUpdateResponse, StepStore};
use crate::error::StoreError;
use crate::step::{Branch, Datasource, StepId, StepRecord, WorkflowId, WorkflowRecord};
use crate::sync::StepPatch;
use ahash::AHashMap;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FetchWorkflow,
    BulkCreate,
    BulkUpdate,
    DeleteStep,
    Datasources,
}

/// One recorded call, with its request.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FetchWorkflow(WorkflowId),
    BulkCreate(BulkCreateRequest),
    BulkUpdate(BulkUpdateRequest),
    DeleteStep(StepId),
    Datasources(String),
}

impl StoreCall {
    pub fn operation(&self) -> StoreOperation {
        match self {
            StoreCall::FetchWorkflow(_) => StoreOperation::FetchWorkflow,
            StoreCall::BulkCreate(_) => StoreOperation::BulkCreate,
            StoreCall::BulkUpdate(_) => StoreOperation::BulkUpdate,
            StoreCall::DeleteStep(_) => StoreOperation::DeleteStep,
            StoreCall::Datasources(_) => StoreOperation::Datasources,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    workflows: BTreeMap<WorkflowId, WorkflowRecord>,
    datasources: AHashMap<String, Vec<Datasource>>,
    calls: Vec<StoreCall>,
    failures: AHashMap<StoreOperation, StoreError>,
    id_offset: StepId,
}

/// A step store held entirely in memory.
///
/// Every call is recorded, failures can be injected per operation, and created steps
/// can be given identifiers other than the provisional ones they were sent with.
#[derive(Debug, Default)]
pub struct InMemoryStepStore {
    inner: Mutex<Inner>,
}

impl InMemoryStepStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflow(self, workflow: WorkflowRecord) -> Self {
        self.insert_workflow(workflow);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores `workflow`, which must carry an id.
    pub fn insert_workflow(&self, workflow: WorkflowRecord) {
        if let Some(id) = workflow.id {
            self.lock().workflows.insert(id, workflow);
        }
    }

    pub fn workflow(&self, id: WorkflowId) -> Option<WorkflowRecord> {
        self.lock().workflows.get(&id).cloned()
    }

    pub fn set_datasources(&self, execution_point: &str, datasources: Vec<Datasource>) {
        self.lock()
            .datasources
            .insert(execution_point.to_string(), datasources);
    }

    /// Makes every later `operation` call fail with `error`.
    pub fn fail(&self, operation: StoreOperation, error: StoreError) {
        self.lock().failures.insert(operation, error);
    }

    pub fn clear_failure(&self, operation: StoreOperation) {
        self.lock().failures.remove(&operation);
    }

    /// Created steps get their provisional id plus `offset`.
    pub fn reassign_ids(&self, offset: StepId) {
        self.lock().id_offset = offset;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: StoreOperation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, call: StoreCall) -> Result<MutexGuard<'_, Inner>, StoreError> {
        let mut inner = self.lock();
        let operation = call.operation();
        inner.calls.push(call);
        if let Some(error) = inner.failures.get(&operation).cloned() {
            return Err(error);
        }
        Ok(inner)
    }

    fn create(&self, request: BulkCreateRequest) -> Result<BulkCreateResponse, StoreError> {
        let mut inner = self.record(StoreCall::BulkCreate(request.clone()))?;
        let offset = inner.id_offset;
        let workflow = inner
            .workflows
            .get_mut(&request.workflow_id)
            .ok_or_else(|| StoreError::NotFound(format!("workflow {}", request.workflow_id)))?;

        // Validate the whole batch first; a rejected batch changes nothing.
        let ids: Vec<StepId> = request
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| step.id.unwrap_or(request.new_step_id + index as StepId) + offset)
            .collect();
        for (index, id) in ids.iter().enumerate() {
            if ids[..index].contains(id) || workflow.steps.iter().any(|s| s.id == Some(*id)) {
                return Err(StoreError::Rejected(format!("step {} already exists", id)));
            }
        }

        let mut created = Vec::with_capacity(request.steps.len());
        for (mut step, id) in request.steps.into_iter().zip(ids) {
            step.id = Some(id);
            workflow.new_step_id = workflow.new_step_id.max(id + 1);
            workflow.steps.push(step.clone());
            created.push(step);
        }

        Ok(BulkCreateResponse {
            count: Some(created.len()),
            steps: created,
        })
    }

    fn update(&self, request: BulkUpdateRequest) -> Result<BulkUpdateResponse, StoreError> {
        let mut inner = self.record(StoreCall::BulkUpdate(request.clone()))?;

        // Validate the whole batch first; a rejected batch changes nothing.
        for patch in &request.updates {
            let exists = inner
                .workflows
                .values()
                .any(|w| w.steps.iter().any(|s| s.id == Some(patch.step_id)));
            if !exists {
                return Err(StoreError::Rejected(format!("step {} does not exist", patch.step_id)));
            }
        }

        let mut updated = Vec::with_capacity(request.updates.len());
        for patch in &request.updates {
            let step = inner
                .workflows
                .values_mut()
                .flat_map(|w| w.steps.iter_mut())
                .find(|s| s.id == Some(patch.step_id));
            if let Some(step) = step {
                apply_patch(step, patch);
                updated.push(step.clone());
            }
        }

        Ok(BulkUpdateResponse {
            count: Some(updated.len()),
            steps: updated,
        })
    }

    fn delete(&self, step_id: StepId) -> Result<(), StoreError> {
        let mut inner = self.record(StoreCall::DeleteStep(step_id))?;
        for workflow in inner.workflows.values_mut() {
            if let Some(index) = workflow.steps.iter().position(|s| s.id == Some(step_id)) {
                workflow.steps.remove(index);
                if workflow.initial_step == Some(step_id) {
                    workflow.initial_step = None;
                }
                return Ok(());
            }
        }
        Err(StoreError::NotFound(format!("step {}", step_id)))
    }
}

fn apply_patch(step: &mut StepRecord, patch: &StepPatch) {
    step.order = patch.order;
    step.x = patch.position.map(|p| p.x);
    step.y = patch.position.map(|p| p.y);
    if let Some(name) = &patch.name {
        step.name = name.clone();
    }
    if let Some(left) = &patch.left_expression {
        step.left_expression = left.clone();
    }
    if let Some(operator) = patch.operator {
        step.operator = operator;
    }
    if let Some(right) = &patch.right_expression {
        step.right_expression = right.clone();
    }
    if let Some(action) = &patch.if_true_action {
        step.set_action(Branch::True, action);
    }
    if let Some(action) = &patch.if_false_action {
        step.set_action(Branch::False, action);
    }
    if let Some(message) = &patch.failure_message {
        step.failure_message = message.clone();
    }
    if let Some(active) = patch.is_active {
        step.is_active = active;
    }
}

impl StepStore for InMemoryStepStore {
    fn fetch_workflow(&self, workflow_id: WorkflowId) -> BoxFuture<'_, Result<WorkflowRecord, StoreError>> {
        Box::pin(async move {
            let inner = self.record(StoreCall::FetchWorkflow(workflow_id))?;
            inner
                .workflows
                .get(&workflow_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("workflow {}", workflow_id)))
        })
    }

    fn bulk_create(&self, request: BulkCreateRequest) -> BoxFuture<'_, Result<BulkCreateResponse, StoreError>> {
        Box::pin(async move { self.create(request) })
    }

    fn bulk_update(&self, request: BulkUpdateRequest) -> BoxFuture<'_, Result<BulkUpdateResponse, StoreError>> {
        Box::pin(async move { self.update(request) })
    }

    fn delete_step(&self, step_id: StepId) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move { self.delete(step_id) })
    }

    fn datasources(&self, execution_point: &str) -> BoxFuture<'_, Result<Vec<Datasource>, StoreError>> {
        let execution_point = execution_point.to_string();
        Box::pin(async move {
            let inner = self.record(StoreCall::Datasources(execution_point.clone()))?;
            Ok(inner
                .datasources
                .get(&execution_point)
                .cloned()
                .unwrap_or_default())
        })
    }
}
