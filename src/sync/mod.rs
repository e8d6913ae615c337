//! Snapshot-based synchronization between the graph and the step store.
//!
//! A save runs in two passes. First every new step gets a provisional identifier
//! counted up from the watermark, so new steps may point at each other. Then every
//! step is resolved into its persisted form and compared with its snapshot: new steps
//! go into one bulk-create request, changed existing steps into one bulk-update
//! request. Responses are folded back into the graph and the snapshot table.
//!
//! The engine is split into [`SyncEngine::begin_save`] and [`SyncEngine::finish_save`]
//! so the caller can keep editing while requests are pending. [`SyncEngine::save`]
//! drives both halves against a [`StepStore`], and [`dispatch`] issues the requests
//! of a started save on its own.

pub mod diff;
pub mod ids;
pub mod resolve;
pub mod snapshot;

pub use diff::{StepPatch, StepPayload, diff_step};
pub use ids::{assign_provisional_ids, is_new};
pub use resolve::ActionResolver;
pub use snapshot::{SnapshotTable, StepSnapshot};

use crate::config::NoteConfig;
use crate::error::{SaveError, StoreError, ValidationError};
use crate::graph::{GraphModel, NodeId};
use crate::step::{StepId, WorkflowId, parse_list};
use crate::store::{BulkCreateRequest, BulkCreateResponse, BulkUpdateRequest, BulkUpdateResponse, StepStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Everything the engine must remember between saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    pub workflow_id: Option<WorkflowId>,
    pub watermark: StepId,
    pub snapshots: SnapshotTable,
    /// Steps the server created for nodes deleted before the create returned.
    /// They still have to be deleted remotely.
    #[serde(default)]
    pub orphans: Vec<StepId>,
}

/// The creates and updates a save would send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePlan {
    pub creates: Vec<StepPayload>,
    pub updates: Vec<(NodeId, StepPatch)>,
    /// Provisional identifiers handed out by this plan.
    pub assigned: Vec<(NodeId, StepId)>,
}

impl SavePlan {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }
}

/// A save that has been started and awaits its responses.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub create: Option<BulkCreateRequest>,
    pub update: Option<BulkUpdateRequest>,
    creates: Vec<StepPayload>,
    updates: Vec<(NodeId, StepPatch)>,
}

impl PendingSave {
    pub fn created_nodes(&self) -> impl Iterator<Item = &str> {
        self.creates.iter().map(|p| p.node.as_str())
    }

    pub fn updated_nodes(&self) -> impl Iterator<Item = &str> {
        self.updates.iter().map(|(node, _)| node.as_str())
    }
}

/// What happened to one of the two bulk calls.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Skipped,
    Succeeded { count: usize },
    Failed(StoreError),
}

impl CallOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CallOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub create: CallOutcome,
    pub update: CallOutcome,
    /// Authoritative identifiers of the steps created by this save.
    pub created_ids: Vec<(NodeId, StepId)>,
    /// Created steps whose node was deleted while the save was in flight.
    pub orphaned: Vec<StepId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    NoChanges,
    Completed(SaveReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// The single message shown to the operator after a save attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.message)
    }
}

impl SaveOutcome {
    pub fn notification(&self) -> Notification {
        match self {
            SaveOutcome::NoChanges => Notification {
                level: NotificationLevel::Info,
                message: "No changes to save".to_string(),
            },
            SaveOutcome::Completed(report) => report.notification(),
        }
    }
}

impl SaveReport {
    pub fn notification(&self) -> Notification {
        let mut parts = Vec::new();
        let mut failures = 0;
        let mut successes = 0;
        for (label, outcome) in [("Create", &self.create), ("Update", &self.update)] {
            match outcome {
                CallOutcome::Skipped => {}
                CallOutcome::Succeeded { count } => {
                    successes += 1;
                    parts.push(format!("{} succeeded ({} steps)", label, count));
                }
                CallOutcome::Failed(e) => {
                    failures += 1;
                    parts.push(format!("{} failed: {}", label, e));
                }
            }
        }
        let level = match (successes, failures) {
            (_, 0) => NotificationLevel::Success,
            (0, _) => NotificationLevel::Error,
            _ => NotificationLevel::Warning,
        };
        Notification {
            level,
            message: parts.join("; "),
        }
    }
}

/// Computes and applies saves for one workflow.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    state: SyncState,
    notes: NoteConfig,
    in_flight: bool,
}

impl SyncEngine {
    pub fn new(workflow_id: Option<WorkflowId>, watermark: StepId, snapshots: SnapshotTable, notes: NoteConfig) -> Self {
        Self::from_state(
            SyncState {
                workflow_id,
                watermark,
                snapshots,
                orphans: Vec::new(),
            },
            notes,
        )
    }

    pub fn from_state(state: SyncState, notes: NoteConfig) -> Self {
        Self {
            state,
            notes,
            in_flight: false,
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn notes(&self) -> &NoteConfig {
        &self.notes
    }

    pub fn watermark(&self) -> StepId {
        self.state.watermark
    }

    pub fn snapshot(&self, node: &str) -> Option<&StepSnapshot> {
        self.state.snapshots.get(node)
    }

    /// Whether a step with this identifier already exists on the server.
    pub fn is_persisted(&self, step_id: Option<StepId>) -> bool {
        !is_new(step_id, self.state.watermark)
    }

    /// Drops the snapshot of a node that no longer exists.
    pub fn forget(&mut self, node: &str) {
        self.state.snapshots.remove(node);
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight
    }

    /// Server steps left without a node by a delete during a save.
    pub fn orphans(&self) -> &[StepId] {
        &self.state.orphans
    }

    /// Marks an orphaned step as deleted on the server.
    pub fn resolve_orphan(&mut self, step_id: StepId) {
        self.state.orphans.retain(|id| *id != step_id);
    }

    /// Builds the plan for `graph`, assigning provisional identifiers in place.
    pub fn prepare(&self, graph: &mut GraphModel) -> Result<SavePlan, ValidationError> {
        if self.state.workflow_id.is_none() {
            return Err(ValidationError::MissingWorkflowId);
        }

        let assigned = assign_provisional_ids(graph, self.state.watermark);
        let resolver = ActionResolver::new(graph, &self.notes);
        let mut plan = SavePlan {
            assigned,
            ..SavePlan::default()
        };

        for (node, step) in graph.steps() {
            if step.operator.is_set_membership() {
                parse_list(&step.right_expression).map_err(|e| ValidationError::InvalidSetExpression {
                    node: node.id.clone(),
                    message: e.to_string(),
                })?;
            }

            let payload = resolver.payload(node, step)?;
            if is_new(Some(payload.step_id), self.state.watermark) {
                plan.creates.push(payload);
            } else if let Some(patch) = diff_step(&payload, self.state.snapshots.get(&node.id)) {
                debug!(node = %node.id, fields = ?patch.changed_fields(), "step changed");
                plan.updates.push((node.id.clone(), patch));
            }
        }
        Ok(plan)
    }

    /// The plan a save would send right now, without touching `graph`.
    pub fn preview(&self, graph: &GraphModel) -> Result<SavePlan, ValidationError> {
        let mut scratch = graph.clone();
        self.prepare(&mut scratch)
    }

    /// Whether the graph holds anything a save would send.
    ///
    /// A graph that fails validation counts as dirty.
    pub fn is_dirty(&self, graph: &GraphModel) -> bool {
        self.preview(graph).map(|plan| !plan.is_empty()).unwrap_or(true)
    }

    /// Starts a save. Returns `None` when there is nothing to send.
    pub fn begin_save(&mut self, graph: &mut GraphModel) -> Result<Option<PendingSave>, SaveError> {
        if self.in_flight {
            return Err(SaveError::SaveInFlight);
        }
        let plan = self.prepare(graph)?;
        if plan.is_empty() {
            info!("no changes to save");
            return Ok(None);
        }

        // Checked in prepare.
        let workflow_id = self.state.workflow_id.unwrap_or_default();
        let watermark = self.state.watermark;

        let create = (!plan.creates.is_empty()).then(|| BulkCreateRequest {
            workflow_id,
            new_step_id: watermark,
            steps: plan.creates.iter().map(StepPayload::to_record).collect(),
        });
        let update = (!plan.updates.is_empty()).then(|| BulkUpdateRequest {
            new_step_id: watermark,
            updates: plan.updates.iter().map(|(_, patch)| patch.clone()).collect(),
        });

        info!(
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            watermark,
            "saving workflow steps"
        );
        self.in_flight = true;
        Ok(Some(PendingSave {
            create,
            update,
            creates: plan.creates,
            updates: plan.updates,
        }))
    }

    /// Applies the responses of a started save.
    ///
    /// `None` means the call was never made. A failed call leaves its steps exactly as
    /// they were so the save can be retried.
    pub fn finish_save(
        &mut self,
        graph: &mut GraphModel,
        pending: PendingSave,
        create: Option<Result<BulkCreateResponse, StoreError>>,
        update: Option<Result<BulkUpdateResponse, StoreError>>,
    ) -> SaveReport {
        self.in_flight = false;

        let mut created_ids = Vec::new();
        let mut orphaned = Vec::new();
        let create = match create {
            None => CallOutcome::Skipped,
            Some(Err(e)) => {
                warn!(error = %e, steps = pending.creates.len(), "bulk create failed");
                CallOutcome::Failed(e)
            }
            Some(Ok(response)) => {
                (created_ids, orphaned) = self.reconcile_created(graph, &pending.creates, &response);
                CallOutcome::Succeeded {
                    count: created_ids.len() + orphaned.len(),
                }
            }
        };

        let update = match update {
            None => CallOutcome::Skipped,
            Some(Err(e)) => {
                warn!(error = %e, steps = pending.updates.len(), "bulk update failed");
                CallOutcome::Failed(e)
            }
            Some(Ok(response)) => {
                let count = response.count.unwrap_or(pending.updates.len());
                for (node, patch) in &pending.updates {
                    if graph.contains(node) {
                        self.state.snapshots.entry(node.clone()).merge_patch(patch);
                    }
                }
                CallOutcome::Succeeded { count }
            }
        };

        SaveReport {
            create,
            update,
            created_ids,
            orphaned,
        }
    }

    fn reconcile_created(
        &mut self,
        graph: &mut GraphModel,
        creates: &[StepPayload],
        response: &BulkCreateResponse,
    ) -> (Vec<(NodeId, StepId)>, Vec<StepId>) {
        if let Some(count) = response.count
            && count != creates.len()
        {
            warn!(expected = creates.len(), count, "bulk create count mismatch");
        }

        let mut created = Vec::with_capacity(creates.len());
        let mut orphaned = Vec::new();
        let mut highest = None;
        for (index, payload) in creates.iter().enumerate() {
            let confirmed = response
                .steps
                .get(index)
                .and_then(|record| record.id)
                .unwrap_or(payload.step_id);
            if confirmed != payload.step_id {
                debug!(node = %payload.node, provisional = payload.step_id, confirmed, "server reassigned step id");
            }
            highest = highest.max(Some(confirmed));

            match graph.step_mut(&payload.node) {
                Some(step) => {
                    if step.step_id == Some(payload.step_id) {
                        step.step_id = Some(confirmed);
                    }
                }
                None => {
                    warn!(node = %payload.node, step_id = confirmed, "created step was removed before the save finished");
                    self.state.orphans.push(confirmed);
                    orphaned.push(confirmed);
                    continue;
                }
            }

            let mut snapshot = StepSnapshot::capture(payload);
            snapshot.step_id = Some(confirmed);
            self.state.snapshots.insert(payload.node.clone(), snapshot);
            created.push((payload.node.clone(), confirmed));
        }

        let floor = creates.iter().map(|p| p.step_id).max().max(highest);
        if let Some(top) = floor {
            self.state.watermark = self.state.watermark.max(top + 1);
        }
        (created, orphaned)
    }

    /// Clears the in-flight flag of a save whose responses will never arrive.
    pub fn abandon_save(&mut self) {
        if self.in_flight {
            debug!("save abandoned");
        }
        self.in_flight = false;
    }

    /// Runs a complete save against `store`.
    pub async fn save<S: StepStore + ?Sized>(
        &mut self,
        graph: &mut GraphModel,
        store: &S,
    ) -> Result<SaveOutcome, SaveError> {
        let Some(pending) = self.begin_save(graph)? else {
            return Ok(SaveOutcome::NoChanges);
        };
        let (create, update) = dispatch(store, &pending).await;
        let report = self.finish_save(graph, pending, create, update);
        info!(notification = %report.notification(), "save finished");
        Ok(SaveOutcome::Completed(report))
    }
}

/// Responses of the two bulk calls; `None` for a call that was not needed.
pub type CallResults = (
    Option<Result<BulkCreateResponse, StoreError>>,
    Option<Result<BulkUpdateResponse, StoreError>>,
);

/// Issues the requests of `pending`. Both calls run together and fail independently.
pub async fn dispatch<S: StepStore + ?Sized>(store: &S, pending: &PendingSave) -> CallResults {
    let create_call = async {
        match pending.create.clone() {
            Some(request) => Some(store.bulk_create(request).await),
            None => None,
        }
    };
    let update_call = async {
        match pending.update.clone() {
            Some(request) => Some(store.bulk_update(request).await),
            None => None,
        }
    };
    futures::join!(create_call, update_call)
}
