//! The editing facade that ties the graph, the sync engine and a step store together.

use crate::adapter::{EditorStatus, LoadWarning, LoadedWorkflow, PresentationAdapter, RenderGraph};
use crate::config::EditorConfig;
use crate::draft::Draft;
use crate::error::{DraftError, EditError, EditorError, SaveError, StoreError};
use crate::graph::{GraphModel, NodeId};
use crate::layout::LayoutEngine;
use crate::session::{DeletePlan, EditSession};
use crate::step::{DatasourceCatalog, WorkflowId, WorkflowMeta, WorkflowRecord};
use crate::store::{BulkCreateResponse, BulkUpdateResponse, StepStore};
use crate::sync::{PendingSave, SaveOutcome, SaveReport, SyncEngine};
use std::sync::Arc;
use tracing::{info, warn};

/// One workflow open for editing.
///
/// Structural edits go through [`WorkflowEditor::session_mut`]. Deleting persisted
/// steps and saving talk to the store and live here.
pub struct WorkflowEditor<S: StepStore> {
    store: Arc<S>,
    config: EditorConfig,
    meta: WorkflowMeta,
    initial_step: Option<NodeId>,
    session: EditSession,
    sync: SyncEngine,
    warnings: Vec<LoadWarning>,
}

impl<S: StepStore> WorkflowEditor<S> {
    /// Fetches `workflow_id` from the store and opens it.
    pub async fn open(store: Arc<S>, workflow_id: WorkflowId, config: EditorConfig) -> Result<Self, EditorError> {
        let record = store.fetch_workflow(workflow_id).await?;
        Self::from_record(store, record, config)
    }

    pub fn from_record(store: Arc<S>, record: WorkflowRecord, config: EditorConfig) -> Result<Self, EditorError> {
        let loaded = PresentationAdapter::load(record, &config.layout)?;
        Ok(Self::from_loaded(store, loaded, config))
    }

    pub fn from_loaded(store: Arc<S>, loaded: LoadedWorkflow, config: EditorConfig) -> Self {
        let LoadedWorkflow {
            meta,
            initial_step,
            graph,
            snapshots,
            watermark,
            warnings,
        } = loaded;
        for warning in &warnings {
            warn!(%warning, "workflow loaded with warning");
        }
        let sync = SyncEngine::new(meta.id, watermark, snapshots, config.notes.clone());
        Self {
            store,
            meta,
            initial_step,
            session: EditSession::new(graph),
            sync,
            warnings,
            config,
        }
    }

    /// Restores an editor from a draft written by [`WorkflowEditor::draft`].
    pub fn from_draft(store: Arc<S>, draft: Draft, config: EditorConfig) -> Result<Self, DraftError> {
        let meta = draft.meta()?;
        let sync = SyncEngine::from_state(draft.sync, config.notes.clone());
        Ok(Self {
            store,
            meta,
            initial_step: draft.initial_step,
            session: EditSession::new(draft.graph),
            sync,
            warnings: Vec::new(),
            config,
        })
    }

    pub fn draft(&self) -> Result<Draft, DraftError> {
        Draft::new(
            &self.meta,
            self.initial_step.clone(),
            self.session.graph().clone(),
            self.sync.state().clone(),
        )
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// A handle to the store that outlives borrows of the editor.
    pub fn store_handle(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn meta(&self) -> &WorkflowMeta {
        &self.meta
    }

    pub fn warnings(&self) -> &[LoadWarning] {
        &self.warnings
    }

    pub fn graph(&self) -> &GraphModel {
        self.session.graph()
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditSession {
        &mut self.session
    }

    pub fn sync(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn initial_step(&self) -> Option<&str> {
        self.initial_step.as_deref()
    }

    pub fn set_initial_step(&mut self, node: &str) -> Result<(), EditorError> {
        if self.session.graph().step(node).is_none() {
            return Err(EditError::NotACondition(node.to_string()).into());
        }
        self.initial_step = Some(node.to_string());
        Ok(())
    }

    /// Deletes a node. A persisted step is deleted remotely first; if that fails the
    /// graph is left untouched. Returns how many nodes were removed.
    pub async fn delete_node(&mut self, node: &str) -> Result<usize, EditorError> {
        let plan = self.session.plan_delete(node)?;
        self.delete_planned(&plan).await
    }

    /// Deletes `node` and every condition step reachable from it, except the initial step.
    ///
    /// Steps are deleted one at a time in walk order; the first remote failure stops the
    /// walk and leaves that step and everything after it in place.
    pub async fn delete_subtree(&mut self, node: &str) -> Result<usize, EditorError> {
        let keep = self.initial_step.clone().filter(|initial| initial != node);
        let plans = self.session.plan_delete_subtree(node, keep.as_deref())?;
        let mut removed = 0;
        for plan in &plans {
            removed += self.delete_planned(plan).await?;
        }
        Ok(removed)
    }

    async fn delete_planned(&mut self, plan: &DeletePlan) -> Result<usize, EditorError> {
        if let Some(step_id) = plan.step_id.filter(|id| self.sync.is_persisted(Some(*id))) {
            info!(step_id, node = %plan.root, "deleting step from store");
            self.store
                .delete_step(step_id)
                .await
                .map_err(|cause| EditorError::DeleteFailed { step_id, cause })?;
        }

        let removed = self.session.apply_delete(plan);
        self.sync.forget(&plan.root);
        if self.initial_step.as_deref() == Some(plan.root.as_str()) {
            warn!(node = %plan.root, "initial step deleted");
            self.initial_step = None;
        }
        Ok(removed)
    }

    /// Places every node that still has no position.
    pub fn layout_unpositioned(&mut self) -> usize {
        let layout = LayoutEngine::new(self.config.layout).layout(self.session.graph(), self.initial_step.as_deref());
        layout.apply_to(self.session.graph_mut())
    }

    /// Starts a save. Editing may continue until [`WorkflowEditor::finish_save`].
    pub fn begin_save(&mut self) -> Result<Option<PendingSave>, SaveError> {
        self.layout_unpositioned();
        self.sync.begin_save(self.session.graph_mut())
    }

    /// Applies the responses of a started save. Steps created for nodes deleted in the
    /// meantime are left in [`SyncEngine::orphans`] for [`WorkflowEditor::delete_orphans`].
    pub fn finish_save(
        &mut self,
        pending: PendingSave,
        create: Option<Result<BulkCreateResponse, StoreError>>,
        update: Option<Result<BulkUpdateResponse, StoreError>>,
    ) -> SaveReport {
        self.sync.finish_save(self.session.graph_mut(), pending, create, update)
    }

    pub fn abandon_save(&mut self) {
        self.sync.abandon_save();
    }

    /// Lays out, diffs and sends everything that changed since the last save.
    ///
    /// Orphaned steps are deleted afterwards; one that cannot be deleted stays queued
    /// for the next save.
    pub async fn save(&mut self) -> Result<SaveOutcome, EditorError> {
        self.layout_unpositioned();
        let outcome = self.sync.save(self.session.graph_mut(), self.store.as_ref()).await?;
        if let Err(e) = self.delete_orphans().await {
            warn!(error = %e, "orphaned step not deleted");
        }
        Ok(outcome)
    }

    /// Deletes server steps whose node was removed while their create was in flight.
    /// Stops at the first failure. Returns how many were deleted.
    pub async fn delete_orphans(&mut self) -> Result<usize, EditorError> {
        let mut deleted = 0;
        for step_id in self.sync.orphans().to_vec() {
            match self.store.delete_step(step_id).await {
                Ok(()) | Err(StoreError::NotFound(_)) => {
                    info!(step_id, "deleted orphaned step");
                    self.sync.resolve_orphan(step_id);
                    deleted += 1;
                }
                Err(cause) => return Err(EditorError::DeleteFailed { step_id, cause }),
            }
        }
        Ok(deleted)
    }

    pub fn status(&self) -> EditorStatus {
        EditorStatus {
            dirty: self.sync.is_dirty(self.session.graph()) || !self.sync.orphans().is_empty(),
            saving: self.sync.is_saving(),
        }
    }

    pub fn render(&self) -> RenderGraph {
        RenderGraph::build(self.session.graph(), self.initial_step.as_deref(), self.status())
    }

    /// Datasources available at this workflow's execution point.
    pub async fn catalog(&self) -> Result<DatasourceCatalog, EditorError> {
        let datasources = self.store.datasources(&self.meta.execution_point).await?;
        Ok(DatasourceCatalog::new(datasources))
    }
}
