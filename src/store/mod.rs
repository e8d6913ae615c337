//! The remote step store the editor talks to.
//!
//! [`StepStore`] is the seam between the editing core and the server. [`HttpStepStore`]
//! speaks to a real backend; [`InMemoryStepStore`] keeps everything in process and
//! records each call, which makes it the store of choice for tests and demos.

pub mod http;
pub mod memory;

pub use http::HttpStepStore;
pub use memory::{InMemoryStepStore, StoreCall, StoreOperation};

use crate::error::StoreError;
use crate::step::{Datasource, StepId, StepRecord, WorkflowId, WorkflowRecord};
use crate::sync::StepPatch;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkCreateRequest {
    pub workflow_id: WorkflowId,
    pub new_step_id: StepId,
    pub steps: Vec<StepRecord>,
}

/// Created steps come back in request order. Some servers only report a count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkCreateResponse {
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkUpdateRequest {
    pub new_step_id: StepId,
    pub updates: Vec<StepPatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// Remote persistence for workflow steps.
pub trait StepStore: Send + Sync {
    fn fetch_workflow(&self, workflow_id: WorkflowId) -> BoxFuture<'_, Result<WorkflowRecord, StoreError>>;

    fn bulk_create(&self, request: BulkCreateRequest) -> BoxFuture<'_, Result<BulkCreateResponse, StoreError>>;

    fn bulk_update(&self, request: BulkUpdateRequest) -> BoxFuture<'_, Result<BulkUpdateResponse, StoreError>>;

    fn delete_step(&self, step_id: StepId) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Datasources usable in expressions at `execution_point`.
    fn datasources(&self, execution_point: &str) -> BoxFuture<'_, Result<Vec<Datasource>, StoreError>>;
}
