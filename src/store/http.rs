use super::{BulkCreateRequest, BulkCreateResponse, BulkUpdateRequest, BulkUpdateResponse, StepStore};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::step::{Datasource, StepId, WorkflowId, WorkflowRecord};
use futures::future::BoxFuture;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Step store backed by the workflow REST API.
pub struct HttpStepStore {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpStepStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Request(format!("Could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, StoreError> {
        let resp = self
            .authorized(req)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::NotFound(body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, StoreError> {
        self.send(req)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

impl StepStore for HttpStepStore {
    fn fetch_workflow(&self, workflow_id: WorkflowId) -> BoxFuture<'_, Result<WorkflowRecord, StoreError>> {
        Box::pin(async move {
            let url = self.url(&format!("workflows/{}/", workflow_id));
            debug!(%url, "fetching workflow");
            self.send_json(self.client.get(&url)).await
        })
    }

    fn bulk_create(&self, request: BulkCreateRequest) -> BoxFuture<'_, Result<BulkCreateResponse, StoreError>> {
        Box::pin(async move {
            let url = self.url("steps/bulk-create/");
            debug!(%url, steps = request.steps.len(), "creating steps");
            self.send_json(self.client.post(&url).json(&request)).await
        })
    }

    fn bulk_update(&self, request: BulkUpdateRequest) -> BoxFuture<'_, Result<BulkUpdateResponse, StoreError>> {
        Box::pin(async move {
            let url = self.url("steps/bulk-update/");
            debug!(%url, updates = request.updates.len(), "updating steps");
            self.send_json(self.client.post(&url).json(&request)).await
        })
    }

    fn delete_step(&self, step_id: StepId) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let url = self.url(&format!("steps/{}/", step_id));
            debug!(%url, "deleting step");
            self.send(self.client.delete(&url)).await.map(|_| ())
        })
    }

    fn datasources(&self, execution_point: &str) -> BoxFuture<'_, Result<Vec<Datasource>, StoreError>> {
        let execution_point = execution_point.to_string();
        Box::pin(async move {
            let url = self.url("datasources/");
            let req = self
                .client
                .get(&url)
                .query(&[("execution_point", execution_point.as_str())]);
            self.send_json(req).await
        })
    }
}
