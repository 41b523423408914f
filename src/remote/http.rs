//! reqwest implementation of the collaborator contracts.
//!
//! One `HttpBackend` serves all four traits against the console backend's
//! REST surface. Errors are flattened into [`CollaboratorError`] at this
//! boundary so nothing above it knows about HTTP.

use async_trait::async_trait;
use serde::Serialize;

use super::{
    IngestionSummary, QualityApi, ReadinessApi, SourceList, SourceRegistryApi, TaskApi,
    TaskHandle, TaskKind, TaskParams, TaskStatusReport,
};
use crate::errors::CollaboratorError;

const LIVENESS_PATH: &str = "/health/live";
const READINESS_PATH: &str = "/health/ready";
const SOURCES_PATH: &str = "/sources";
const TASKS_PATH: &str = "/tasks";
const QUALITY_SUMMARY_PATH: &str = "/quality/summary";

/// Body for `POST /tasks`.
#[derive(Debug, Serialize)]
struct SubmitTaskRequest {
    kind: TaskKind,
    #[serde(flatten)]
    params: TaskParams,
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path`, mapping transport failure and non-2xx statuses.
    async fn get_ok(&self, path: &str) -> Result<reqwest::Response, CollaboratorError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| CollaboratorError::transport(path, e))?;

        if !resp.status().is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                endpoint: path.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ReadinessApi for HttpBackend {
    async fn liveness(&self) -> Result<(), CollaboratorError> {
        self.get_ok(LIVENESS_PATH).await.map(|_| ())
    }

    async fn readiness(&self) -> Result<(), CollaboratorError> {
        self.get_ok(READINESS_PATH).await.map(|_| ())
    }
}

#[async_trait]
impl SourceRegistryApi for HttpBackend {
    async fn list_sources(&self) -> Result<SourceList, CollaboratorError> {
        self.get_ok(SOURCES_PATH)
            .await?
            .json::<SourceList>()
            .await
            .map_err(|e| CollaboratorError::decode(SOURCES_PATH, e))
    }
}

#[async_trait]
impl TaskApi for HttpBackend {
    async fn submit(
        &self,
        kind: TaskKind,
        params: TaskParams,
    ) -> Result<TaskHandle, CollaboratorError> {
        let resp = self
            .client
            .post(self.url(TASKS_PATH))
            .json(&SubmitTaskRequest { kind, params })
            .send()
            .await
            .map_err(|e| CollaboratorError::transport(TASKS_PATH, e))?;

        if !resp.status().is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                endpoint: TASKS_PATH.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.json::<TaskHandle>()
            .await
            .map_err(|e| CollaboratorError::decode(TASKS_PATH, e))
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport, CollaboratorError> {
        let path = format!("{}/{}", TASKS_PATH, task_id);
        let resp = self
            .client
            .get(self.url(&path))
            .send()
            .await
            .map_err(|e| CollaboratorError::transport(&path, e))?;

        if !resp.status().is_success() {
            return Err(CollaboratorError::UnexpectedStatus {
                endpoint: path,
                status: resp.status().as_u16(),
            });
        }

        resp.json::<TaskStatusReport>()
            .await
            .map_err(|e| CollaboratorError::decode(&path, e))
    }
}

#[async_trait]
impl QualityApi for HttpBackend {
    async fn ingestion_summary(&self) -> Result<IngestionSummary, CollaboratorError> {
        self.get_ok(QUALITY_SUMMARY_PATH)
            .await?
            .json::<IngestionSummary>()
            .await
            .map_err(|e| CollaboratorError::decode(QUALITY_SUMMARY_PATH, e))
    }
}
