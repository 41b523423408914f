//! Contracts for the backend collaborators the pipeline consumes.
//!
//! The orchestrator only ever talks to the outside world through these four
//! traits: health probes, the crawl source registry, the remote task system,
//! and the ingestion quality endpoint. The wire format behind them belongs
//! to the backend; [`http`] carries the reqwest implementation used by the
//! console, and tests substitute in-memory implementations.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::errors::CollaboratorError;

pub use http::HttpBackend;

/// Kind of work submitted to the remote task system, mapped from the
/// pipeline phase driving it. `Scheduled` is minted by the backend's cron
/// surface rather than this pipeline, but shares the same status contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Probe,
    Search,
    AllSites,
    Scheduled,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::Search => "search",
            Self::AllSites => "all_sites",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters accompanying a task submission. Empty fields are omitted on
/// the wire; a probe task submits with everything empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_per_keyword: Option<u32>,
}

/// Identifier returned by a successful task submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

/// Remote task lifecycle as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTaskStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl RemoteTaskStatus {
    /// Terminal statuses admit no further transitions; the poller never
    /// queries past one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One status observation for a submitted task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub status: RemoteTaskStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Registered crawl sources, as reported by the source registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceList {
    pub sources: Vec<String>,
    pub total: u64,
}

/// Post-run ingestion quality summary consumed by the verify phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub pass_rate: f64,
    #[serde(default)]
    pub total_records: u64,
    #[serde(default)]
    pub fresh_records: u64,
}

/// Liveness and readiness probes for the backend.
#[async_trait]
pub trait ReadinessApi: Send + Sync {
    async fn liveness(&self) -> Result<(), CollaboratorError>;
    async fn readiness(&self) -> Result<(), CollaboratorError>;
}

/// Read access to the registered crawl sources.
#[async_trait]
pub trait SourceRegistryApi: Send + Sync {
    async fn list_sources(&self) -> Result<SourceList, CollaboratorError>;
}

/// Submission and observation of remote acquisition tasks.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn submit(
        &self,
        kind: TaskKind,
        params: TaskParams,
    ) -> Result<TaskHandle, CollaboratorError>;

    async fn status(&self, task_id: &str) -> Result<TaskStatusReport, CollaboratorError>;
}

/// Read-only access to the ingestion quality summary.
#[async_trait]
pub trait QualityApi: Send + Sync {
    async fn ingestion_summary(&self) -> Result<IngestionSummary, CollaboratorError>;
}

/// The full set of collaborator handles the pipeline needs.
#[derive(Clone)]
pub struct Collaborators {
    pub readiness: Arc<dyn ReadinessApi>,
    pub sources: Arc<dyn SourceRegistryApi>,
    pub tasks: Arc<dyn TaskApi>,
    pub quality: Arc<dyn QualityApi>,
}

impl Collaborators {
    /// Wire all four collaborators to one HTTP backend at `base_url`.
    pub fn http(base_url: impl Into<String>) -> Self {
        let backend = Arc::new(HttpBackend::new(base_url));
        Self {
            readiness: backend.clone(),
            sources: backend.clone(),
            tasks: backend.clone(),
            quality: backend,
        }
    }
}
