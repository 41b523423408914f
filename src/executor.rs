//! Per-phase unit of work.
//!
//! Given the current launch configuration and a phase name, the executor
//! performs that phase's delegation — the health gate for preflight, task
//! submission plus polling for probe/pilot/batch, a read-only quality check
//! for verify — and returns a fresh, terminal phase result. Pending, running
//! and skipped are never produced here; those statuses belong to the
//! orchestrator.

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::config::{OrchestratorConfig, PipelineLaunchConfig};
use crate::health::PreflightGate;
use crate::phase::{PhaseCheck, PhaseStatus, PipelinePhase, PipelinePhaseResult};
use crate::poller::{PollOutcome, TaskPoller};
use crate::remote::{Collaborators, TaskKind, TaskParams};

/// What the executor hands back to the orchestrator.
#[derive(Debug)]
pub enum PhaseOutcome {
    /// The phase ran to a terminal verdict (`Passed` or `Failed`).
    Settled(PipelinePhaseResult),
    /// An abort interrupted the phase mid-flight; the orchestrator has
    /// already finalized state and discards this.
    Cancelled,
}

/// Result payload field the crawler reports collected item counts under.
const SAVED_ITEMS_FIELD: &str = "saved";

pub struct PhaseExecutor {
    collaborators: Collaborators,
    config: OrchestratorConfig,
    gate: PreflightGate,
    poller: TaskPoller,
}

impl PhaseExecutor {
    pub fn new(collaborators: Collaborators, config: OrchestratorConfig) -> Self {
        let gate = PreflightGate::new(
            collaborators.readiness.clone(),
            collaborators.sources.clone(),
        );
        let poller = TaskPoller::new(
            collaborators.tasks.clone(),
            config.poll_interval,
            config.max_poll_attempts,
        );
        Self {
            collaborators,
            config,
            gate,
            poller,
        }
    }

    /// Run one phase to a terminal verdict, or observe cancellation.
    pub async fn execute(
        &self,
        phase: PipelinePhase,
        launch: &PipelineLaunchConfig,
        cancel: &mut watch::Receiver<bool>,
    ) -> PhaseOutcome {
        let started_at = Utc::now();

        let (passed, task_id, checks) = match phase {
            PipelinePhase::Preflight => {
                let report = self.gate.run().await;
                (report.passed, None, report.checks)
            }
            PipelinePhase::Probe => {
                match self
                    .delegate(TaskKind::Probe, TaskParams::default(), false, cancel)
                    .await
                {
                    Some(outcome) => outcome,
                    None => return PhaseOutcome::Cancelled,
                }
            }
            PipelinePhase::Pilot => {
                let params = TaskParams {
                    keywords: launch.keywords.clone(),
                    sites: launch.sites.clone(),
                    limit_per_keyword: Some(
                        launch.limit_per_keyword.min(self.config.pilot_cap),
                    ),
                };
                match self.delegate(TaskKind::Search, params, true, cancel).await {
                    Some(outcome) => outcome,
                    None => return PhaseOutcome::Cancelled,
                }
            }
            PipelinePhase::Batch => {
                let params = TaskParams {
                    keywords: launch.keywords.clone(),
                    sites: launch.sites.clone(),
                    limit_per_keyword: Some(launch.limit_per_keyword),
                };
                match self
                    .delegate(TaskKind::AllSites, params, false, cancel)
                    .await
                {
                    Some(outcome) => outcome,
                    None => return PhaseOutcome::Cancelled,
                }
            }
            PipelinePhase::Verify => {
                let checks = self.verify_quality().await;
                let passed = checks.iter().all(|c| c.passed);
                (passed, None, checks)
            }
        };

        PhaseOutcome::Settled(PipelinePhaseResult {
            phase,
            status: if passed {
                PhaseStatus::Passed
            } else {
                PhaseStatus::Failed
            },
            task_id,
            checks,
            started_at: Some(started_at),
            completed_at: Some(Utc::now()),
        })
    }

    /// Submit a remote task and observe it to a terminal state. Returns
    /// `None` when the poll was cancelled. `require_items` makes the verdict
    /// additionally demand at least one collected item in the result payload.
    async fn delegate(
        &self,
        kind: TaskKind,
        params: TaskParams,
        require_items: bool,
        cancel: &mut watch::Receiver<bool>,
    ) -> Option<(bool, Option<String>, Vec<PhaseCheck>)> {
        let mut checks = Vec::new();

        let handle = match self.collaborators.tasks.submit(kind, params).await {
            Ok(handle) => {
                checks.push(PhaseCheck::pass_with(
                    "task submitted",
                    format!("{} task {}", kind, handle.task_id),
                ));
                handle
            }
            Err(e) => {
                checks.push(PhaseCheck::fail("task submitted", e.to_string()));
                return Some((false, None, checks));
            }
        };

        debug!(kind = %kind, task_id = %handle.task_id, "observing remote task");
        match self.poller.poll(&handle.task_id, cancel).await {
            PollOutcome::Done(result) => {
                checks.push(PhaseCheck::pass("task completed"));
                if require_items {
                    let saved = result
                        .as_ref()
                        .and_then(|r| r.get(SAVED_ITEMS_FIELD))
                        .and_then(|v| v.as_u64())
                        .unwrap_or(0);
                    if saved >= 1 {
                        checks.push(PhaseCheck::pass_with(
                            "items collected",
                            format!("{} items saved", saved),
                        ));
                    } else {
                        checks.push(PhaseCheck::fail(
                            "items collected",
                            "task completed without collecting any items",
                        ));
                    }
                }
            }
            PollOutcome::Failed { error } => {
                checks.push(PhaseCheck::fail(
                    "task completed",
                    error.unwrap_or_else(|| "task reported failure".to_string()),
                ));
            }
            PollOutcome::LostContact { reason } => {
                checks.push(PhaseCheck::fail("task completed", reason));
            }
            PollOutcome::Cancelled => return None,
        }

        let passed = checks.iter().all(|c| c.passed);
        Some((passed, Some(handle.task_id), checks))
    }

    async fn verify_quality(&self) -> Vec<PhaseCheck> {
        match self.collaborators.quality.ingestion_summary().await {
            Ok(summary) => {
                let detail = format!(
                    "pass rate {:.2} (minimum {:.2})",
                    summary.pass_rate, self.config.verify_min_pass_rate
                );
                if summary.pass_rate >= self.config.verify_min_pass_rate {
                    vec![PhaseCheck::pass_with("ingestion pass rate", detail)]
                } else {
                    vec![PhaseCheck::fail("ingestion pass rate", detail)]
                }
            }
            Err(e) => vec![PhaseCheck::fail("ingestion summary", e.to_string())],
        }
    }
}
