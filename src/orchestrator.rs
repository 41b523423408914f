//! Run state machine and public control surface.
//!
//! One orchestrator instance owns exactly one live [`PipelineRunState`].
//! `start` walks the phase registry in order and suspends on each phase's
//! delegation; `abort` finalizes state from any point without waiting for
//! the remote side; `reset` wipes back to the idle invariant. Failure is
//! never propagated to the caller — the consumer is a long-lived observer
//! polling (or subscribing to) state snapshots, so every outcome is
//! expressed there.
//!
//! Consistency under races is handled with a run generation instead of a
//! lock held across awaits: `start` captures the generation it was issued,
//! and `abort`/`reset`/a newer `start` bump it, turning any late writes from
//! a superseded run loop into no-ops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};

use crate::config::{OrchestratorConfig, PipelineLaunchConfig};
use crate::executor::{PhaseExecutor, PhaseOutcome};
use crate::phase::{PhaseStatus, PipelinePhase, PipelinePhaseResult};
use crate::remote::Collaborators;

/// Overall run lifecycle.
///
/// `Failed` is part of the vocabulary but the current flow reports a gated
/// stop (a phase's own failure) as `Aborted`, matching the behavior the
/// console's consumers already depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete, inspectable trail of one run. Callers only ever see
/// snapshots; the orchestrator is the sole writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunState {
    pub config: Option<PipelineLaunchConfig>,
    pub current_phase: Option<PipelinePhase>,
    /// Always five entries, index-aligned with the registry order.
    pub phases: Vec<PipelinePhaseResult>,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelineRunState {
    /// The idle invariant: no config, no current phase, every phase pending.
    pub fn idle() -> Self {
        Self {
            config: None,
            current_phase: None,
            phases: PipelinePhase::ALL
                .iter()
                .map(|p| PipelinePhaseResult::pending(*p))
                .collect(),
            status: RunStatus::Idle,
            started_at: None,
            completed_at: None,
        }
    }
}

struct Inner {
    state: PipelineRunState,
    /// Bumped by every `start`, `abort` and `reset`; a run loop only writes
    /// while its captured generation is still current.
    generation: u64,
    cancel_tx: Option<watch::Sender<bool>>,
}

pub struct PipelineOrchestrator {
    inner: Arc<Mutex<Inner>>,
    executor: PhaseExecutor,
    snapshot_tx: watch::Sender<PipelineRunState>,
}

impl PipelineOrchestrator {
    pub fn new(collaborators: Collaborators, config: OrchestratorConfig) -> Self {
        let state = PipelineRunState::idle();
        let (snapshot_tx, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                generation: 0,
                cancel_tx: None,
            })),
            executor: PhaseExecutor::new(collaborators, config),
            snapshot_tx,
        }
    }

    /// Read-only snapshot of the current run state.
    pub fn state(&self) -> PipelineRunState {
        self.snapshot_tx.borrow().clone()
    }

    /// Push-style snapshot stream; every state mutation publishes.
    pub fn subscribe(&self) -> watch::Receiver<PipelineRunState> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self, inner: &Inner) {
        self.snapshot_tx.send_replace(inner.state.clone());
    }

    /// Drive a run through the phase registry. Returns once the run has
    /// settled (completed, halted on a failed phase, or aborted). A call
    /// while a run is already in flight is ignored rather than interleaving
    /// two runs.
    pub async fn start(&self, launch: PipelineLaunchConfig) {
        let (generation, mut cancel_rx) = {
            let mut inner = self.inner.lock().await;
            if inner.state.status == RunStatus::Running {
                warn!("start ignored: a run is already in flight");
                return;
            }

            inner.generation += 1;
            let (cancel_tx, cancel_rx) = watch::channel(false);
            inner.cancel_tx = Some(cancel_tx);

            // Replace the run state wholesale, then capture the launch
            // configuration verbatim.
            inner.state = PipelineRunState::idle();
            inner.state.status = RunStatus::Running;
            inner.state.config = Some(launch.clone());
            inner.state.started_at = Some(Utc::now());
            self.publish(&inner);
            (inner.generation, cancel_rx)
        };

        info!(dry_run = launch.dry_run, "pipeline run started");

        for phase in PipelinePhase::ALL {
            {
                let mut inner = self.inner.lock().await;
                if inner.generation != generation {
                    return;
                }
                inner.state.current_phase = Some(phase);
                let slot = &mut inner.state.phases[phase.index()];
                slot.status = PhaseStatus::Running;
                slot.started_at = Some(Utc::now());
                self.publish(&inner);
            }
            info!(phase = %phase, "phase started");

            let result = match self.executor.execute(phase, &launch, &mut cancel_rx).await {
                PhaseOutcome::Settled(result) => result,
                // Abort already finalized state while we were suspended.
                PhaseOutcome::Cancelled => return,
            };
            let passed = result.status == PhaseStatus::Passed;

            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return;
            }
            info!(phase = %phase, status = %result.status, "phase settled");
            inner.state.phases[phase.index()] = result;

            if !passed {
                // A gated stop reports `Aborted`; phases after the failed
                // one stay pending — only an explicit abort() skips them.
                warn!(phase = %phase, "phase failed, halting run");
                Self::finalize(&mut inner, RunStatus::Aborted);
                self.publish(&inner);
                return;
            }

            if launch.dry_run && phase == PipelinePhase::Preflight {
                info!("dry run: preflight passed, stopping before acquisition");
                Self::finalize(&mut inner, RunStatus::Completed);
                self.publish(&inner);
                return;
            }

            if phase == PipelinePhase::Verify {
                info!("pipeline run completed");
                Self::finalize(&mut inner, RunStatus::Completed);
                self.publish(&inner);
                return;
            }

            self.publish(&inner);
        }
    }

    /// Halt the run from any state. Running phases become failed, pending
    /// phases become skipped, terminal phases are never rewritten. The
    /// in-flight poll loop is signalled to stop; the remote task itself is
    /// not waited on.
    pub async fn abort(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        if let Some(cancel_tx) = inner.cancel_tx.take() {
            let _ = cancel_tx.send(true);
        }

        let now = Utc::now();
        for slot in &mut inner.state.phases {
            match slot.status {
                PhaseStatus::Running => {
                    slot.status = PhaseStatus::Failed;
                    slot.completed_at = Some(now);
                }
                PhaseStatus::Pending => {
                    slot.status = PhaseStatus::Skipped;
                }
                _ => {}
            }
        }

        inner.state.status = RunStatus::Aborted;
        inner.state.current_phase = None;
        inner.state.completed_at = Some(now);
        info!("pipeline run aborted");
        self.publish(&inner);
    }

    /// Wipe back to the idle invariant. Purely local: an in-flight remote
    /// task is not cancelled — callers wanting a clean remote state must
    /// `abort()` first. A superseded run loop's late writes are discarded
    /// via the generation bump.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.cancel_tx = None;
        inner.state = PipelineRunState::idle();
        info!("pipeline state reset");
        self.publish(&inner);
    }

    fn finalize(inner: &mut Inner, status: RunStatus) {
        inner.state.status = status;
        inner.state.current_phase = None;
        inner.state.completed_at = Some(Utc::now());
        inner.cancel_tx = None;
    }
}
