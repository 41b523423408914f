//! crawlflow — staged acquisition pipeline orchestrator for the crawl
//! operations console.
//!
//! A run walks five gated phases in a fixed order: `preflight` (health
//! battery), `probe`, `pilot` and `batch` (remote tasks observed by
//! polling), and `verify` (read-only quality check). A later phase never
//! runs if an earlier one failed, and `abort()` halts cleanly from any
//! state. The console consumes the orchestrator through `start`/`abort`/
//! `reset` and read-only state snapshots.

pub mod config;
pub mod errors;
pub mod executor;
pub mod health;
pub mod orchestrator;
pub mod phase;
pub mod poller;
pub mod remote;

pub use config::{OrchestratorConfig, PipelineLaunchConfig};
pub use errors::{CollaboratorError, ConfigError};
pub use orchestrator::{PipelineOrchestrator, PipelineRunState, RunStatus};
pub use phase::{PhaseCheck, PhaseStatus, PipelinePhase, PipelinePhaseResult};
pub use poller::{PollOutcome, TaskPoller};
pub use remote::Collaborators;
