//! Run configuration for the acquisition pipeline.
//!
//! `PipelineLaunchConfig` is what the console user chooses for one run;
//! it is captured verbatim into run state so the phase trail can always be
//! traced back to the configuration that produced it. `OrchestratorConfig`
//! holds the tuning knobs that are policy rather than user input.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

/// Caller-supplied parameters for one acquisition run.
///
/// Immutable once a run starts. Keyword and site ordering is preserved
/// exactly as passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLaunchConfig {
    pub keywords: Vec<String>,
    pub sites: Vec<String>,
    pub limit_per_keyword: u32,
    pub dry_run: bool,
}

impl PipelineLaunchConfig {
    /// Check that this configuration can produce a meaningful run.
    ///
    /// A dry run only exercises the preflight gate, so empty keyword and
    /// site lists are allowed there; a live run needs both.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit_per_keyword == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if !self.dry_run {
            if self.keywords.is_empty() {
                return Err(ConfigError::NoKeywords);
            }
            if self.sites.is_empty() {
                return Err(ConfigError::NoSites);
            }
        }
        Ok(())
    }
}

/// Default spacing between remote task status queries.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default per-keyword ceiling for the pilot phase.
const DEFAULT_PILOT_CAP: u32 = 5;

/// Default minimum ingestion pass rate accepted by the verify phase.
const DEFAULT_VERIFY_MIN_PASS_RATE: f64 = 0.8;

/// Tuning knobs for the orchestrator and its poller.
///
/// The defaults reproduce the observed behavior: a 5-second poll interval
/// and no cap on status queries (a task that never reaches a terminal state
/// is polled until `abort()` is called). `max_poll_attempts` exists so a
/// deployment can bound that liveness risk without it becoming hidden
/// policy.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Wait between consecutive task status queries.
    pub poll_interval: Duration,
    /// Upper bound on status queries per task; `None` polls until terminal.
    pub max_poll_attempts: Option<u32>,
    /// Per-keyword limit ceiling applied during the pilot phase.
    pub pilot_cap: u32,
    /// Minimum ingestion pass rate for the verify phase to pass.
    pub verify_min_pass_rate: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_poll_attempts: None,
            pilot_cap: DEFAULT_PILOT_CAP,
            verify_min_pass_rate: DEFAULT_VERIFY_MIN_PASS_RATE,
        }
    }
}
