//! Phase registry and per-phase result shapes for the acquisition pipeline.
//!
//! The registry is pure data: the fixed execution order of the five pipeline
//! phases and the minimum number of checks each phase must record to earn a
//! `Passed` verdict. All behavior lives in the executor and orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One stage of an acquisition run, in fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Preflight,
    Probe,
    Pilot,
    Batch,
    Verify,
}

impl PipelinePhase {
    /// The registry order. This is the only valid execution order; phases are
    /// never reordered or run in parallel.
    pub const ALL: [PipelinePhase; 5] = [
        Self::Preflight,
        Self::Probe,
        Self::Pilot,
        Self::Batch,
        Self::Verify,
    ];

    /// Position of this phase in the registry order.
    pub fn index(&self) -> usize {
        match self {
            Self::Preflight => 0,
            Self::Probe => 1,
            Self::Pilot => 2,
            Self::Batch => 3,
            Self::Verify => 4,
        }
    }

    /// Minimum number of checks a phase must record for a `Passed` verdict.
    /// Preflight runs a fixed three-check battery; every other phase records
    /// at least one check by convention.
    pub fn min_checks(&self) -> usize {
        match self {
            Self::Preflight => 3,
            _ => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Probe => "probe",
            Self::Pilot => "pilot",
            Self::Batch => "batch",
            Self::Verify => "verify",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelinePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preflight" => Ok(Self::Preflight),
            "probe" => Ok(Self::Probe),
            "pilot" => Ok(Self::Pilot),
            "batch" => Ok(Self::Batch),
            "verify" => Ok(Self::Verify),
            _ => Err(format!("Invalid phase: {}", s)),
        }
    }
}

/// Lifecycle of a single phase within a run.
///
/// Valid transitions: `Pending → Running → {Passed|Failed}`, or
/// `Pending → Skipped` via an abort. A phase that has reached a terminal
/// status is immutable for the remainder of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
}

impl PhaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One atomic verification performed inside a phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCheck {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PhaseCheck {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: None,
        }
    }

    pub fn pass_with(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: Some(detail.into()),
        }
    }

    pub fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// The recorded outcome of one phase. Owned exclusively by the orchestrator;
/// the executor returns fresh values and never mutates a stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePhaseResult {
    pub phase: PipelinePhase,
    pub status: PhaseStatus,
    /// Remote task observed during this phase, if one was submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub checks: Vec<PhaseCheck>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PipelinePhaseResult {
    /// A fresh, untouched result slot for the given phase.
    pub fn pending(phase: PipelinePhase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Pending,
            task_id: None,
            checks: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_is_fixed() {
        let names: Vec<&str> = PipelinePhase::ALL.iter().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["preflight", "probe", "pilot", "batch", "verify"]);
        for (i, phase) in PipelinePhase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
    }

    #[test]
    fn test_min_checks_per_phase() {
        assert_eq!(PipelinePhase::Preflight.min_checks(), 3);
        assert_eq!(PipelinePhase::Probe.min_checks(), 1);
        assert_eq!(PipelinePhase::Pilot.min_checks(), 1);
        assert_eq!(PipelinePhase::Batch.min_checks(), 1);
        assert_eq!(PipelinePhase::Verify.min_checks(), 1);
    }

    #[test]
    fn test_phase_from_str_roundtrip() {
        for phase in PipelinePhase::ALL {
            let parsed: PipelinePhase = phase.as_str().parse().unwrap();
            assert_eq!(parsed, phase);
        }
        assert!("crawl".parse::<PipelinePhase>().is_err());
    }

    #[test]
    fn test_phase_serde_snake_case() {
        let json = serde_json::to_string(&PipelinePhase::Preflight).unwrap();
        assert_eq!(json, "\"preflight\"");
        let status: PhaseStatus = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(status, PhaseStatus::Skipped);
    }

    #[test]
    fn test_phase_status_terminality() {
        assert!(!PhaseStatus::Pending.is_terminal());
        assert!(!PhaseStatus::Running.is_terminal());
        assert!(PhaseStatus::Passed.is_terminal());
        assert!(PhaseStatus::Failed.is_terminal());
        assert!(PhaseStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_pending_result_is_empty() {
        let result = PipelinePhaseResult::pending(PipelinePhase::Probe);
        assert_eq!(result.phase, PipelinePhase::Probe);
        assert_eq!(result.status, PhaseStatus::Pending);
        assert!(result.task_id.is_none());
        assert!(result.checks.is_empty());
        assert!(result.started_at.is_none());
        assert!(result.completed_at.is_none());
    }

    #[test]
    fn test_check_constructors() {
        let check = PhaseCheck::fail("liveness", "connection refused");
        assert!(!check.passed);
        assert_eq!(check.detail.as_deref(), Some("connection refused"));
        assert!(PhaseCheck::pass("readiness").detail.is_none());
    }
}
