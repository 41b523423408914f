//! Preflight health gate: decides whether it is safe to start acquiring.
//!
//! The gate runs a fixed battery in order: liveness, readiness, and a crawl
//! source listing. A liveness failure ends the battery immediately — if the
//! backend is unreachable the remaining probes would only report the same
//! outage. A readiness failure still attempts the source listing so the
//! operator sees the full picture. The gate only reads; it never mutates
//! remote state, and a failed gate is terminal for the run.

use std::sync::Arc;

use crate::phase::PhaseCheck;
use crate::remote::{ReadinessApi, SourceRegistryApi};

pub const LIVENESS_CHECK: &str = "liveness";
pub const READINESS_CHECK: &str = "readiness";
pub const SOURCES_CHECK: &str = "sources registered";

/// Outcome of the preflight battery.
#[derive(Debug, Clone)]
pub struct GateReport {
    pub passed: bool,
    pub checks: Vec<PhaseCheck>,
}

pub struct PreflightGate {
    readiness: Arc<dyn ReadinessApi>,
    sources: Arc<dyn SourceRegistryApi>,
}

impl PreflightGate {
    pub fn new(readiness: Arc<dyn ReadinessApi>, sources: Arc<dyn SourceRegistryApi>) -> Self {
        Self { readiness, sources }
    }

    pub async fn run(&self) -> GateReport {
        let mut checks = Vec::new();

        match self.readiness.liveness().await {
            Ok(()) => checks.push(PhaseCheck::pass(LIVENESS_CHECK)),
            Err(e) => {
                // Backend unreachable; the rest of the battery is meaningless.
                checks.push(PhaseCheck::fail(LIVENESS_CHECK, e.to_string()));
                return GateReport {
                    passed: false,
                    checks,
                };
            }
        }

        match self.readiness.readiness().await {
            Ok(()) => checks.push(PhaseCheck::pass(READINESS_CHECK)),
            Err(e) => checks.push(PhaseCheck::fail(READINESS_CHECK, e.to_string())),
        }

        match self.sources.list_sources().await {
            Ok(list) if list.total == 0 => {
                checks.push(PhaseCheck::fail(SOURCES_CHECK, "no crawl sources registered"));
            }
            Ok(list) => {
                checks.push(PhaseCheck::pass_with(
                    SOURCES_CHECK,
                    format!("{} crawl sources registered", list.total),
                ));
            }
            Err(e) => checks.push(PhaseCheck::fail(SOURCES_CHECK, e.to_string())),
        }

        let passed = checks.iter().all(|c| c.passed);
        GateReport { passed, checks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::errors::CollaboratorError;
    use crate::remote::SourceList;

    struct MockHealth {
        liveness_ok: bool,
        readiness_ok: bool,
        sources: Result<SourceList, CollaboratorError>,
    }

    impl MockHealth {
        fn healthy(total: u64) -> Self {
            Self {
                liveness_ok: true,
                readiness_ok: true,
                sources: Ok(SourceList {
                    sources: (0..total).map(|i| format!("site-{i}")).collect(),
                    total,
                }),
            }
        }
    }

    #[async_trait]
    impl ReadinessApi for MockHealth {
        async fn liveness(&self) -> Result<(), CollaboratorError> {
            if self.liveness_ok {
                Ok(())
            } else {
                Err(CollaboratorError::transport(
                    "/health/live",
                    "connection refused",
                ))
            }
        }

        async fn readiness(&self) -> Result<(), CollaboratorError> {
            if self.readiness_ok {
                Ok(())
            } else {
                Err(CollaboratorError::UnexpectedStatus {
                    endpoint: "/health/ready".to_string(),
                    status: 503,
                })
            }
        }
    }

    #[async_trait]
    impl SourceRegistryApi for MockHealth {
        async fn list_sources(&self) -> Result<SourceList, CollaboratorError> {
            self.sources.clone()
        }
    }

    fn gate(mock: MockHealth) -> PreflightGate {
        let mock = Arc::new(mock);
        PreflightGate::new(mock.clone(), mock)
    }

    #[tokio::test]
    async fn test_all_checks_pass() {
        let report = gate(MockHealth::healthy(3)).run().await;
        assert!(report.passed);
        assert_eq!(report.checks.len(), 3);
        assert!(report.checks.iter().all(|c| c.passed));
        assert_eq!(
            report.checks[2].detail.as_deref(),
            Some("3 crawl sources registered")
        );
    }

    #[tokio::test]
    async fn test_liveness_failure_short_circuits() {
        let mut mock = MockHealth::healthy(3);
        mock.liveness_ok = false;
        let report = gate(mock).run().await;

        assert!(!report.passed);
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, LIVENESS_CHECK);
        assert!(!report.checks[0].passed);
    }

    #[tokio::test]
    async fn test_readiness_failure_still_lists_sources() {
        let mut mock = MockHealth::healthy(2);
        mock.readiness_ok = false;
        let report = gate(mock).run().await;

        assert!(!report.passed);
        assert_eq!(report.checks.len(), 3);
        assert!(report.checks[0].passed);
        assert!(!report.checks[1].passed);
        assert!(report.checks[2].passed);
    }

    #[tokio::test]
    async fn test_zero_sources_fails_even_when_call_succeeds() {
        let report = gate(MockHealth::healthy(0)).run().await;

        assert!(!report.passed);
        assert_eq!(report.checks.len(), 3);
        let sources = &report.checks[2];
        assert!(!sources.passed);
        assert_eq!(sources.detail.as_deref(), Some("no crawl sources registered"));
    }

    #[tokio::test]
    async fn test_source_listing_transport_error_fails_check() {
        let mut mock = MockHealth::healthy(1);
        mock.sources = Err(CollaboratorError::transport("/sources", "timed out"));
        let report = gate(mock).run().await;

        assert!(!report.passed);
        assert_eq!(report.checks.len(), 3);
        assert!(!report.checks[2].passed);
    }
}
