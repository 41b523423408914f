//! Typed errors for the pipeline core.
//!
//! Two enums cover the two failure surfaces:
//! - `CollaboratorError` — an outbound call to a backend collaborator failed
//! - `ConfigError` — a launch configuration is not usable
//!
//! The orchestrator itself never propagates errors past its public
//! operations; collaborator failures are folded into phase checks and
//! surfaced as run state.

use thiserror::Error;

/// A call to one of the backend collaborators failed.
///
/// Transport and decode failures carry a plain-text reason rather than the
/// underlying client error so that in-memory collaborator implementations
/// (and tests) can construct them without an HTTP stack.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl CollaboratorError {
    pub fn transport(endpoint: &str, reason: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(endpoint: &str, reason: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A launch configuration that cannot produce a meaningful run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("limit_per_keyword must be positive")]
    ZeroLimit,

    #[error("at least one keyword is required for a live run")]
    NoKeywords,

    #[error("at least one site is required for a live run")]
    NoSites,
}
