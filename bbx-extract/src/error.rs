//! Error types for bbx-extract
//!
//! Fetch errors are recovered per list; reconciliation errors are fatal to
//! the run and carry the phase that failed.

use crate::reconcile::cleanup::CleanupStep;
use crate::reconcile::corrections::CorrectionStep;
use std::fmt;
use thiserror::Error;

/// Vendor API failure for one request
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure (connect, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Token missing, rejected or not refreshable
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Worker task panicked or was cancelled
    #[error("Fetch task failed: {0}")]
    Task(String),
}

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Begin,
    Cleanup(CleanupStep),
    Upsert,
    Correction(CorrectionStep),
    Commit,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcilePhase::Begin => write!(f, "begin"),
            ReconcilePhase::Cleanup(step) => write!(f, "cleanup/{}", step),
            ReconcilePhase::Upsert => write!(f, "upsert"),
            ReconcilePhase::Correction(step) => write!(f, "correction/{}", step),
            ReconcilePhase::Commit => write!(f, "commit"),
        }
    }
}

/// Reconciliation failed; the transaction was rolled back
#[derive(Debug, Error)]
#[error("Reconciliation failed during {phase}: {source}")]
pub struct ReconcileError {
    pub phase: ReconcilePhase,
    #[source]
    pub source: bbx_common::Error,
}

impl ReconcileError {
    pub fn new(phase: ReconcilePhase, source: impl Into<bbx_common::Error>) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}
