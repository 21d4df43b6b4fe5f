//! Reasons a round attempt is abandoned.

use thiserror::Error;

/// Why a round attempt was skipped.
///
/// Skipping is expected and recoverable: nothing is committed and the same
/// sequence number is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("previous outcome is not committed yet")]
    MissingPreviousOutcome,

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("observation quorum failed: {0}")]
    QuorumFailed(String),

    #[error("quorum of {required} can never be met with {n} oracles")]
    QuorumUnreachable { required: usize, n: usize },

    #[error("round deadline expired with {valid}/{required} valid observations")]
    DeadlineExceeded { valid: usize, required: usize },

    #[error("all oracles answered with only {valid}/{required} valid observations")]
    ObservationsExhausted { valid: usize, required: usize },

    #[error("outcome failed: {0}")]
    OutcomeFailed(String),

    #[error("round cancelled")]
    Cancelled,
}

impl SkipReason {
    /// Whether the round stopped because time ran out or it was cancelled.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SkipReason::DeadlineExceeded { .. } | SkipReason::Cancelled)
    }
}
