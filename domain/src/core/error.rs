//! Domain error types

use thiserror::Error;

/// Configuration faults.
///
/// These are only ever raised while instantiating a plugin or loading
/// configuration. A running round never produces one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid oracle count: n must be greater than zero")]
    InvalidOracleCount,

    #[error("Too many oracles: n = {n} exceeds the ceiling of {max}")]
    TooManyOracles { n: usize, max: usize },

    #[error("Invalid fault bound: f = {f} must be smaller than n = {n}")]
    InvalidFaultBound { n: usize, f: usize },

    #[error("Invalid oracle id: {oracle_id} is not in [0, {n})")]
    InvalidOracleId { oracle_id: usize, n: usize },

    #[error("Declared limit {field} = {declared} exceeds protocol ceiling {ceiling}")]
    LimitExceedsCeiling {
        field: &'static str,
        declared: usize,
        ceiling: usize,
    },

    #[error("Unknown quorum kind: {0}")]
    UnknownQuorum(String),

    #[error("Invalid config digest: {0}")]
    InvalidDigest(String),

    #[error("Invalid round transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl DomainError {
    /// Check if this error is a configuration fault that must stop instantiation
    pub fn is_configuration_fault(&self) -> bool {
        !matches!(self, DomainError::InvalidTransition { .. })
    }
}
