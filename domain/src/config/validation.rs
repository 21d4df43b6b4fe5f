//! Structured configuration issues.
//!
//! Startup validation collects every problem it finds instead of stopping at
//! the first one. Issues with [`Severity::Error`] are configuration faults and
//! prevent the instance from ever running; warnings are reported and ignored.

use crate::core::error::DomainError;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A domain-level configuration fault (bad n/f/oracle id/limit/digest).
    Fault(DomainError),
    /// A duration budget of zero makes the stage fail on every call.
    ZeroDuration { field: String },
    /// n < 3f + 1: a 2f+1 quorum may be unreachable with f faulty oracles.
    WeakFaultTolerance { n: usize, f: usize },
    /// A field holds a value that could not be parsed.
    InvalidValue { field: String, value: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    /// Check whether any issues are errors (i.e. fatal).
    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}

impl From<DomainError> for ConfigIssue {
    fn from(error: DomainError) -> Self {
        let message = error.to_string();
        ConfigIssue::error(ConfigIssueCode::Fault(error), message)
    }
}
