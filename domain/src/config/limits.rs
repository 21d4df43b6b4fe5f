//! Payload limits: protocol-wide ceilings and per-plugin declared limits.

use crate::core::error::DomainError;
use crate::core::payload::PayloadKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIB: usize = 1024 * 1024;

/// Process-wide ceilings, resolved once at startup and never mutated.
///
/// It is much easier to raise these than to lower them, so the defaults are
/// conservative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolLimits {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
    pub max_oracles: usize,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_query_length: 5 * MIB,
            max_observation_length: MIB,
            max_outcome_length: 5 * MIB,
            max_report_length: 5 * MIB,
            max_report_count: 2000,
            max_oracles: 31,
        }
    }
}

/// Limits a plugin declares for its own payloads.
///
/// The engine enforces these (not the ceilings) once the lifecycle manager has
/// checked that each one fits under the matching ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPluginLimits {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
}

impl ReportingPluginLimits {
    /// Limits equal to the given ceilings.
    pub fn at_ceiling(ceilings: &ProtocolLimits) -> Self {
        Self {
            max_query_length: ceilings.max_query_length,
            max_observation_length: ceilings.max_observation_length,
            max_outcome_length: ceilings.max_outcome_length,
            max_report_length: ceilings.max_report_length,
            max_report_count: ceilings.max_report_count,
        }
    }

    pub fn max_length(&self, kind: PayloadKind) -> usize {
        match kind {
            PayloadKind::Query => self.max_query_length,
            PayloadKind::Observation => self.max_observation_length,
            PayloadKind::Outcome => self.max_outcome_length,
            PayloadKind::Report => self.max_report_length,
        }
    }

    /// Reject any declared limit above its ceiling.
    pub fn validate_against(&self, ceilings: &ProtocolLimits) -> Result<(), DomainError> {
        let pairs = [
            ("max_query_length", self.max_query_length, ceilings.max_query_length),
            (
                "max_observation_length",
                self.max_observation_length,
                ceilings.max_observation_length,
            ),
            ("max_outcome_length", self.max_outcome_length, ceilings.max_outcome_length),
            ("max_report_length", self.max_report_length, ceilings.max_report_length),
            ("max_report_count", self.max_report_count, ceilings.max_report_count),
        ];

        for (field, declared, ceiling) in pairs {
            if declared > ceiling {
                return Err(DomainError::LimitExceedsCeiling {
                    field,
                    declared,
                    ceiling,
                });
            }
        }
        Ok(())
    }

    /// A payload exactly at the limit is accepted; one byte over is not.
    pub fn check_length(&self, kind: PayloadKind, len: usize) -> Result<(), MalformedPayload> {
        let max = self.max_length(kind);
        if len > max {
            return Err(MalformedPayload::TooLong { kind, len, max });
        }
        Ok(())
    }

    pub fn check_report_count(&self, count: usize) -> Result<(), MalformedPayload> {
        if count > self.max_report_count {
            return Err(MalformedPayload::TooManyReports {
                count,
                max: self.max_report_count,
            });
        }
        Ok(())
    }
}

impl Default for ReportingPluginLimits {
    fn default() -> Self {
        Self::at_ceiling(&ProtocolLimits::default())
    }
}

/// A payload that violates a size or count limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedPayload {
    #[error("{kind} of {len} bytes exceeds the limit of {max}")]
    TooLong {
        kind: PayloadKind,
        len: usize,
        max: usize,
    },

    #[error("{count} reports exceed the limit of {max}")]
    TooManyReports { count: usize, max: usize },
}

/// Information a plugin advertises when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPluginInfo {
    /// Used for diagnostics only.
    pub name: String,
    pub limits: ReportingPluginLimits,
}

impl ReportingPluginInfo {
    pub fn new(name: impl Into<String>, limits: ReportingPluginLimits) -> Self {
        Self {
            name: name.into(),
            limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ceilings() {
        let limits = ProtocolLimits::default();
        assert_eq!(limits.max_query_length, 5 * 1024 * 1024);
        assert_eq!(limits.max_observation_length, 1024 * 1024);
        assert_eq!(limits.max_outcome_length, 5 * 1024 * 1024);
        assert_eq!(limits.max_report_length, 5 * 1024 * 1024);
        assert_eq!(limits.max_report_count, 2000);
        assert_eq!(limits.max_oracles, 31);
    }

    #[test]
    fn test_declared_limits_within_ceiling() {
        let ceilings = ProtocolLimits::default();
        assert!(ReportingPluginLimits::default()
            .validate_against(&ceilings)
            .is_ok());

        let mut declared = ReportingPluginLimits::default();
        declared.max_report_count = 2001;
        assert_eq!(
            declared.validate_against(&ceilings),
            Err(DomainError::LimitExceedsCeiling {
                field: "max_report_count",
                declared: 2001,
                ceiling: 2000,
            })
        );
    }

    #[test]
    fn test_length_boundary() {
        let limits = ReportingPluginLimits {
            max_observation_length: 8,
            ..ReportingPluginLimits::default()
        };
        assert!(limits.check_length(PayloadKind::Observation, 8).is_ok());
        assert_eq!(
            limits.check_length(PayloadKind::Observation, 9),
            Err(MalformedPayload::TooLong {
                kind: PayloadKind::Observation,
                len: 9,
                max: 8,
            })
        );
    }

    #[test]
    fn test_report_count() {
        let limits = ReportingPluginLimits {
            max_report_count: 2,
            ..ReportingPluginLimits::default()
        };
        assert!(limits.check_report_count(2).is_ok());
        assert!(limits.check_report_count(3).is_err());
    }
}
