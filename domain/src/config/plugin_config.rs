//! Immutable configuration handed to a reporting plugin instance.

use super::limits::ProtocolLimits;
use super::validation::{ConfigIssue, ConfigIssueCode};
use crate::core::error::DomainError;
use crate::core::ids::{ConfigDigest, OracleId};
use crate::quorum::Quorum;
use bytes::Bytes;
use std::time::Duration;

/// Snapshot of the protocol configuration for one plugin instance's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportingPluginConfig {
    pub config_digest: ConfigDigest,

    /// Index of the oracle running this instance.
    pub oracle_id: OracleId,

    /// Total number of oracles.
    pub n: usize,

    /// Upper bound on the number of faulty oracles.
    pub f: usize,

    /// Encoded configuration for the downstream consumer.
    pub onchain_config: Bytes,

    /// Encoded configuration for the plugin, passed through opaquely.
    pub offchain_config: Bytes,

    /// Advisory estimate of the time between rounds. Rounds may occur more or
    /// less frequently; use only for sizing caches and load estimates.
    pub estimated_round_interval: Duration,

    pub max_duration_query: Duration,
    pub max_duration_observation: Duration,
    pub max_duration_should_accept_attested_report: Duration,
    pub max_duration_should_transmit_accepted_report: Duration,
}

impl ReportingPluginConfig {
    pub fn new(config_digest: ConfigDigest, oracle_id: OracleId, n: usize, f: usize) -> Self {
        Self {
            config_digest,
            oracle_id,
            n,
            f,
            onchain_config: Bytes::new(),
            offchain_config: Bytes::new(),
            estimated_round_interval: Duration::from_secs(1),
            max_duration_query: Duration::from_secs(1),
            max_duration_observation: Duration::from_secs(1),
            max_duration_should_accept_attested_report: Duration::from_secs(1),
            max_duration_should_transmit_accepted_report: Duration::from_secs(1),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_config_digest(mut self, config_digest: ConfigDigest) -> Self {
        self.config_digest = config_digest;
        self
    }

    pub fn with_oracle_id(mut self, oracle_id: OracleId) -> Self {
        self.oracle_id = oracle_id;
        self
    }

    pub fn with_onchain_config(mut self, config: impl Into<Bytes>) -> Self {
        self.onchain_config = config.into();
        self
    }

    pub fn with_offchain_config(mut self, config: impl Into<Bytes>) -> Self {
        self.offchain_config = config.into();
        self
    }

    pub fn with_estimated_round_interval(mut self, interval: Duration) -> Self {
        self.estimated_round_interval = interval;
        self
    }

    /// Set all four stage budgets at once.
    pub fn with_stage_budgets(
        mut self,
        query: Duration,
        observation: Duration,
        should_accept: Duration,
        should_transmit: Duration,
    ) -> Self {
        self.max_duration_query = query;
        self.max_duration_observation = observation;
        self.max_duration_should_accept_attested_report = should_accept;
        self.max_duration_should_transmit_accepted_report = should_transmit;
        self
    }

    // ==================== Quorum ====================

    /// Resolve a quorum kind against this instance's `(n, f)`.
    pub fn quorum(&self, kind: Quorum) -> usize {
        kind.resolve(self.n, self.f)
    }

    // ==================== Validation ====================

    /// Check the invariants every running instance relies on.
    pub fn validate(&self, ceilings: &ProtocolLimits) -> Result<(), DomainError> {
        if self.n == 0 {
            return Err(DomainError::InvalidOracleCount);
        }
        if self.n > ceilings.max_oracles {
            return Err(DomainError::TooManyOracles {
                n: self.n,
                max: ceilings.max_oracles,
            });
        }
        if self.f >= self.n {
            return Err(DomainError::InvalidFaultBound {
                n: self.n,
                f: self.f,
            });
        }
        if self.oracle_id.index() >= self.n {
            return Err(DomainError::InvalidOracleId {
                oracle_id: self.oracle_id.index(),
                n: self.n,
            });
        }
        Ok(())
    }

    /// Collect every issue, including non-fatal warnings.
    pub fn issues(&self, ceilings: &ProtocolLimits) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if let Err(e) = self.validate(ceilings) {
            issues.push(e.into());
            return issues;
        }

        if self.n < 3 * self.f + 1 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::WeakFaultTolerance {
                    n: self.n,
                    f: self.f,
                },
                format!(
                    "n = {} is below 3f+1 = {}: a 2f+1 quorum may never be reached",
                    self.n,
                    3 * self.f + 1
                ),
            ));
        }

        let budgets = [
            ("max_duration_query", self.max_duration_query),
            ("max_duration_observation", self.max_duration_observation),
            (
                "max_duration_should_accept_attested_report",
                self.max_duration_should_accept_attested_report,
            ),
            (
                "max_duration_should_transmit_accepted_report",
                self.max_duration_should_transmit_accepted_report,
            ),
        ];
        for (field, budget) in budgets {
            if budget.is_zero() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroDuration {
                        field: field.to_string(),
                    },
                    format!("{field} must be greater than zero"),
                ));
            }
        }

        issues
    }
}
