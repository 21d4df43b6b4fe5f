//! Protocol-wide ceilings from TOML (`[limits]` section)
//!
//! Every plugin instance must declare limits at or below these values.
//! Defaults: query 5 MiB, observation 1 MiB, outcome 5 MiB, report 5 MiB,
//! 2000 reports per outcome, 31 oracles.

use reporting_domain::ProtocolLimits;
use serde::{Deserialize, Serialize};

/// Raw ceilings; every field falls back to its default independently
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimitsConfig {
    pub max_query_length: usize,
    pub max_observation_length: usize,
    pub max_outcome_length: usize,
    pub max_report_length: usize,
    pub max_report_count: usize,
    pub max_oracles: usize,
}

impl Default for FileLimitsConfig {
    fn default() -> Self {
        let limits = ProtocolLimits::default();
        Self {
            max_query_length: limits.max_query_length,
            max_observation_length: limits.max_observation_length,
            max_outcome_length: limits.max_outcome_length,
            max_report_length: limits.max_report_length,
            max_report_count: limits.max_report_count,
            max_oracles: limits.max_oracles,
        }
    }
}

impl FileLimitsConfig {
    pub fn to_protocol_limits(&self) -> ProtocolLimits {
        ProtocolLimits {
            max_query_length: self.max_query_length,
            max_observation_length: self.max_observation_length,
            max_outcome_length: self.max_outcome_length,
            max_report_length: self.max_report_length,
            max_report_count: self.max_report_count,
            max_oracles: self.max_oracles,
        }
    }
}
