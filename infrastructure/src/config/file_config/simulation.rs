//! Local simulation settings from TOML (`[simulation]` section)
//!
//! ```toml
//! [simulation]
//! rounds = 20
//! silent_oracles = [3]
//! byzantine_oracles = [2]
//! base_price = 100000
//! ```

use reporting_domain::{ConfigIssue, ConfigIssueCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw simulation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSimulationConfig {
    /// Outcomes to commit before stopping (0 runs until interrupted)
    pub rounds: u64,
    /// Attempts per SeqNr before giving up; absent or 0 retries forever
    pub max_attempts_per_seqnr: Option<u32>,
    /// Pause before retrying a skipped SeqNr
    pub retry_delay_ms: u64,
    /// Oracles that never answer
    pub silent_oracles: Vec<usize>,
    /// Oracles that answer with malformed observations
    pub byzantine_oracles: Vec<usize>,
    /// Centre of the simulated price feed
    pub base_price: u64,
    /// Maximum deviation of any oracle's reading from `base_price`
    pub price_jitter: u64,
    /// Upper bound of simulated network latency per oracle
    pub max_latency_ms: u64,
}

impl Default for FileSimulationConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            max_attempts_per_seqnr: None,
            retry_delay_ms: 100,
            silent_oracles: Vec::new(),
            byzantine_oracles: Vec::new(),
            base_price: 100_000,
            price_jitter: 50,
            max_latency_ms: 50,
        }
    }
}

impl FileSimulationConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.max_latency_ms)
    }

    /// Attempt budget per SeqNr, `None` meaning unbounded.
    pub fn attempt_budget(&self) -> Option<u32> {
        self.max_attempts_per_seqnr.filter(|max| *max > 0)
    }

    /// Check the simulated fault set against `(n, f)`.
    pub fn validate(&self, n: usize, f: usize) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for (field, indices) in [
            ("simulation.silent_oracles", &self.silent_oracles),
            ("simulation.byzantine_oracles", &self.byzantine_oracles),
        ] {
            for index in indices.iter().filter(|i| **i >= n) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::InvalidValue {
                        field: field.to_string(),
                        value: index.to_string(),
                    },
                    format!("{field}: oracle {index} does not exist with n = {n}"),
                ));
            }
        }

        let mut faulty: Vec<usize> = self
            .silent_oracles
            .iter()
            .chain(&self.byzantine_oracles)
            .copied()
            .collect();
        faulty.sort_unstable();
        faulty.dedup();
        if faulty.len() > f {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "simulation".to_string(),
                    value: faulty.len().to_string(),
                },
                format!(
                    "{} simulated faulty oracles exceed f = {}: rounds may never reach quorum",
                    faulty.len(),
                    f
                ),
            ));
        }

        if self.base_price <= self.price_jitter {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "simulation.base_price".to_string(),
                    value: self.base_price.to_string(),
                },
                "simulation.base_price must exceed simulation.price_jitter",
            ));
        }

        issues
    }
}
