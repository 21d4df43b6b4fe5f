//! Protocol configuration from TOML (`[protocol]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [protocol]
//! n = 4
//! f = 1
//! oracle_id = 0
//! config_digest = "0x6f72..."
//! round_deadline_ms = 2000
//! max_duration_observation_ms = 500
//! ```

use reporting_domain::{ConfigDigest, ConfigIssue, ConfigIssueCode, OracleId, ReportingPluginConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw protocol instance configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProtocolConfig {
    /// Total number of oracles
    pub n: usize,
    /// Maximum number of faulty oracles
    pub f: usize,
    /// This oracle's index in `0..n`
    pub oracle_id: usize,
    /// 32-byte digest, hex; all zeroes when unset
    pub config_digest: Option<String>,
    /// Advisory spacing between rounds
    pub estimated_round_interval_ms: u64,
    pub max_duration_query_ms: u64,
    pub max_duration_observation_ms: u64,
    pub max_duration_should_accept_ms: u64,
    pub max_duration_should_transmit_ms: u64,
    /// Overall deadline for gathering a quorum
    pub round_deadline_ms: u64,
    /// Opaque blobs handed to the plugin, hex
    pub onchain_config: String,
    pub offchain_config: String,
}

impl Default for FileProtocolConfig {
    fn default() -> Self {
        Self {
            n: 4,
            f: 1,
            oracle_id: 0,
            config_digest: None,
            estimated_round_interval_ms: 1000,
            max_duration_query_ms: 1000,
            max_duration_observation_ms: 1000,
            max_duration_should_accept_ms: 1000,
            max_duration_should_transmit_ms: 1000,
            round_deadline_ms: 2000,
            onchain_config: String::new(),
            offchain_config: String::new(),
        }
    }
}

impl FileProtocolConfig {
    pub fn round_deadline(&self) -> Duration {
        Duration::from_millis(self.round_deadline_ms)
    }

    pub fn estimated_round_interval(&self) -> Duration {
        Duration::from_millis(self.estimated_round_interval_ms)
    }

    /// Parse the digest, falling back to all zeroes on error.
    pub fn parse_digest(&self) -> (ConfigDigest, Vec<ConfigIssue>) {
        let Some(raw) = &self.config_digest else {
            return (ConfigDigest::default(), Vec::new());
        };
        match raw.parse::<ConfigDigest>() {
            Ok(digest) => (digest, Vec::new()),
            Err(e) => (ConfigDigest::default(), vec![ConfigIssue::from(e)]),
        }
    }

    /// Build the plugin config for oracle `oracle_id`, collecting every issue.
    ///
    /// The result is always usable as a template; callers must refuse to
    /// start when any returned issue is an error.
    pub fn to_plugin_config(&self) -> (ReportingPluginConfig, Vec<ConfigIssue>) {
        let (digest, mut issues) = self.parse_digest();

        let oracle_id = match OracleId::try_from(self.oracle_id) {
            Ok(id) => id,
            Err(e) => {
                issues.push(ConfigIssue::from(e));
                OracleId::new(0)
            }
        };

        let onchain = parse_blob("protocol.onchain_config", &self.onchain_config, &mut issues);
        let offchain = parse_blob("protocol.offchain_config", &self.offchain_config, &mut issues);

        let config = ReportingPluginConfig::new(digest, oracle_id, self.n, self.f)
            .with_onchain_config(onchain)
            .with_offchain_config(offchain)
            .with_estimated_round_interval(self.estimated_round_interval())
            .with_stage_budgets(
                Duration::from_millis(self.max_duration_query_ms),
                Duration::from_millis(self.max_duration_observation_ms),
                Duration::from_millis(self.max_duration_should_accept_ms),
                Duration::from_millis(self.max_duration_should_transmit_ms),
            );

        if self.round_deadline_ms == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroDuration {
                    field: "protocol.round_deadline_ms".to_string(),
                },
                "protocol.round_deadline_ms must be greater than zero",
            ));
        }

        (config, issues)
    }
}

fn parse_blob(field: &str, raw: &str, issues: &mut Vec<ConfigIssue>) -> Vec<u8> {
    match hex::decode(raw.strip_prefix("0x").unwrap_or(raw)) {
        Ok(bytes) => bytes,
        Err(_) => {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: field.to_string(),
                    value: raw.to_string(),
                },
                format!("{field}: not a hex string"),
            ));
            Vec::new()
        }
    }
}
