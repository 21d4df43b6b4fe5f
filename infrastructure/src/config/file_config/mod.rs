//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain and application
//! types, collecting [`ConfigIssue`]s along the way.

mod limits;
mod output;
mod protocol;
mod simulation;

pub use limits::FileLimitsConfig;
pub use output::{FileOutputConfig, FileOutputFormat};
pub use protocol::FileProtocolConfig;
pub use simulation::FileSimulationConfig;

use reporting_application::RoundParams;
use reporting_domain::{ConfigIssue, ProtocolLimits, ReportingPluginConfig};
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Protocol instance: N, F, digest, stage budgets
    pub protocol: FileProtocolConfig,
    /// Protocol-wide payload ceilings
    pub limits: FileLimitsConfig,
    /// Local simulation settings
    pub simulation: FileSimulationConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Field parsing (digest, hex blobs, oracle id)
    /// 2. Plugin config invariants against the ceilings (n, f, oracle id, budgets)
    /// 3. The simulated fault set
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let (config, mut issues) = self.protocol.to_plugin_config();
        issues.extend(config.issues(&self.ceilings()));
        issues.extend(self.simulation.validate(self.protocol.n, self.protocol.f));
        issues
    }

    pub fn ceilings(&self) -> ProtocolLimits {
        self.limits.to_protocol_limits()
    }

    /// Plugin config template for this oracle; see [`FileConfig::validate`].
    pub fn plugin_config(&self) -> ReportingPluginConfig {
        self.protocol.to_plugin_config().0
    }

    pub fn round_params(&self) -> RoundParams {
        RoundParams::default()
            .with_round_deadline(self.protocol.round_deadline())
            .with_max_attempts_per_seq_nr(self.simulation.attempt_budget())
            .with_retry_delay(self.simulation.retry_delay())
            .with_round_interval(self.protocol.estimated_round_interval())
    }
}
