//! Configuration file loading for oracle-reporting
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ORACLE_REPORTING_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./reporting.toml` or `./.reporting.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/oracle-reporting/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileConfig, FileLimitsConfig, FileOutputConfig, FileOutputFormat, FileProtocolConfig,
    FileSimulationConfig,
};
pub use loader::ConfigLoader;
