//! Configuration types: the per-instance plugin config, payload limits and
//! structured validation issues.

pub mod limits;
pub mod output_format;
pub mod plugin_config;
pub mod validation;

pub use limits::{MalformedPayload, ProtocolLimits, ReportingPluginInfo, ReportingPluginLimits};
pub use output_format::OutputFormat;
pub use plugin_config::ReportingPluginConfig;
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
