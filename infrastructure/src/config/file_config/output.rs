//! Output configuration from TOML (`[output]` section)

use reporting_domain::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Re-export OutputFormat from domain for convenience
pub use reporting_domain::OutputFormat as FileOutputFormat;

/// Raw output configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Output format (uses domain type)
    pub format: Option<OutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
    /// Append every transmitted report to this JSONL file
    pub transmission_log: Option<PathBuf>,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
            transmission_log: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_section_deserialize() {
        let toml_str = r#"
[output]
format = "json"
transmission_log = "reports.jsonl"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert_eq!(
            config.output.transmission_log,
            Some(PathBuf::from("reports.jsonl"))
        );
        assert!(config.output.color);
    }
}
