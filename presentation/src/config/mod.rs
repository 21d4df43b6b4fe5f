//! Presentation-level configuration
//!
//! Resolves how a run is displayed from CLI flags layered over the
//! `[output]` file section.

use crate::cli::commands::Cli;
use reporting_domain::OutputFormat;

/// Output configuration for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
    /// Show progress indicators
    pub show_progress: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            color: true,
            show_progress: true,
        }
    }
}

impl OutputConfig {
    /// CLI flags win over file settings, which win over defaults.
    pub fn resolve(cli: &Cli, file_format: Option<OutputFormat>, file_color: bool) -> Self {
        let format = cli
            .output
            .map(OutputFormat::from)
            .or(file_format)
            .unwrap_or_default();
        // JSON goes to stdout, keep progress out of it
        let show_progress = !cli.quiet && format != OutputFormat::Json;
        Self {
            format,
            color: file_color && !cli.no_color,
            show_progress,
        }
    }
}
