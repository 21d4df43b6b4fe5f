//! Output format for protocol runs

use serde::{Deserialize, Serialize};

/// How a protocol run is rendered on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Every committed outcome and every report decision
    Full,
    /// Only the final run summary
    #[default]
    Summary,
    /// Machine-readable JSON summary
    Json,
}
