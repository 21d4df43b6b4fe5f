//! Output formatter trait

use reporting_application::ProtocolSummary;
use reporting_domain::OutcomeChain;

/// Trait for formatting protocol runs
pub trait OutputFormatter {
    /// Format every committed outcome and report decision
    fn format(&self, summary: &ProtocolSummary, chain: &OutcomeChain) -> String;

    /// Format as JSON
    fn format_json(&self, summary: &ProtocolSummary, chain: &OutcomeChain) -> String;

    /// Format the run summary only (concise output)
    fn format_summary(&self, summary: &ProtocolSummary) -> String;
}
