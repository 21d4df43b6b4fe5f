//! Console output formatter for protocol runs

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use reporting_application::ProtocolSummary;
use reporting_domain::{OutcomeChain, ReportDecision, ReportVerdict};
use std::collections::BTreeMap;

/// Formats protocol runs for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format every committed outcome with the decisions of its reports
    pub fn format(summary: &ProtocolSummary, chain: &OutcomeChain) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Reporting Run"));
        output.push('\n');

        output.push_str(&Self::section_header("Committed Outcomes"));
        if summary.committed.is_empty() {
            output.push_str(&format!("\n{}\n", "(none)".dimmed()));
        }
        for seq_nr in &summary.committed {
            let outcome = chain
                .get(*seq_nr)
                .map(|o| hex::encode(o.as_bytes()))
                .unwrap_or_else(|| "?".to_string());
            output.push_str(&format!(
                "\n{} {}\n",
                format!("── seq_nr {} ──", seq_nr).yellow().bold(),
                outcome.dimmed()
            ));

            for decision in summary.decisions.iter().filter(|d| d.seq_nr == *seq_nr) {
                output.push_str(&format!("  {}\n", Self::decision_line(decision)));
            }
        }

        output.push_str(&Self::section_header("Summary"));
        output.push('\n');
        output.push_str(&Self::format_summary(summary));

        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(summary: &ProtocolSummary, chain: &OutcomeChain) -> String {
        let outcomes: Vec<_> = summary
            .committed
            .iter()
            .map(|seq_nr| {
                serde_json::json!({
                    "seq_nr": seq_nr,
                    "outcome": chain.get(*seq_nr).map(|o| hex::encode(o.as_bytes())),
                })
            })
            .collect();

        let json = serde_json::json!({
            "committed": summary.committed,
            "head": summary.head(),
            "attempts": summary.attempts,
            "skipped": summary.skipped,
            "transmitted": summary.transmitted(),
            "cancelled": summary.cancelled,
            "outcomes": outcomes,
            "decisions": summary.decisions,
        });
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the run summary only (concise output)
    pub fn format_summary(summary: &ProtocolSummary) -> String {
        let mut output = String::new();

        let head = summary
            .head()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{} {} ({} {})\n",
            "Committed:".cyan().bold(),
            summary.committed.len(),
            "head".dimmed(),
            head
        ));
        output.push_str(&format!(
            "{} {} ({} skipped)\n",
            "Attempts:".cyan().bold(),
            summary.attempts,
            summary.skipped
        ));

        let mut by_verdict: BTreeMap<&'static str, usize> = BTreeMap::new();
        for decision in &summary.decisions {
            *by_verdict.entry(decision.verdict.as_str()).or_default() += 1;
        }
        output.push_str(&format!(
            "{} {}/{} transmitted\n",
            "Reports:".cyan().bold(),
            summary.transmitted(),
            summary.decisions.len()
        ));
        for (verdict, count) in by_verdict {
            output.push_str(&format!("  * {}: {}\n", verdict, count));
        }

        if summary.cancelled {
            output.push_str(&format!("{}\n", "Run interrupted".yellow()));
        }

        output
    }

    fn decision_line(decision: &ReportDecision) -> String {
        let label = format!("report #{}", decision.index);
        match &decision.verdict {
            ReportVerdict::Transmitted => format!("{} {} transmitted", "v".green(), label),
            ReportVerdict::Rejected | ReportVerdict::NotTransmitted => {
                format!("{} {} {}", "-".dimmed(), label, decision.verdict)
            }
            other => format!("{} {} {}", "x".red(), label, other),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, summary: &ProtocolSummary, chain: &OutcomeChain) -> String {
        Self::format(summary, chain)
    }

    fn format_json(&self, summary: &ProtocolSummary, chain: &OutcomeChain) -> String {
        Self::format_json(summary, chain)
    }

    fn format_summary(&self, summary: &ProtocolSummary) -> String {
        Self::format_summary(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reporting_domain::{Outcome, SeqNr};

    fn run() -> (ProtocolSummary, OutcomeChain) {
        let chain = OutcomeChain::new();
        chain
            .commit(SeqNr::new(1), Outcome::from(vec![0xab, 0xcd]))
            .unwrap();
        let summary = ProtocolSummary {
            committed: vec![SeqNr::new(1)],
            attempts: 2,
            skipped: 1,
            decisions: vec![
                ReportDecision::new(SeqNr::new(1), 0, ReportVerdict::Transmitted),
                ReportDecision::new(SeqNr::new(1), 1, ReportVerdict::Rejected),
            ],
            cancelled: false,
        };
        (summary, chain)
    }

    #[test]
    fn test_json_output() {
        let (summary, chain) = run();
        let json: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::format_json(&summary, &chain)).unwrap();

        assert_eq!(json["head"], 1);
        assert_eq!(json["transmitted"], 1);
        assert_eq!(json["outcomes"][0]["outcome"], "abcd");
        assert_eq!(json["decisions"][1]["verdict"]["verdict"], "rejected");
    }

    #[test]
    fn test_summary_counts_verdicts() {
        colored::control::set_override(false);
        let (summary, _) = run();
        let text = ConsoleFormatter::format_summary(&summary);

        assert!(text.contains("Committed: 1 (head 1)"));
        assert!(text.contains("Attempts: 2 (1 skipped)"));
        assert!(text.contains("1/2 transmitted"));
        assert!(text.contains("* rejected: 1"));
    }

    #[test]
    fn test_full_output_lists_outcomes() {
        colored::control::set_override(false);
        let (summary, chain) = run();
        let text = ConsoleFormatter::format(&summary, &chain);

        assert!(text.contains("seq_nr 1"));
        assert!(text.contains("abcd"));
        assert!(text.contains("report #0 transmitted"));
    }
}
