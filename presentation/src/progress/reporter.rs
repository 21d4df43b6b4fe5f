//! Progress reporting for protocol runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reporting_application::RoundProgressNotifier;
use reporting_domain::{Outcome, ReportDecision, RoundPhase, SeqNr, SkipReason};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a live progress bar
///
/// With a known round count the bar fills per committed outcome; otherwise
/// it spins.
pub struct ProgressReporter {
    bar: ProgressBar,
    current: Mutex<Option<(SeqNr, u32)>>,
}

impl ProgressReporter {
    pub fn new(total_rounds: Option<u64>) -> Self {
        let bar = match total_rounds {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(Self::bar_style());
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(Self::spinner_style());
                bar
            }
        };
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            bar,
            current: Mutex::new(None),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {pos} committed {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Stop the bar, leaving the last state on screen
    pub fn finish(&self) {
        self.bar.finish_with_message("done".green().to_string());
    }

    fn label(&self, seq_nr: SeqNr) -> String {
        let attempt = self
            .current
            .lock()
            .ok()
            .and_then(|c| *c)
            .filter(|(s, _)| *s == seq_nr)
            .map(|(_, a)| a)
            .unwrap_or(1);
        if attempt > 1 {
            format!("seq_nr {} (attempt {})", seq_nr, attempt)
        } else {
            format!("seq_nr {}", seq_nr)
        }
    }
}

impl RoundProgressNotifier for ProgressReporter {
    fn on_round_start(&self, seq_nr: SeqNr, attempt: u32) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some((seq_nr, attempt));
        }
        self.bar.set_prefix(RoundPhase::QueryPending.display_name());
        self.bar.set_message(self.label(seq_nr));
    }

    fn on_phase(&self, seq_nr: SeqNr, phase: RoundPhase) {
        if phase.is_terminal() {
            return;
        }
        self.bar.set_prefix(phase.display_name());
        self.bar.set_message(self.label(seq_nr));
    }

    fn on_round_skipped(&self, seq_nr: SeqNr, attempt: u32, reason: &SkipReason) {
        self.bar.println(format!(
            "{} seq_nr {} attempt {} skipped: {}",
            "!".yellow(),
            seq_nr,
            attempt,
            reason
        ));
    }

    fn on_outcome_committed(&self, seq_nr: SeqNr, _outcome: &Outcome, report_count: usize) {
        self.bar.inc(1);
        self.bar.set_message(format!(
            "{} {} ({} reports)",
            "v".green(),
            self.label(seq_nr),
            report_count
        ));
    }

    fn on_report_decision(&self, decision: &ReportDecision) {
        if decision.verdict.is_transmitted() {
            return;
        }
        self.bar.println(format!(
            "{} seq_nr {} report #{}: {}",
            "x".red(),
            decision.seq_nr,
            decision.index,
            decision.verdict
        ));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl RoundProgressNotifier for SimpleProgress {
    fn on_round_start(&self, seq_nr: SeqNr, attempt: u32) {
        if attempt > 1 {
            println!(
                "{} {} (attempt {})",
                "->".cyan(),
                format!("seq_nr {}", seq_nr).bold(),
                attempt
            );
        } else {
            println!("{} {}", "->".cyan(), format!("seq_nr {}", seq_nr).bold());
        }
    }

    fn on_round_skipped(&self, _seq_nr: SeqNr, _attempt: u32, reason: &SkipReason) {
        println!("  {} skipped: {}", "!".yellow(), reason);
    }

    fn on_outcome_committed(&self, _seq_nr: SeqNr, outcome: &Outcome, report_count: usize) {
        println!(
            "  {} outcome of {} bytes, {} reports",
            "v".green(),
            outcome.len(),
            report_count
        );
    }

    fn on_report_decision(&self, decision: &ReportDecision) {
        let mark = if decision.verdict.is_transmitted() {
            "v".green()
        } else {
            "x".red()
        };
        println!(
            "  {} seq_nr {} report #{}: {}",
            mark, decision.seq_nr, decision.index, decision.verdict
        );
    }
}
