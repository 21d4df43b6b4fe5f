//! Progress notification port
//!
//! Defines the interface for reporting progress while the protocol runs.

use reporting_domain::{Outcome, ReportDecision, RoundPhase, SeqNr, SkipReason};

/// Callback for progress updates during protocol execution
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (console, progress bars, etc.)
pub trait RoundProgressNotifier: Send + Sync {
    /// Called when a round attempt starts
    fn on_round_start(&self, seq_nr: SeqNr, attempt: u32);

    /// Called when a round attempt enters a new phase
    fn on_phase(&self, _seq_nr: SeqNr, _phase: RoundPhase) {}

    /// Called when a round attempt is abandoned
    fn on_round_skipped(&self, seq_nr: SeqNr, attempt: u32, reason: &SkipReason);

    /// Called when an outcome is committed for `seq_nr`
    fn on_outcome_committed(&self, seq_nr: SeqNr, outcome: &Outcome, report_count: usize);

    /// Called once a report has been routed to its final verdict
    fn on_report_decision(&self, _decision: &ReportDecision) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RoundProgressNotifier for NoProgress {
    fn on_round_start(&self, _seq_nr: SeqNr, _attempt: u32) {}
    fn on_round_skipped(&self, _seq_nr: SeqNr, _attempt: u32, _reason: &SkipReason) {}
    fn on_outcome_committed(&self, _seq_nr: SeqNr, _outcome: &Outcome, _report_count: usize) {}
}
