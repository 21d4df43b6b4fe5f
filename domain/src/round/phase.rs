//! Round state machine
//!
//! ```text
//! QueryPending ──► ObservationGathering ◄──► QuorumCheck ──► OutcomeComputed
//!      │                    │                     │                 │
//!      └────────────────────┴──────► Skipped ◄────┘                 ▼
//!                                                           ReportsGenerated ──► Done
//! ```
//!
//! A skipped round commits nothing; the same sequence number is attempted
//! again later.

use crate::core::error::DomainError;
use crate::core::ids::SeqNr;
use serde::{Deserialize, Serialize};

/// Phase of a single round attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Waiting for the query for the current context
    QueryPending,
    /// Collecting attributed observations from the oracles
    ObservationGathering,
    /// Comparing valid observations against the resolved quorum
    QuorumCheck,
    /// Outcome computed and committed to the chain
    OutcomeComputed,
    /// Reports derived from the committed outcome
    ReportsGenerated,
    /// Terminal: round finished
    Done,
    /// Terminal: round abandoned before an outcome was computed
    Skipped,
}

impl RoundPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundPhase::QueryPending => "query_pending",
            RoundPhase::ObservationGathering => "observation_gathering",
            RoundPhase::QuorumCheck => "quorum_check",
            RoundPhase::OutcomeComputed => "outcome_computed",
            RoundPhase::ReportsGenerated => "reports_generated",
            RoundPhase::Done => "done",
            RoundPhase::Skipped => "skipped",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoundPhase::QueryPending => "Query",
            RoundPhase::ObservationGathering => "Gather Observations",
            RoundPhase::QuorumCheck => "Quorum Check",
            RoundPhase::OutcomeComputed => "Outcome",
            RoundPhase::ReportsGenerated => "Reports",
            RoundPhase::Done => "Done",
            RoundPhase::Skipped => "Skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RoundPhase::Done | RoundPhase::Skipped)
    }

    /// Whether a round in this phase may still be abandoned.
    pub fn can_skip(&self) -> bool {
        matches!(
            self,
            RoundPhase::QueryPending | RoundPhase::ObservationGathering | RoundPhase::QuorumCheck
        )
    }

    pub fn can_transition_to(&self, next: RoundPhase) -> bool {
        use RoundPhase::*;

        if next == Skipped {
            return self.can_skip();
        }

        matches!(
            (*self, next),
            (QueryPending, ObservationGathering)
                | (ObservationGathering, QuorumCheck)
                | (QuorumCheck, ObservationGathering)
                | (QuorumCheck, OutcomeComputed)
                | (OutcomeComputed, ReportsGenerated)
                | (ReportsGenerated, Done)
        )
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Tracks the phase of one round attempt and rejects illegal transitions.
#[derive(Debug, Clone)]
pub struct RoundState {
    seq_nr: SeqNr,
    attempt: u32,
    phase: RoundPhase,
}

impl RoundState {
    pub fn new(seq_nr: SeqNr, attempt: u32) -> Self {
        Self {
            seq_nr,
            attempt,
            phase: RoundPhase::QueryPending,
        }
    }

    pub fn seq_nr(&self) -> SeqNr {
        self.seq_nr
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn advance(&mut self, next: RoundPhase) -> Result<(), DomainError> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.phase.as_str(),
                to: next.as_str(),
            });
        }
        self.phase = next;
        Ok(())
    }
}
