//! Per-round context threaded into every plugin stage.

use crate::core::ids::SeqNr;
use crate::core::payload::Outcome;

/// Context of one round attempt.
///
/// `previous_outcome` is the committed outcome of `seq_nr - 1`. For the first
/// sequence number it is `None`, which is distinct from `Some` of an empty
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeContext {
    pub seq_nr: SeqNr,
    pub previous_outcome: Option<Outcome>,
    /// Legacy counter carried opaquely. Do not rely on it.
    pub epoch: u64,
    /// Legacy counter carried opaquely. Do not rely on it.
    pub round: u64,
}

impl OutcomeContext {
    pub fn new(seq_nr: SeqNr, previous_outcome: Option<Outcome>) -> Self {
        Self {
            seq_nr,
            previous_outcome,
            epoch: 0,
            round: 0,
        }
    }

    /// Context for the very first sequence number.
    pub fn first() -> Self {
        Self::new(SeqNr::FIRST, None)
    }

    pub fn with_legacy(mut self, epoch: u64, round: u64) -> Self {
        self.epoch = epoch;
        self.round = round;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_context_has_absent_previous() {
        let ctx = OutcomeContext::first();
        assert_eq!(ctx.seq_nr, SeqNr::FIRST);
        assert!(ctx.previous_outcome.is_none());
        assert_ne!(ctx.previous_outcome, Some(Outcome::empty()));
    }

    #[test]
    fn test_with_legacy() {
        let ctx = OutcomeContext::new(SeqNr::new(3), Some(Outcome::from(vec![1u8])))
            .with_legacy(2, 9);
        assert_eq!(ctx.epoch, 2);
        assert_eq!(ctx.round, 9);
    }
}
