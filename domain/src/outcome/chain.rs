//! Append-only chain of committed outcomes.
//!
//! Every sequence number owns a write-once slot. The map lock is held only
//! long enough to find or create a slot; the commit itself goes through the
//! slot, so rounds for different sequence numbers never contend on a commit,
//! and reads of committed entries never block on an in-progress commit.

use crate::core::ids::SeqNr;
use crate::core::payload::Outcome;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("sequence number 0 is not valid")]
    ZeroSeqNr,

    #[error("seq_nr {0} already holds a different outcome")]
    AlreadyCommitted(SeqNr),

    #[error("seq_nr {seq_nr} cannot be committed before seq_nr {missing}")]
    NotContiguous { seq_nr: SeqNr, missing: SeqNr },
}

type Slot = Arc<OnceLock<Outcome>>;

/// Append-only mapping `SeqNr -> Outcome`.
#[derive(Debug, Default)]
pub struct OutcomeChain {
    slots: RwLock<BTreeMap<SeqNr, Slot>>,
    head: AtomicU64,
}

impl OutcomeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `outcome` for `seq_nr`.
    ///
    /// The first writer wins. Re-committing byte-identical bytes is accepted and
    /// returns the already-committed outcome; different bytes are rejected.
    /// `seq_nr` may only be committed once `seq_nr - 1` is.
    pub fn commit(&self, seq_nr: SeqNr, outcome: Outcome) -> Result<Outcome, ChainError> {
        if seq_nr.get() == 0 {
            return Err(ChainError::ZeroSeqNr);
        }
        if let Some(prev) = seq_nr.prev()
            && self.get(prev).is_none()
        {
            return Err(ChainError::NotContiguous {
                seq_nr,
                missing: prev,
            });
        }

        let slot = self.slot(seq_nr);
        let mut fresh = false;
        let committed = slot.get_or_init(|| {
            fresh = true;
            outcome.clone()
        });

        if !fresh && committed != &outcome {
            return Err(ChainError::AlreadyCommitted(seq_nr));
        }

        self.head.fetch_max(seq_nr.get(), Ordering::AcqRel);
        Ok(committed.clone())
    }

    /// The committed outcome for `seq_nr`, if any.
    pub fn get(&self, seq_nr: SeqNr) -> Option<Outcome> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&seq_nr).and_then(|slot| slot.get().cloned())
    }

    /// The outcome to thread into the context of `seq_nr`.
    ///
    /// Returns `Some(None)` for the first sequence number: the previous outcome
    /// is explicitly absent. Returns `None` when the predecessor has not been
    /// committed yet.
    pub fn previous_outcome(&self, seq_nr: SeqNr) -> Option<Option<Outcome>> {
        match seq_nr.prev() {
            None => Some(None),
            Some(prev) => self.get(prev).map(Some),
        }
    }

    pub fn is_committed(&self, seq_nr: SeqNr) -> bool {
        self.get(seq_nr).is_some()
    }

    /// Highest committed sequence number, if anything has been committed.
    pub fn head(&self) -> Option<SeqNr> {
        match self.head.load(Ordering::Acquire) {
            0 => None,
            n => Some(SeqNr::new(n)),
        }
    }

    /// The next sequence number that has no committed outcome.
    pub fn next_seq_nr(&self) -> SeqNr {
        self.head().map_or(SeqNr::FIRST, SeqNr::next)
    }

    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.head().is_none()
    }

    fn slot(&self, seq_nr: SeqNr) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(&seq_nr) {
                return Arc::clone(slot);
            }
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(seq_nr).or_default())
    }
}
