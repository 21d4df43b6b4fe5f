//! Outcome domain: the append-only chain of committed outcomes.

pub mod chain;

pub use chain::{ChainError, OutcomeChain};
