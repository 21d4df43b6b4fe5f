//! Round domain: context, attributed observations, phases and skip reasons.

pub mod context;
pub mod observation;
pub mod phase;
pub mod skip;

pub use context::OutcomeContext;
pub use observation::AttributedObservation;
pub use phase::{RoundPhase, RoundState};
pub use skip::SkipReason;
