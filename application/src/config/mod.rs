//! Application-level configuration.
//!
//! - [`RoundParams`]: round and protocol loop control (deadline, retry budget, pacing)

pub mod round_params;

pub use round_params::RoundParams;
