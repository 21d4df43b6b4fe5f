//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod route_report;
pub mod run_protocol;
pub mod run_round;
