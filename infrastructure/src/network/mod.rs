//! Oracle networks.
//!
//! [`LocalOracleNetwork`] runs every oracle in this process, each with its own
//! plugin instance, and can make chosen oracles misbehave.

mod local;

pub use local::{LocalOracleNetwork, OracleBehavior};
