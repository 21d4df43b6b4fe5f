//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod attestor;
pub mod oracle_network;
pub mod progress;
pub mod reporting_plugin;
pub mod transmitter;
