//! Infrastructure layer for oracle-reporting
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: an in-process oracle network, local
//! attestation, report transmitters, the reference median plugin and
//! configuration file loading.

pub mod attestation;
pub mod config;
pub mod network;
pub mod plugins;
pub mod transmission;

// Re-export commonly used types
pub use attestation::LocalAttestor;
pub use config::{
    ConfigLoader, FileConfig, FileLimitsConfig, FileOutputConfig, FileProtocolConfig,
    FileSimulationConfig,
};
pub use network::{LocalOracleNetwork, OracleBehavior};
pub use plugins::{MedianPluginFactory, MedianReportInfo, PriceFeed, SimulatedPriceFeed};
pub use transmission::{FanoutTransmitter, InMemoryTransmitter, JsonlTransmitter, TransmittedReport};
