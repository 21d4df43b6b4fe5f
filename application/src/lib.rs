//! Application layer for oracle-reporting
//!
//! This crate contains the ports the engine talks through, the plugin adapter
//! and lifecycle manager, and the round, report and protocol use cases.
//! It depends only on the domain layer.

pub mod config;
pub mod plugin;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::RoundParams;
pub use plugin::{LifecycleError, PluginAdapter, PluginLifecycleManager, Stage, StageError};
pub use ports::{
    attestor::{Attestation, AttestationError, ReportAttestor},
    oracle_network::OracleNetwork,
    progress::{NoProgress, RoundProgressNotifier},
    reporting_plugin::{PluginError, ReportingPlugin, ReportingPluginFactory},
    transmitter::{ReportTransmitter, TransmitError},
};
pub use use_cases::route_report::ReportPipeline;
pub use use_cases::run_protocol::{
    ProtocolSummary, RunProtocolError, RunProtocolInput, RunProtocolUseCase,
};
pub use use_cases::run_round::{RoundError, RoundInput, RoundOutput, RunRoundUseCase};
