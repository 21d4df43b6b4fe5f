//! Domain layer for oracle-reporting
//!
//! This crate contains the pure core of the round-based reporting engine.
//! It has no dependencies on an async runtime, transport or storage.
//!
//! # Core Concepts
//!
//! ## Quorum
//!
//! Plugins ask for observation thresholds symbolically ([`Quorum`]); the
//! engine resolves them against the instance's `(n, f)`.
//!
//! ## Outcome Chain
//!
//! Each sequence number commits exactly one outcome. The outcome of `k - 1`
//! is threaded unchanged into the context of round `k` ([`OutcomeChain`]).
//!
//! ## Rounds
//!
//! A round attempt walks `QueryPending → ObservationGathering → QuorumCheck →
//! OutcomeComputed → ReportsGenerated → Done`, or is `Skipped` before an
//! outcome exists and retried ([`RoundPhase`]).

pub mod config;
pub mod core;
pub mod outcome;
pub mod quorum;
pub mod report;
pub mod round;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigIssueCode, MalformedPayload, OutputFormat, ProtocolLimits,
    ReportingPluginConfig, ReportingPluginInfo, ReportingPluginLimits, Severity,
};
pub use crate::core::{
    error::DomainError,
    ids::{ConfigDigest, OracleId, SeqNr},
    payload::{Observation, Outcome, PayloadKind, Query, Report},
};
pub use outcome::{ChainError, OutcomeChain};
pub use quorum::{Quorum, resolve};
pub use report::{ReportDecision, ReportInfo, ReportVerdict, ReportWithInfo};
pub use round::{AttributedObservation, OutcomeContext, RoundPhase, RoundState, SkipReason};
