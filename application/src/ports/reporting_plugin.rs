//! Reporting plugin port
//!
//! Defines the capability set an application plugs into the reporting
//! protocol. The engine handles quorum, chaining, attestation and delivery;
//! the plugin handles what the bytes mean.

use async_trait::async_trait;
use reporting_domain::{
    AttributedObservation, Observation, Outcome, OutcomeContext, Query, Quorum,
    ReportInfo, ReportWithInfo, ReportingPluginConfig, ReportingPluginInfo, SeqNr,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors returned by plugin implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Plugin already closed")]
    AlreadyClosed,

    #[error("Other error: {0}")]
    Other(String),
}

/// Application logic plugged into the reporting protocol.
///
/// Every correct oracle runs the same implementation, but up to `f` oracles
/// may be faulty in arbitrary ways. Implementations must cope with:
///
/// - only a subset of the functions being invoked for a given round
/// - an arbitrary number of sequence numbers being skipped between calls
/// - their own observation not being among those passed to `outcome`
/// - malformed queries and observations
/// - different oracles seeing different call traces
///
/// All functions must be safe to call concurrently, including for
/// overlapping sequence numbers.
///
/// The async functions take a [`CancellationToken`]. Once it fires they may
/// finish cheap in-memory work but must stop waiting on external services
/// and return promptly.
///
/// State that must survive a restart belongs in the outcome or in external
/// storage. An instance serves exactly one protocol instance.
#[async_trait]
pub trait ReportingPlugin<RI: ReportInfo>: Send + Sync {
    /// Create the query the leader sends to all followers.
    ///
    /// A malicious leader could send different queries to different
    /// followers. `ctx.seq_nr` increases monotonically, though not strictly.
    async fn query(
        &self,
        cancel: &CancellationToken,
        ctx: &OutcomeContext,
    ) -> Result<Query, PluginError>;

    /// Observe the underlying data source for `query`.
    async fn observation(
        &self,
        cancel: &CancellationToken,
        ctx: &OutcomeContext,
        query: &Query,
    ) -> Result<Observation, PluginError>;

    /// Return an error if the observation is not well-formed. Should be pure
    /// and fast; called once per received observation.
    fn validate_observation(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        ao: &AttributedObservation,
    ) -> Result<(), PluginError>;

    /// Minimum number of valid observations needed to build an outcome.
    /// Should be pure and fast.
    fn observation_quorum(&self, ctx: &OutcomeContext, query: &Query)
    -> Result<Quorum, PluginError>;

    /// Build the outcome for `ctx.seq_nr` from validated observations.
    ///
    /// Must be pure. Observations arrive in arrival order, which differs
    /// between oracles, so the result must not depend on their order.
    fn outcome(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        aos: &[AttributedObservation],
    ) -> Result<Outcome, PluginError>;

    /// Derive zero or more reports from a committed outcome. Must be pure.
    fn reports(&self, seq_nr: SeqNr, outcome: &Outcome)
    -> Result<Vec<ReportWithInfo<RI>>, PluginError>;

    /// Decide whether an attested report should be accepted for transmission.
    ///
    /// May be called in any seq_nr order, long after the producing round,
    /// and after a restart with no call history for sibling reports.
    async fn should_accept_attested_report(
        &self,
        cancel: &CancellationToken,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
    ) -> Result<bool, PluginError>;

    /// Decide whether an accepted report should actually be transmitted.
    /// Invoked immediately before transmission, under the same ordering
    /// caveats as [`should_accept_attested_report`](Self::should_accept_attested_report).
    async fn should_transmit_accepted_report(
        &self,
        cancel: &CancellationToken,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
    ) -> Result<bool, PluginError>;

    /// Release held resources. Only called after every other call on this
    /// instance has returned. A second call must return an error, never panic.
    fn close(&self) -> Result<(), PluginError>;
}

/// Creates one plugin instance per protocol run.
pub trait ReportingPluginFactory<RI: ReportInfo>: Send + Sync {
    /// Create a plugin instance and the info it advertises.
    ///
    /// The instance may hold resources; they are released by its `close`.
    fn new_reporting_plugin(
        &self,
        config: &ReportingPluginConfig,
    ) -> Result<(Arc<dyn ReportingPlugin<RI>>, ReportingPluginInfo), PluginError>;
}
