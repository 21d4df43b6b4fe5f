//! Oracle network port
//!
//! The transport that asks every oracle for an observation and streams the
//! answers back. Leader election and the wire format live behind it.

use reporting_domain::{AttributedObservation, OutcomeContext, Query};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Fan-out of observation requests to the oracles of a protocol instance.
pub trait OracleNetwork: Send + Sync {
    /// Total number of oracles reachable through this network.
    fn n(&self) -> usize;

    /// Ask every oracle for an observation of `query` under `ctx`.
    ///
    /// Observations are delivered in arrival order. The channel closes once
    /// every oracle has either answered or given up. When `cancel` fires,
    /// outstanding requests stop promptly.
    ///
    /// Nothing delivered here is trusted: the receiver checks sizes, attribution
    /// and validity of every item.
    fn request_observations(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<AttributedObservation>;
}
