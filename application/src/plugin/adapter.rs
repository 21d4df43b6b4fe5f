//! Plugin adapter
//!
//! Wraps a [`ReportingPlugin`] behind the uniform capability set the round
//! orchestrator uses, and enforces what the plugin itself cannot be trusted
//! to enforce:
//!
//! - per-stage time budgets for the four suspending calls (query,
//!   observation, should-accept, should-transmit), each bounded by a child
//!   [`CancellationToken`] that is cancelled when the budget expires
//! - declared byte limits on queries, observations, outcomes and reports,
//!   and the declared report count
//! - close-after-quiescence: `close` waits for in-flight calls, a second
//!   `close` is an error, and no stage runs after `close` returns

use crate::ports::reporting_plugin::{PluginError, ReportingPlugin};
use reporting_domain::{
    AttributedObservation, MalformedPayload, Observation, Outcome, OutcomeContext, PayloadKind,
    Query, Quorum, ReportInfo, ReportWithInfo, ReportingPluginConfig, ReportingPluginInfo,
    ReportingPluginLimits, SeqNr,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A plugin entry point, as seen by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Query,
    Observation,
    ValidateObservation,
    ObservationQuorum,
    Outcome,
    Reports,
    ShouldAccept,
    ShouldTransmit,
    Close,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Query => "query",
            Stage::Observation => "observation",
            Stage::ValidateObservation => "validate_observation",
            Stage::ObservationQuorum => "observation_quorum",
            Stage::Outcome => "outcome",
            Stage::Reports => "reports",
            Stage::ShouldAccept => "should_accept_attested_report",
            Stage::ShouldTransmit => "should_transmit_accepted_report",
            Stage::Close => "close",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure of one stage call. Never fatal to the process or to other rounds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("{stage} failed: {source}")]
    Plugin { stage: Stage, source: PluginError },

    #[error("{stage} exceeded its budget of {budget:?}")]
    Timeout { stage: Stage, budget: Duration },

    #[error("{stage} cancelled")]
    Cancelled { stage: Stage },

    #[error("{stage} produced a malformed payload: {source}")]
    Malformed {
        stage: Stage,
        source: MalformedPayload,
    },

    #[error("{stage} called after close")]
    Closed { stage: Stage },

    #[error("Plugin already closed")]
    AlreadyClosed,
}

impl StageError {
    /// Whether this is misuse of a closed instance rather than a plugin fault.
    pub fn is_lifecycle_misuse(&self) -> bool {
        matches!(self, StageError::Closed { .. } | StageError::AlreadyClosed)
    }

    /// Whether the stage ran out of time or was cancelled.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            StageError::Timeout { .. } | StageError::Cancelled { .. }
        )
    }
}

/// Counts a call as in flight until dropped.
struct CallGuard<'a> {
    in_flight: &'a AtomicUsize,
    idle: &'a Notify,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Uniform, bounded access to one plugin instance.
pub struct PluginAdapter<RI: ReportInfo> {
    plugin: Arc<dyn ReportingPlugin<RI>>,
    info: ReportingPluginInfo,
    config: ReportingPluginConfig,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl<RI: ReportInfo> fmt::Debug for PluginAdapter<RI> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginAdapter")
            .field("info", &self.info)
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl<RI: ReportInfo> PluginAdapter<RI> {
    pub fn new(
        plugin: Arc<dyn ReportingPlugin<RI>>,
        info: ReportingPluginInfo,
        config: ReportingPluginConfig,
    ) -> Self {
        Self {
            plugin,
            info,
            config,
            closed: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    // ==================== Accessors ====================

    pub fn info(&self) -> &ReportingPluginInfo {
        &self.info
    }

    pub fn limits(&self) -> &ReportingPluginLimits {
        &self.info.limits
    }

    pub fn config(&self) -> &ReportingPluginConfig {
        &self.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of calls currently executing on this instance.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    // ==================== Suspending stages ====================

    pub async fn query(
        &self,
        ctx: &OutcomeContext,
        cancel: &CancellationToken,
    ) -> Result<Query, StageError> {
        let stage = Stage::Query;
        let _guard = self.enter(stage)?;
        let token = cancel.child_token();
        let budget = self.config.max_duration_query;

        let query = bounded(stage, budget, &token, self.plugin.query(&token, ctx)).await?;
        self.check_length(stage, PayloadKind::Query, query.len())?;
        Ok(query)
    }

    /// Produce this oracle's own observation.
    pub async fn observation(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Observation, StageError> {
        let stage = Stage::Observation;
        let _guard = self.enter(stage)?;
        let token = cancel.child_token();
        let budget = self.config.max_duration_observation;

        let observation = bounded(
            stage,
            budget,
            &token,
            self.plugin.observation(&token, ctx, query),
        )
        .await?;
        self.check_length(stage, PayloadKind::Observation, observation.len())?;
        Ok(observation)
    }

    pub async fn should_accept_attested_report(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        cancel: &CancellationToken,
    ) -> Result<bool, StageError> {
        let stage = Stage::ShouldAccept;
        let _guard = self.enter(stage)?;
        let token = cancel.child_token();
        let budget = self.config.max_duration_should_accept_attested_report;

        bounded(
            stage,
            budget,
            &token,
            self.plugin
                .should_accept_attested_report(&token, seq_nr, report),
        )
        .await
    }

    pub async fn should_transmit_accepted_report(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        cancel: &CancellationToken,
    ) -> Result<bool, StageError> {
        let stage = Stage::ShouldTransmit;
        let _guard = self.enter(stage)?;
        let token = cancel.child_token();
        let budget = self.config.max_duration_should_transmit_accepted_report;

        bounded(
            stage,
            budget,
            &token,
            self.plugin
                .should_transmit_accepted_report(&token, seq_nr, report),
        )
        .await
    }

    // ==================== Compute stages ====================

    /// Check an observation received from any oracle, including this one.
    ///
    /// Oversized observations are rejected before the plugin sees them.
    pub fn validate_observation(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        ao: &AttributedObservation,
    ) -> Result<(), StageError> {
        let stage = Stage::ValidateObservation;
        let _guard = self.enter(stage)?;
        self.check_length(stage, PayloadKind::Observation, ao.observation.len())?;
        self.plugin
            .validate_observation(ctx, query, ao)
            .map_err(|source| StageError::Plugin { stage, source })
    }

    pub fn observation_quorum(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
    ) -> Result<Quorum, StageError> {
        let stage = Stage::ObservationQuorum;
        let _guard = self.enter(stage)?;
        self.plugin
            .observation_quorum(ctx, query)
            .map_err(|source| StageError::Plugin { stage, source })
    }

    pub fn outcome(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        aos: &[AttributedObservation],
    ) -> Result<Outcome, StageError> {
        let stage = Stage::Outcome;
        let _guard = self.enter(stage)?;
        let outcome = self
            .plugin
            .outcome(ctx, query, aos)
            .map_err(|source| StageError::Plugin { stage, source })?;
        self.check_length(stage, PayloadKind::Outcome, outcome.len())?;
        Ok(outcome)
    }

    /// Derive reports from a committed outcome.
    ///
    /// Oversized reports are dropped individually; exceeding the report count
    /// fails the whole stage.
    pub fn reports(
        &self,
        seq_nr: SeqNr,
        outcome: &Outcome,
    ) -> Result<Vec<ReportWithInfo<RI>>, StageError> {
        let stage = Stage::Reports;
        let _guard = self.enter(stage)?;
        let reports = self
            .plugin
            .reports(seq_nr, outcome)
            .map_err(|source| StageError::Plugin { stage, source })?;

        self.limits()
            .check_report_count(reports.len())
            .map_err(|source| StageError::Malformed { stage, source })?;

        Ok(reports
            .into_iter()
            .enumerate()
            .filter_map(|(index, report)| {
                match self.check_length(stage, PayloadKind::Report, report.report.len()) {
                    Ok(()) => Some(report),
                    Err(e) => {
                        warn!(%seq_nr, index, "Discarding report: {}", e);
                        None
                    }
                }
            })
            .collect())
    }

    // ==================== Lifecycle ====================

    /// Close the instance once every in-flight call has returned.
    ///
    /// New calls are refused from the moment `close` starts. A second call
    /// returns [`StageError::AlreadyClosed`].
    pub async fn close(&self) -> Result<(), StageError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(StageError::AlreadyClosed);
        }

        loop {
            let idle = self.idle.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            debug!(
                in_flight = self.in_flight(),
                "Waiting for in-flight calls before closing {}", self.info.name
            );
            idle.await;
        }

        self.plugin.close().map_err(|source| StageError::Plugin {
            stage: Stage::Close,
            source,
        })
    }

    // ==================== Helpers ====================

    fn enter(&self, stage: Stage) -> Result<CallGuard<'_>, StageError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = CallGuard {
            in_flight: &self.in_flight,
            idle: &self.idle,
        };
        if self.is_closed() {
            return Err(StageError::Closed { stage });
        }
        Ok(guard)
    }

    fn check_length(&self, stage: Stage, kind: PayloadKind, len: usize) -> Result<(), StageError> {
        self.limits()
            .check_length(kind, len)
            .map_err(|source| StageError::Malformed { stage, source })
    }
}

/// Run a plugin call under a time budget and a cancellation token.
///
/// The token is cancelled once the call is abandoned or finishes, so any work
/// the plugin spawned under it stops waiting on external services.
async fn bounded<T>(
    stage: Stage,
    budget: Duration,
    token: &CancellationToken,
    call: impl Future<Output = Result<T, PluginError>>,
) -> Result<T, StageError> {
    let result = tokio::select! {
        biased;
        () = token.cancelled() => Err(StageError::Cancelled { stage }),
        res = tokio::time::timeout(budget, call) => match res {
            Ok(inner) => inner.map_err(|source| StageError::Plugin { stage, source }),
            Err(_) => Err(StageError::Timeout { stage, budget }),
        },
    };
    token.cancel();
    result
}
