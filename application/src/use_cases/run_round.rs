//! Run Round use case
//!
//! Drives one attempt at one sequence number through the staged protocol:
//!
//! ```text
//! QueryPending -> ObservationGathering <-> QuorumCheck -> OutcomeComputed -> ReportsGenerated -> Done
//!       \________________\___________________/
//!                        Skipped
//! ```
//!
//! A skipped attempt commits nothing; the caller retries the same SeqNr.

use crate::config::RoundParams;
use crate::plugin::PluginAdapter;
use crate::ports::oracle_network::OracleNetwork;
use crate::ports::progress::{NoProgress, RoundProgressNotifier};
use reporting_domain::{
    AttributedObservation, ChainError, OracleId, Outcome, OutcomeChain, OutcomeContext, Query,
    ReportInfo, ReportWithInfo, RoundPhase, RoundState, SeqNr, SkipReason,
};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    #[error("Round {seq_nr} attempt {attempt} skipped: {reason}")]
    Skipped {
        seq_nr: SeqNr,
        attempt: u32,
        reason: SkipReason,
    },

    #[error("Commit failed: {0}")]
    Commit(#[from] ChainError),
}

impl RoundError {
    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            RoundError::Skipped { reason, .. } => Some(reason),
            RoundError::Commit(_) => None,
        }
    }
}

/// Input for one round attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundInput {
    pub seq_nr: SeqNr,
    /// 1-based attempt counter for this SeqNr
    pub attempt: u32,
    /// Legacy counters, threaded through untouched
    pub epoch: u64,
    pub round: u64,
}

impl RoundInput {
    pub fn new(seq_nr: SeqNr) -> Self {
        Self {
            seq_nr,
            attempt: 1,
            epoch: 0,
            round: 0,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_legacy(mut self, epoch: u64, round: u64) -> Self {
        self.epoch = epoch;
        self.round = round;
        self
    }
}

/// Result of a committed round
#[derive(Debug, Clone)]
pub struct RoundOutput<RI: ReportInfo> {
    pub seq_nr: SeqNr,
    pub attempt: u32,
    /// The committed outcome, sharing its buffer with the chain entry
    pub outcome: Outcome,
    /// Valid observations passed to the outcome stage
    pub observations_used: usize,
    /// Resolved quorum count
    pub required: usize,
    /// Observations dropped as malformed, invalid, duplicate or misattributed
    pub discarded: usize,
    pub reports: Vec<ReportWithInfo<RI>>,
}

/// Use case for running a single round attempt
pub struct RunRoundUseCase<RI: ReportInfo> {
    adapter: Arc<PluginAdapter<RI>>,
    network: Arc<dyn OracleNetwork>,
    chain: Arc<OutcomeChain>,
    params: RoundParams,
}

impl<RI: ReportInfo> RunRoundUseCase<RI> {
    pub fn new(
        adapter: Arc<PluginAdapter<RI>>,
        network: Arc<dyn OracleNetwork>,
        chain: Arc<OutcomeChain>,
        params: RoundParams,
    ) -> Self {
        Self {
            adapter,
            network,
            chain,
            params,
        }
    }

    pub fn adapter(&self) -> &Arc<PluginAdapter<RI>> {
        &self.adapter
    }

    pub fn chain(&self) -> &Arc<OutcomeChain> {
        &self.chain
    }

    pub fn params(&self) -> &RoundParams {
        &self.params
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(
        &self,
        input: RoundInput,
        cancel: &CancellationToken,
    ) -> Result<RoundOutput<RI>, RoundError> {
        self.execute_with_progress(input, &NoProgress, cancel).await
    }

    /// Execute the use case with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: RoundInput,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<RoundOutput<RI>, RoundError> {
        let mut state = RoundState::new(input.seq_nr, input.attempt);
        progress.on_round_start(input.seq_nr, input.attempt);

        let Some(previous_outcome) = self.chain.previous_outcome(input.seq_nr) else {
            return Err(self.skip(&mut state, SkipReason::MissingPreviousOutcome, progress));
        };
        let ctx = OutcomeContext::new(input.seq_nr, previous_outcome)
            .with_legacy(input.epoch, input.round);

        debug!(seq_nr = %input.seq_nr, attempt = input.attempt, "Round started");

        // Stage 1: Query
        let query = match self.adapter.query(&ctx, cancel).await {
            Ok(query) => query,
            Err(_) if cancel.is_cancelled() => {
                return Err(self.skip(&mut state, SkipReason::Cancelled, progress));
            }
            Err(e) => {
                return Err(self.skip(
                    &mut state,
                    SkipReason::QueryFailed(e.to_string()),
                    progress,
                ));
            }
        };

        // Stage 2-3: Gather until the quorum is met
        self.enter(&mut state, RoundPhase::ObservationGathering, progress);
        let gathered = match self.gather(&ctx, &query, &mut state, progress, cancel).await {
            Ok(gathered) => gathered,
            Err(reason) => return Err(self.skip(&mut state, reason, progress)),
        };

        // Stage 4: Outcome, computed while still in QuorumCheck so that a
        // failure can still skip the round
        let outcome = match self.adapter.outcome(&ctx, &query, &gathered.observations) {
            Ok(outcome) => outcome,
            Err(e) => {
                return Err(self.skip(
                    &mut state,
                    SkipReason::OutcomeFailed(e.to_string()),
                    progress,
                ));
            }
        };
        let outcome = self.chain.commit(input.seq_nr, outcome)?;
        self.enter(&mut state, RoundPhase::OutcomeComputed, progress);

        info!(
            seq_nr = %input.seq_nr,
            attempt = input.attempt,
            observations = gathered.observations.len(),
            required = gathered.required,
            "Outcome committed"
        );

        // Stage 5: Reports
        let reports = match self.adapter.reports(input.seq_nr, &outcome) {
            Ok(reports) => reports,
            Err(e) => {
                warn!(seq_nr = %input.seq_nr, "No reports for committed outcome: {}", e);
                Vec::new()
            }
        };
        self.enter(&mut state, RoundPhase::ReportsGenerated, progress);
        progress.on_outcome_committed(input.seq_nr, &outcome, reports.len());
        self.enter(&mut state, RoundPhase::Done, progress);

        Ok(RoundOutput {
            seq_nr: input.seq_nr,
            attempt: input.attempt,
            outcome,
            observations_used: gathered.observations.len(),
            required: gathered.required,
            discarded: gathered.discarded,
            reports,
        })
    }

    /// Collect validated observations until the resolved quorum is met.
    ///
    /// Observations are kept in arrival order. Outstanding requests are
    /// cancelled as soon as the quorum is met or the round gives up.
    async fn gather(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        state: &mut RoundState,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<Gathered, SkipReason> {
        let n = self.adapter.config().n;
        let kind = self
            .adapter
            .observation_quorum(ctx, query)
            .map_err(|e| SkipReason::QuorumFailed(e.to_string()))?;
        let required = self.adapter.config().quorum(kind);
        if required > n {
            return Err(SkipReason::QuorumUnreachable { required, n });
        }
        debug!(seq_nr = %ctx.seq_nr, %kind, required, "Quorum resolved");

        let requests = cancel.child_token();
        let _stop_requests = requests.clone().drop_guard();
        let mut rx = self
            .network
            .request_observations(ctx, query, requests.clone());

        let deadline = Instant::now() + self.params.round_deadline;
        let mut gathered = Gathered {
            observations: Vec::with_capacity(required),
            required,
            discarded: 0,
        };
        let mut seen: HashSet<OracleId> = HashSet::new();

        while gathered.observations.len() < required {
            let valid = gathered.observations.len();
            let ao = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SkipReason::Cancelled),
                () = sleep_until(deadline) => {
                    return Err(SkipReason::DeadlineExceeded { valid, required });
                }
                arrival = rx.recv() => match arrival {
                    Some(ao) => ao,
                    None => return Err(SkipReason::ObservationsExhausted { valid, required }),
                },
            };

            if let Err(reason) = self.admit(ctx, query, &ao, n, &mut seen) {
                debug!(seq_nr = %ctx.seq_nr, observer = %ao.observer, "Observation discarded: {}", reason);
                gathered.discarded += 1;
                continue;
            }
            gathered.observations.push(ao);

            self.enter(state, RoundPhase::QuorumCheck, progress);
            if gathered.observations.len() < required {
                self.enter(state, RoundPhase::ObservationGathering, progress);
            }
        }

        requests.cancel();
        debug!(
            seq_nr = %ctx.seq_nr,
            valid = gathered.observations.len(),
            discarded = gathered.discarded,
            "Quorum reached"
        );
        Ok(gathered)
    }

    /// Check attribution, uniqueness and validity of one arrival.
    fn admit(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        ao: &AttributedObservation,
        n: usize,
        seen: &mut HashSet<OracleId>,
    ) -> Result<(), String> {
        if ao.observer.index() >= n {
            return Err(format!("observer outside 0..{}", n));
        }
        if seen.contains(&ao.observer) {
            return Err("duplicate observer".to_string());
        }
        self.adapter
            .validate_observation(ctx, query, ao)
            .map_err(|e| e.to_string())?;
        seen.insert(ao.observer);
        Ok(())
    }

    fn enter(&self, state: &mut RoundState, phase: RoundPhase, progress: &dyn RoundProgressNotifier) {
        if let Err(e) = state.advance(phase) {
            warn!(seq_nr = %state.seq_nr(), "{}", e);
            return;
        }
        progress.on_phase(state.seq_nr(), phase);
    }

    fn skip(
        &self,
        state: &mut RoundState,
        reason: SkipReason,
        progress: &dyn RoundProgressNotifier,
    ) -> RoundError {
        if let Err(e) = state.advance(RoundPhase::Skipped) {
            warn!(seq_nr = %state.seq_nr(), "{}", e);
        }
        if reason.is_timeout() {
            info!(seq_nr = %state.seq_nr(), attempt = state.attempt(), "Round skipped: {}", reason);
        } else {
            warn!(seq_nr = %state.seq_nr(), attempt = state.attempt(), "Round skipped: {}", reason);
        }
        progress.on_round_skipped(state.seq_nr(), state.attempt(), &reason);
        RoundError::Skipped {
            seq_nr: state.seq_nr(),
            attempt: state.attempt(),
            reason,
        }
    }
}

struct Gathered {
    observations: Vec<AttributedObservation>,
    required: usize,
    discarded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockPlugin, ScriptedNetwork, test_config, test_info};
    use reporting_domain::Quorum;
    use std::time::Duration;

    struct Fixture {
        plugin: Arc<MockPlugin>,
        network: Arc<ScriptedNetwork>,
        chain: Arc<OutcomeChain>,
        use_case: RunRoundUseCase<String>,
    }

    fn fixture(n: usize, f: usize, plugin: MockPlugin, network: ScriptedNetwork) -> Fixture {
        let plugin = Arc::new(plugin);
        let network = Arc::new(network);
        let chain = Arc::new(OutcomeChain::new());
        let adapter = Arc::new(PluginAdapter::new(
            plugin.clone(),
            test_info(),
            test_config(n, f),
        ));
        let params = RoundParams::default().with_round_deadline(Duration::from_secs(1));
        let use_case = RunRoundUseCase::new(adapter, network.clone(), chain.clone(), params);
        Fixture {
            plugin,
            network,
            chain,
            use_case,
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[tokio::test(start_paused = true)]
    async fn test_quorum_met_outcome_computed_once() {
        // N=4, F=1, 2F+1 = 3; the fourth answer arrives after quorum
        let network = ScriptedNetwork::new()
            .arrival(0, 8, ms(10))
            .arrival(1, 8, ms(20))
            .arrival(2, 8, ms(30))
            .arrival(3, 8, ms(500));
        let fx = fixture(4, 1, MockPlugin::new().with_quorum(Quorum::TwoFPlusOne), network);

        let output = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.required, 3);
        assert_eq!(output.observations_used, 3);
        assert_eq!(fx.plugin.calls("outcome"), 1);
        assert_eq!(fx.plugin.outcome_observers(), vec![vec![0, 1, 2]]);
        assert!(fx.chain.is_committed(SeqNr::FIRST));
        assert_eq!(output.reports.len(), 1);
        assert!(fx.network.was_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_observations_passed_in_arrival_order() {
        let network = ScriptedNetwork::new()
            .arrival(3, 8, ms(10))
            .arrival(0, 8, ms(20))
            .arrival(2, 8, ms(30));
        let fx = fixture(4, 1, MockPlugin::new(), network);

        fx.use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(fx.plugin.outcome_observers(), vec![vec![3, 0, 2]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_skips_round_and_same_seq_nr_retries() {
        // N=4, F=1: only two answers before the deadline, the rest stay silent
        let network = ScriptedNetwork::new()
            .arrival(0, 8, ms(10))
            .arrival(1, 8, ms(20))
            .silent();
        let fx = fixture(4, 1, MockPlugin::new(), network);

        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RoundError::Skipped {
                seq_nr: SeqNr::FIRST,
                attempt: 1,
                reason: SkipReason::DeadlineExceeded {
                    valid: 2,
                    required: 3,
                },
            }
        );
        assert_eq!(fx.plugin.calls("outcome"), 0);
        assert!(!fx.chain.is_committed(SeqNr::FIRST));

        // Retry the same SeqNr against a healthier network
        let network = Arc::new(
            ScriptedNetwork::new()
                .arrival(0, 8, ms(10))
                .arrival(1, 8, ms(20))
                .arrival(2, 8, ms(30)),
        );
        let retry = RunRoundUseCase::new(
            fx.use_case.adapter().clone(),
            network,
            fx.chain.clone(),
            fx.use_case.params().clone(),
        );
        let output = retry
            .execute(
                RoundInput::new(SeqNr::FIRST).with_attempt(2),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(output.attempt, 2);
        assert_eq!(fx.plugin.calls("outcome"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_observation_excluded_from_quorum() {
        let max = test_info().limits.max_observation_length;
        let network = ScriptedNetwork::new()
            .arrival(0, max, ms(10))
            .arrival(1, max + 1, ms(20))
            .arrival(2, 8, ms(30));
        let fx = fixture(4, 1, MockPlugin::new(), network);

        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.skip_reason(),
            Some(&SkipReason::ObservationsExhausted {
                valid: 2,
                required: 3,
            })
        );
        assert_eq!(fx.plugin.calls("outcome"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_misattributed_and_invalid_observations_discarded() {
        let network = ScriptedNetwork::new()
            .arrival(0, 8, ms(10))
            .arrival(0, 8, ms(20))
            .arrival(9, 8, ms(30))
            .arrival(1, 8, ms(40))
            .arrival(2, 8, ms(50))
            .arrival(3, 8, ms(60));
        let plugin = MockPlugin::new().rejecting(OracleId::new(1));
        let fx = fixture(4, 1, plugin, network);

        let output = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.discarded, 3);
        assert_eq!(fx.plugin.outcome_observers(), vec![vec![0, 2, 3]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_quorum_skips_without_gathering() {
        // N=2, F=1: 2F+1 = 3 > N
        let fx = fixture(
            2,
            1,
            MockPlugin::new(),
            ScriptedNetwork::new().arrival(0, 8, ms(10)),
        );
        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.skip_reason(),
            Some(&SkipReason::QuorumUnreachable { required: 3, n: 2 })
        );
        assert_eq!(fx.network.requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_previous_outcome_skips() {
        let fx = fixture(4, 1, MockPlugin::new(), ScriptedNetwork::new());
        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::new(2)), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.skip_reason(), Some(&SkipReason::MissingPreviousOutcome));
        assert_eq!(fx.plugin.calls("query"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_outcome_threaded_without_copy() {
        let network = ScriptedNetwork::new()
            .arrival(0, 8, ms(10))
            .arrival(1, 8, ms(20))
            .arrival(2, 8, ms(30));
        let fx = fixture(4, 1, MockPlugin::new(), network);
        let cancel = CancellationToken::new();

        let first = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &cancel)
            .await
            .unwrap();
        fx.use_case
            .execute(RoundInput::new(SeqNr::new(2)).with_legacy(3, 4), &cancel)
            .await
            .unwrap();

        let contexts = fx.plugin.outcome_contexts();
        assert!(contexts[0].previous_outcome.is_none());
        let previous = contexts[1].previous_outcome.as_ref().unwrap();
        assert_eq!(previous, &first.outcome);
        assert_eq!(previous.as_bytes().as_ptr(), first.outcome.as_bytes().as_ptr());
        assert_eq!((contexts[1].epoch, contexts[1].round), (3, 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_skips() {
        let fx = fixture(4, 1, MockPlugin::new().failing_query(), ScriptedNetwork::new());
        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.skip_reason(),
            Some(SkipReason::QueryFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_failure_skips_without_commit() {
        let network = ScriptedNetwork::new()
            .arrival(0, 8, ms(10))
            .arrival(1, 8, ms(20))
            .arrival(2, 8, ms(30));
        let fx = fixture(4, 1, MockPlugin::new().failing_outcome(), network);
        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.skip_reason(),
            Some(SkipReason::OutcomeFailed(_))
        ));
        assert!(fx.chain.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_skips() {
        let network = ScriptedNetwork::new().arrival(0, 8, ms(10)).silent();
        let fx = fixture(4, 1, MockPlugin::new(), network);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(100)).await;
            trigger.cancel();
        });

        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.skip_reason(), Some(&SkipReason::Cancelled));
        assert!(fx.chain.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflicting_commit_surfaces_chain_error() {
        let network = ScriptedNetwork::new()
            .arrival(0, 8, ms(10))
            .arrival(1, 8, ms(20))
            .arrival(2, 8, ms(30));
        let fx = fixture(4, 1, MockPlugin::new(), network);
        fx.chain
            .commit(SeqNr::FIRST, Outcome::from(vec![0xff]))
            .unwrap();

        let err = fx
            .use_case
            .execute(RoundInput::new(SeqNr::FIRST), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RoundError::Commit(ChainError::AlreadyCommitted(SeqNr::FIRST))
        );
    }
}
