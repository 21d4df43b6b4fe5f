//! Run Protocol use case
//!
//! Advances the outcome chain one sequence number at a time. A skipped
//! attempt is retried at the same SeqNr (within the attempt budget); every
//! committed outcome hands its reports to the report pipeline, which runs in
//! the background so the next round does not wait on transmission.

use super::route_report::ReportPipeline;
use super::run_round::{RoundError, RoundInput, RunRoundUseCase};
use crate::ports::progress::{NoProgress, RoundProgressNotifier};
use reporting_domain::{
    ChainError, ReportDecision, ReportInfo, ReportWithInfo, SeqNr, SkipReason,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RunProtocolError {
    #[error("Gave up on seq_nr {seq_nr} after {attempts} attempts, last: {last}")]
    AttemptsExhausted {
        seq_nr: SeqNr,
        attempts: u32,
        last: SkipReason,
    },

    #[error(transparent)]
    Round(#[from] RoundError),
}

/// Input for the RunProtocol use case
#[derive(Debug, Clone, Copy, Default)]
pub struct RunProtocolInput {
    /// Stop after this many committed outcomes; `None` runs until cancelled.
    pub max_rounds: Option<u64>,
}

impl RunProtocolInput {
    pub fn rounds(max_rounds: u64) -> Self {
        Self {
            max_rounds: Some(max_rounds),
        }
    }

    pub fn unbounded() -> Self {
        Self { max_rounds: None }
    }
}

/// What a protocol run achieved
#[derive(Debug, Clone, Default)]
pub struct ProtocolSummary {
    /// Sequence numbers this run advanced past, in order, including those
    /// another writer committed first
    pub committed: Vec<SeqNr>,
    /// Round attempts made, committed or not
    pub attempts: u64,
    pub skipped: u64,
    pub decisions: Vec<ReportDecision>,
    pub cancelled: bool,
}

impl ProtocolSummary {
    pub fn transmitted(&self) -> usize {
        self.decisions
            .iter()
            .filter(|d| d.verdict.is_transmitted())
            .count()
    }

    pub fn head(&self) -> Option<SeqNr> {
        self.committed.last().copied()
    }
}

/// Use case for driving rounds and reports until done
pub struct RunProtocolUseCase<RI: ReportInfo> {
    round: RunRoundUseCase<RI>,
    pipeline: Arc<ReportPipeline<RI>>,
}

impl<RI: ReportInfo> RunProtocolUseCase<RI> {
    pub fn new(round: RunRoundUseCase<RI>, pipeline: Arc<ReportPipeline<RI>>) -> Self {
        Self { round, pipeline }
    }

    /// Execute the use case with default (no-op) progress
    pub async fn execute(
        &self,
        input: RunProtocolInput,
        cancel: &CancellationToken,
    ) -> Result<ProtocolSummary, RunProtocolError> {
        self.execute_with_progress(input, &NoProgress, cancel).await
    }

    /// Execute the use case with progress callbacks
    ///
    /// Cancellation is not an error: the summary is returned with
    /// `cancelled` set, after in-flight report routing has settled.
    pub async fn execute_with_progress(
        &self,
        input: RunProtocolInput,
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<ProtocolSummary, RunProtocolError> {
        let params = self.round.params().clone();
        let mut summary = ProtocolSummary::default();
        let mut routing: JoinSet<Vec<ReportDecision>> = JoinSet::new();
        let mut seq_nr = self.round.chain().next_seq_nr();
        let mut round = 0u64;

        info!(
            start = %seq_nr,
            max_rounds = ?input.max_rounds,
            "Starting protocol run"
        );

        let result = 'run: loop {
            if input
                .max_rounds
                .is_some_and(|max| summary.committed.len() as u64 >= max)
            {
                break 'run Ok(());
            }

            let mut attempt = 0u32;
            loop {
                if cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'run Ok(());
                }

                attempt += 1;
                round += 1;
                summary.attempts += 1;
                let round_input = RoundInput::new(seq_nr)
                    .with_attempt(attempt)
                    .with_legacy(params.epoch, round);

                match self
                    .round
                    .execute_with_progress(round_input, progress, cancel)
                    .await
                {
                    Ok(output) => {
                        summary.committed.push(seq_nr);
                        self.spawn_routing(&mut routing, seq_nr, output.reports, cancel);
                        break;
                    }
                    Err(RoundError::Skipped {
                        reason: SkipReason::Cancelled,
                        ..
                    }) => {
                        summary.cancelled = true;
                        break 'run Ok(());
                    }
                    Err(RoundError::Skipped { reason, .. }) => {
                        summary.skipped += 1;
                        if !params.allows_retry(attempt) {
                            break 'run Err(RunProtocolError::AttemptsExhausted {
                                seq_nr,
                                attempts: attempt,
                                last: reason,
                            });
                        }
                        if !pause(params.retry_delay, cancel).await {
                            summary.cancelled = true;
                            break 'run Ok(());
                        }
                    }
                    Err(RoundError::Commit(ChainError::AlreadyCommitted(_))) => {
                        // Someone else committed this SeqNr; follow the chain.
                        warn!(%seq_nr, "Outcome already committed by another writer");
                        if let Some(outcome) = self.round.chain().get(seq_nr) {
                            summary.committed.push(seq_nr);
                            match self.round.adapter().reports(seq_nr, &outcome) {
                                Ok(reports) => {
                                    self.spawn_routing(&mut routing, seq_nr, reports, cancel)
                                }
                                Err(e) => {
                                    warn!(%seq_nr, "No reports for committed outcome: {}", e)
                                }
                            }
                        }
                        break;
                    }
                    Err(e) => break 'run Err(e.into()),
                }
            }

            seq_nr = seq_nr.next();
            collect_finished(&mut routing, &mut summary, progress);

            if !pause(params.round_interval, cancel).await {
                summary.cancelled = true;
                break 'run Ok(());
            }
        };

        while let Some(joined) = routing.join_next().await {
            record(joined, &mut summary, progress);
        }
        summary.decisions.sort_by_key(|d| (d.seq_nr, d.index));

        info!(
            committed = summary.committed.len(),
            attempts = summary.attempts,
            skipped = summary.skipped,
            transmitted = summary.transmitted(),
            cancelled = summary.cancelled,
            "Protocol run finished"
        );

        result.map(|()| summary)
    }
}

impl<RI: ReportInfo> RunProtocolUseCase<RI> {
    /// Route the reports of one committed outcome in the background.
    fn spawn_routing(
        &self,
        routing: &mut JoinSet<Vec<ReportDecision>>,
        seq_nr: SeqNr,
        reports: Vec<ReportWithInfo<RI>>,
        cancel: &CancellationToken,
    ) {
        if reports.is_empty() {
            return;
        }
        let pipeline = Arc::clone(&self.pipeline);
        let cancel = cancel.clone();
        routing.spawn(async move {
            pipeline
                .route_all(seq_nr, &reports, &NoProgress, &cancel)
                .await
        });
    }
}

/// Sleep for `duration` unless cancelled first. Returns false on cancel.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

fn collect_finished(
    routing: &mut JoinSet<Vec<ReportDecision>>,
    summary: &mut ProtocolSummary,
    progress: &dyn RoundProgressNotifier,
) {
    while let Some(joined) = routing.try_join_next() {
        record(joined, summary, progress);
    }
}

fn record(
    joined: Result<Vec<ReportDecision>, tokio::task::JoinError>,
    summary: &mut ProtocolSummary,
    progress: &dyn RoundProgressNotifier,
) {
    match joined {
        Ok(decisions) => {
            for decision in &decisions {
                progress.on_report_decision(decision);
            }
            summary.decisions.extend(decisions);
        }
        Err(e) => warn!("Report routing task failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoundParams;
    use crate::plugin::PluginAdapter;
    use crate::test_support::{
        MockAttestor, MockPlugin, RecordingProgress, RecordingTransmitter, ScriptedNetwork,
        test_config, test_info,
    };
    use reporting_domain::{Outcome, OutcomeChain};

    fn use_case(
        network: ScriptedNetwork,
        params: RoundParams,
    ) -> (
        Arc<OutcomeChain>,
        Arc<RecordingTransmitter>,
        RunProtocolUseCase<String>,
    ) {
        let adapter = Arc::new(PluginAdapter::new(
            Arc::new(MockPlugin::new()),
            test_info(),
            test_config(4, 1),
        ));
        let chain = Arc::new(OutcomeChain::new());
        let transmitter = Arc::new(RecordingTransmitter::new());
        let round = RunRoundUseCase::new(adapter.clone(), Arc::new(network), chain.clone(), params);
        let pipeline = Arc::new(ReportPipeline::new(
            adapter,
            Arc::new(MockAttestor::signed_by(&[0, 1, 2])),
            transmitter.clone(),
        ));
        (chain, transmitter, RunProtocolUseCase::new(round, pipeline))
    }

    fn healthy() -> ScriptedNetwork {
        ScriptedNetwork::new()
            .arrival(0, 8, Duration::from_millis(10))
            .arrival(1, 8, Duration::from_millis(20))
            .arrival(2, 8, Duration::from_millis(30))
    }

    #[tokio::test(start_paused = true)]
    async fn test_commits_requested_rounds_in_order() {
        let (chain, transmitter, use_case) = use_case(healthy(), RoundParams::default());
        let summary = use_case
            .execute(RunProtocolInput::rounds(3), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            summary.committed,
            vec![SeqNr::new(1), SeqNr::new(2), SeqNr::new(3)]
        );
        assert_eq!(chain.head(), Some(SeqNr::new(3)));
        assert_eq!(summary.attempts, 3);
        assert_eq!(summary.transmitted(), 3);
        assert_eq!(transmitter.transmitted().len(), 3);
        assert!(!summary.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_skips_exhaust_attempt_budget() {
        let network = ScriptedNetwork::new()
            .arrival(0, 8, Duration::from_millis(10))
            .silent();
        let params = RoundParams::default()
            .with_round_deadline(Duration::from_millis(200))
            .with_max_attempts_per_seq_nr(Some(3));
        let (chain, _, use_case) = use_case(network, params);

        let progress = RecordingProgress::new();
        let err = use_case
            .execute_with_progress(
                RunProtocolInput::rounds(1),
                &progress,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            RunProtocolError::AttemptsExhausted {
                seq_nr, attempts, ..
            } => {
                assert_eq!(seq_nr, SeqNr::FIRST);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(chain.is_empty());
        // Every attempt retried the same SeqNr
        assert_eq!(
            progress.skipped(),
            vec![(SeqNr::FIRST, 1), (SeqNr::FIRST, 2), (SeqNr::FIRST, 3)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_partial_summary() {
        let params = RoundParams::default().with_round_interval(Duration::from_secs(1));
        let (_, _, use_case) = use_case(healthy(), params);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let summary = use_case
            .execute(RunProtocolInput::unbounded(), &cancel)
            .await
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.committed.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resumes_after_chain_head() {
        let (chain, _, use_case) = use_case(healthy(), RoundParams::default());
        let cancel = CancellationToken::new();

        use_case
            .execute(RunProtocolInput::rounds(2), &cancel)
            .await
            .unwrap();
        let summary = use_case
            .execute(RunProtocolInput::rounds(1), &cancel)
            .await
            .unwrap();

        assert_eq!(summary.committed, vec![SeqNr::new(3)]);
        assert_eq!(chain.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_committed_elsewhere_is_followed_and_reported() {
        let (chain, transmitter, use_case) = use_case(healthy(), RoundParams::default());

        // Another writer commits SeqNr 1 while the first round is gathering
        let writer = Arc::clone(&chain);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            writer
                .commit(SeqNr::FIRST, Outcome::from(vec![0x42]))
                .unwrap();
        });

        let summary = use_case
            .execute(RunProtocolInput::rounds(2), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.committed, vec![SeqNr::new(1), SeqNr::new(2)]);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.get(SeqNr::FIRST), Some(Outcome::from(vec![0x42])));
        assert_eq!(summary.transmitted(), 2);
        let seq_nrs: Vec<_> = transmitter.transmitted().iter().map(|(s, _)| *s).collect();
        assert!(seq_nrs.contains(&SeqNr::FIRST));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_params_retry_same_seq_nr_until_it_commits() {
        // Only two answers per attempt: quorum of three is never met
        let network = ScriptedNetwork::new()
            .arrival(0, 8, Duration::from_millis(10))
            .arrival(1, 8, Duration::from_millis(20))
            .silent();
        let params = RoundParams::default().with_round_deadline(Duration::from_millis(100));
        let (chain, _, use_case) = use_case(network, params);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let summary = use_case
            .execute(RunProtocolInput::rounds(1), &cancel)
            .await
            .unwrap();
        assert!(summary.cancelled);
        assert!(summary.skipped > 5);
        assert!(chain.is_empty());
    }
}
