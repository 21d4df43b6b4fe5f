//! Route Report use case
//!
//! Carries one report from a committed outcome to the downstream consumer:
//!
//! 1. attest: at least F+1 distinct oracles co-sign the report
//! 2. should_accept_attested_report
//! 3. should_transmit_accepted_report, immediately before
//! 4. transmit
//!
//! Every report is routed on its own. Nothing here depends on the round that
//! produced the report or on sibling reports, so a report can be routed long
//! after its round, or after a restart, with the same result.

use crate::plugin::{PluginAdapter, StageError};
use crate::ports::attestor::{Attestation, ReportAttestor};
use crate::ports::progress::RoundProgressNotifier;
use crate::ports::transmitter::ReportTransmitter;
use futures::future::join_all;
use reporting_domain::{Quorum, ReportDecision, ReportInfo, ReportVerdict, ReportWithInfo, SeqNr};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ReportPipeline<RI: ReportInfo> {
    adapter: Arc<PluginAdapter<RI>>,
    attestor: Arc<dyn ReportAttestor<RI>>,
    transmitter: Arc<dyn ReportTransmitter<RI>>,
}

impl<RI: ReportInfo> ReportPipeline<RI> {
    pub fn new(
        adapter: Arc<PluginAdapter<RI>>,
        attestor: Arc<dyn ReportAttestor<RI>>,
        transmitter: Arc<dyn ReportTransmitter<RI>>,
    ) -> Self {
        Self {
            adapter,
            attestor,
            transmitter,
        }
    }

    /// Distinct signers needed before a report counts as attested.
    pub fn required_signers(&self) -> usize {
        self.adapter.config().quorum(Quorum::FPlusOne)
    }

    /// Route one report end to end.
    pub async fn route(
        &self,
        seq_nr: SeqNr,
        index: usize,
        report: &ReportWithInfo<RI>,
        cancel: &CancellationToken,
    ) -> ReportDecision {
        let verdict = self.verdict(seq_nr, report, cancel).await;
        match &verdict {
            ReportVerdict::Transmitted => info!(%seq_nr, index, "Report transmitted"),
            ReportVerdict::Rejected | ReportVerdict::NotTransmitted => {
                debug!(%seq_nr, index, "Report {}", verdict)
            }
            other => warn!(%seq_nr, index, "Report dropped: {}", other),
        }
        ReportDecision::new(seq_nr, index, verdict)
    }

    /// Route every report of one outcome concurrently.
    ///
    /// Decisions are returned in report order, whatever order they finish in.
    pub async fn route_all(
        &self,
        seq_nr: SeqNr,
        reports: &[ReportWithInfo<RI>],
        progress: &dyn RoundProgressNotifier,
        cancel: &CancellationToken,
    ) -> Vec<ReportDecision> {
        let decisions = join_all(
            reports
                .iter()
                .enumerate()
                .map(|(index, report)| self.route(seq_nr, index, report, cancel)),
        )
        .await;

        for decision in &decisions {
            progress.on_report_decision(decision);
        }
        decisions
    }

    /// Ask the plugin whether an attested report should be accepted.
    pub async fn accept(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        cancel: &CancellationToken,
    ) -> Result<bool, StageError> {
        self.adapter
            .should_accept_attested_report(seq_nr, report, cancel)
            .await
    }

    /// Final check and hand-off of an accepted report.
    pub async fn transmit(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        attestation: &Attestation,
        cancel: &CancellationToken,
    ) -> ReportVerdict {
        match self
            .adapter
            .should_transmit_accepted_report(seq_nr, report, cancel)
            .await
        {
            Ok(true) => {}
            Ok(false) => return ReportVerdict::NotTransmitted,
            Err(e) => {
                return ReportVerdict::TransmitCheckFailed {
                    reason: e.to_string(),
                };
            }
        }

        let digest = self.adapter.config().config_digest;
        match self
            .transmitter
            .transmit(digest, seq_nr, report, attestation)
            .await
        {
            Ok(()) => ReportVerdict::Transmitted,
            Err(e) => ReportVerdict::TransmitFailed {
                reason: e.to_string(),
            },
        }
    }

    async fn verdict(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        cancel: &CancellationToken,
    ) -> ReportVerdict {
        let attestation = match self.attestor.attest(seq_nr, report).await {
            Ok(attestation) => attestation,
            Err(e) => {
                return ReportVerdict::AttestationFailed {
                    reason: e.to_string(),
                };
            }
        };

        let required = self.required_signers();
        let signers = attestation.distinct_signers(self.adapter.config().n);
        if signers < required {
            return ReportVerdict::NotAttested { signers, required };
        }

        match self.accept(seq_nr, report, cancel).await {
            Ok(true) => {}
            Ok(false) => return ReportVerdict::Rejected,
            Err(e) => {
                return ReportVerdict::AcceptFailed {
                    reason: e.to_string(),
                };
            }
        }

        self.transmit(seq_nr, report, &attestation, cancel).await
    }
}
