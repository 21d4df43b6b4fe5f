//! Hand-written port doubles shared by the use case tests.

use crate::ports::attestor::{Attestation, AttestationError, ReportAttestor};
use crate::ports::oracle_network::OracleNetwork;
use crate::ports::progress::RoundProgressNotifier;
use crate::ports::reporting_plugin::{PluginError, ReportingPlugin, ReportingPluginFactory};
use crate::ports::transmitter::{ReportTransmitter, TransmitError};
use async_trait::async_trait;
use reporting_domain::{
    AttributedObservation, ConfigDigest, Observation, OracleId, Outcome, OutcomeContext, Query,
    Quorum, ReportWithInfo, ReportingPluginConfig, ReportingPluginInfo, ReportingPluginLimits,
    SeqNr, SkipReason,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub fn test_config(n: usize, f: usize) -> ReportingPluginConfig {
    let budget = Duration::from_millis(500);
    ReportingPluginConfig::new(ConfigDigest::default(), OracleId::new(0), n, f)
        .with_stage_budgets(budget, budget, budget, budget)
}

pub fn test_info() -> ReportingPluginInfo {
    ReportingPluginInfo::new(
        "mock",
        ReportingPluginLimits {
            max_query_length: 64,
            max_observation_length: 32,
            max_outcome_length: 64,
            max_report_length: 64,
            max_report_count: 4,
        },
    )
}

pub fn report(bytes: &'static [u8]) -> ReportWithInfo<String> {
    ReportWithInfo::new(bytes, "test".to_string())
}

// ==================== Plugin ====================

pub struct MockPlugin {
    query_delay: Duration,
    fail_query: bool,
    quorum: Option<Quorum>,
    rejected_observers: Vec<OracleId>,
    fail_outcome: bool,
    outcome_len: Option<usize>,
    report_sizes: Vec<usize>,
    rejected_reports: Vec<Vec<u8>>,
    transmit: bool,
    calls: Mutex<HashMap<&'static str, usize>>,
    contexts: Mutex<Vec<OutcomeContext>>,
    observers: Mutex<Vec<Vec<usize>>>,
    closed: AtomicBool,
    close_count: Arc<AtomicUsize>,
}

impl MockPlugin {
    pub fn new() -> Self {
        Self {
            query_delay: Duration::ZERO,
            fail_query: false,
            quorum: Some(Quorum::TwoFPlusOne),
            rejected_observers: Vec::new(),
            fail_outcome: false,
            outcome_len: None,
            report_sizes: vec![4],
            rejected_reports: Vec::new(),
            transmit: true,
            calls: Mutex::new(HashMap::new()),
            contexts: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    pub fn failing_query(mut self) -> Self {
        self.fail_query = true;
        self
    }

    pub fn with_quorum(mut self, quorum: Quorum) -> Self {
        self.quorum = Some(quorum);
        self
    }

    pub fn failing_quorum(mut self) -> Self {
        self.quorum = None;
        self
    }

    pub fn rejecting(mut self, observer: OracleId) -> Self {
        self.rejected_observers.push(observer);
        self
    }

    pub fn failing_outcome(mut self) -> Self {
        self.fail_outcome = true;
        self
    }

    pub fn with_outcome_len(mut self, len: usize) -> Self {
        self.outcome_len = Some(len);
        self
    }

    pub fn with_report_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.report_sizes = sizes;
        self
    }

    pub fn rejecting_reports(mut self, bytes: &[u8]) -> Self {
        self.rejected_reports.push(bytes.to_vec());
        self
    }

    pub fn declining_transmission(mut self) -> Self {
        self.transmit = false;
        self
    }

    fn with_close_count(mut self, count: Arc<AtomicUsize>) -> Self {
        self.close_count = count;
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Observer indices passed to each `outcome` call, in the order given.
    pub fn outcome_observers(&self) -> Vec<Vec<usize>> {
        self.observers.lock().unwrap().clone()
    }

    pub fn outcome_contexts(&self) -> Vec<OutcomeContext> {
        self.contexts.lock().unwrap().clone()
    }

    fn count(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_insert(0) += 1;
    }
}

#[async_trait]
impl ReportingPlugin<String> for MockPlugin {
    async fn query(
        &self,
        _cancel: &CancellationToken,
        ctx: &OutcomeContext,
    ) -> Result<Query, PluginError> {
        self.count("query");
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        if self.fail_query {
            return Err(PluginError::Unavailable("query source down".to_string()));
        }
        Ok(Query::from(ctx.seq_nr.get().to_be_bytes().to_vec()))
    }

    async fn observation(
        &self,
        _cancel: &CancellationToken,
        _ctx: &OutcomeContext,
        _query: &Query,
    ) -> Result<Observation, PluginError> {
        self.count("observation");
        Ok(Observation::from(vec![1u8; 8]))
    }

    fn validate_observation(
        &self,
        _ctx: &OutcomeContext,
        _query: &Query,
        ao: &AttributedObservation,
    ) -> Result<(), PluginError> {
        self.count("validate_observation");
        if self.rejected_observers.contains(&ao.observer) {
            return Err(PluginError::Invalid(format!("{} is lying", ao.observer)));
        }
        Ok(())
    }

    fn observation_quorum(
        &self,
        _ctx: &OutcomeContext,
        _query: &Query,
    ) -> Result<Quorum, PluginError> {
        self.count("observation_quorum");
        self.quorum
            .ok_or_else(|| PluginError::Other("no quorum".to_string()))
    }

    fn outcome(
        &self,
        ctx: &OutcomeContext,
        _query: &Query,
        aos: &[AttributedObservation],
    ) -> Result<Outcome, PluginError> {
        self.count("outcome");
        self.contexts.lock().unwrap().push(ctx.clone());
        self.observers
            .lock()
            .unwrap()
            .push(aos.iter().map(|ao| ao.observer.index()).collect());
        if self.fail_outcome {
            return Err(PluginError::Invalid("cannot combine".to_string()));
        }
        if let Some(len) = self.outcome_len {
            return Ok(Outcome::from(vec![7u8; len]));
        }
        let mut bytes = ctx.seq_nr.get().to_be_bytes().to_vec();
        bytes.push(aos.len() as u8);
        Ok(Outcome::from(bytes))
    }

    fn reports(
        &self,
        _seq_nr: SeqNr,
        _outcome: &Outcome,
    ) -> Result<Vec<ReportWithInfo<String>>, PluginError> {
        self.count("reports");
        Ok(self
            .report_sizes
            .iter()
            .enumerate()
            .map(|(i, size)| ReportWithInfo::new(vec![0xab; *size], format!("mock-{i}")))
            .collect())
    }

    async fn should_accept_attested_report(
        &self,
        _cancel: &CancellationToken,
        _seq_nr: SeqNr,
        report: &ReportWithInfo<String>,
    ) -> Result<bool, PluginError> {
        self.count("should_accept");
        Ok(!self
            .rejected_reports
            .iter()
            .any(|bad| bad.as_slice() == report.report.as_bytes()))
    }

    async fn should_transmit_accepted_report(
        &self,
        _cancel: &CancellationToken,
        _seq_nr: SeqNr,
        _report: &ReportWithInfo<String>,
    ) -> Result<bool, PluginError> {
        self.count("should_transmit");
        Ok(self.transmit)
    }

    fn close(&self) -> Result<(), PluginError> {
        self.count("close");
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(PluginError::AlreadyClosed);
        }
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ==================== Factory ====================

pub struct MockFactory {
    limits: ReportingPluginLimits,
    fail: bool,
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            limits: test_info().limits,
            fail: false,
            created: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_limits(mut self, limits: ReportingPluginLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ReportingPluginFactory<String> for MockFactory {
    fn new_reporting_plugin(
        &self,
        _config: &ReportingPluginConfig,
    ) -> Result<(Arc<dyn ReportingPlugin<String>>, ReportingPluginInfo), PluginError> {
        if self.fail {
            return Err(PluginError::Unavailable("no data source".to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        let plugin = MockPlugin::new().with_close_count(Arc::clone(&self.closed));
        Ok((
            Arc::new(plugin),
            ReportingPluginInfo::new("mock", self.limits),
        ))
    }
}

// ==================== Network ====================

/// Delivers a fixed script of observations at fixed offsets from the request.
pub struct ScriptedNetwork {
    arrivals: Vec<(Duration, AttributedObservation)>,
    hold_open: bool,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            arrivals: Vec::new(),
            hold_open: false,
            tokens: Mutex::new(Vec::new()),
        }
    }

    /// Oracle `observer` answers with `len` bytes, `at` after the request.
    pub fn arrival(mut self, observer: u8, len: usize, at: Duration) -> Self {
        self.arrivals.push((
            at,
            AttributedObservation::new(OracleId::new(observer), vec![1u8; len]),
        ));
        self
    }

    /// Keep the channel open after the script ends, as if the remaining
    /// oracles never answer.
    pub fn silent(mut self) -> Self {
        self.hold_open = true;
        self
    }

    pub fn requests(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn was_cancelled(&self) -> bool {
        let tokens = self.tokens.lock().unwrap();
        !tokens.is_empty() && tokens.iter().all(|t| t.is_cancelled())
    }
}

impl OracleNetwork for ScriptedNetwork {
    fn n(&self) -> usize {
        self.arrivals.len()
    }

    fn request_observations(
        &self,
        _ctx: &OutcomeContext,
        _query: &Query,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<AttributedObservation> {
        let (tx, rx) = mpsc::channel(self.arrivals.len().max(1));
        self.tokens.lock().unwrap().push(cancel.clone());
        let arrivals = self.arrivals.clone();
        let hold_open = self.hold_open;

        tokio::spawn(async move {
            let start = Instant::now();
            for (at, ao) in arrivals {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep_until(start + at) => {}
                }
                if tx.send(ao).await.is_err() {
                    return;
                }
            }
            if hold_open {
                cancel.cancelled().await;
            }
        });
        rx
    }
}

// ==================== Attestation & transmission ====================

pub struct MockAttestor {
    signers: Vec<OracleId>,
    fail: bool,
}

impl MockAttestor {
    pub fn signed_by(signers: &[u8]) -> Self {
        Self {
            signers: signers.iter().copied().map(OracleId::new).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            signers: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ReportAttestor<String> for MockAttestor {
    async fn attest(
        &self,
        _seq_nr: SeqNr,
        _report: &ReportWithInfo<String>,
    ) -> Result<Attestation, AttestationError> {
        if self.fail {
            return Err(AttestationError::Timeout);
        }
        Ok(Attestation::new(self.signers.clone()))
    }
}

pub struct RecordingTransmitter {
    transmitted: Mutex<Vec<(SeqNr, Vec<u8>)>>,
    fail_on: Mutex<Vec<Vec<u8>>>,
}

impl RecordingTransmitter {
    pub fn new() -> Self {
        Self {
            transmitted: Mutex::new(Vec::new()),
            fail_on: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, bytes: &[u8]) {
        self.fail_on.lock().unwrap().push(bytes.to_vec());
    }

    pub fn transmitted(&self) -> Vec<(SeqNr, Vec<u8>)> {
        self.transmitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportTransmitter<String> for RecordingTransmitter {
    async fn transmit(
        &self,
        _config_digest: ConfigDigest,
        seq_nr: SeqNr,
        report: &ReportWithInfo<String>,
        _attestation: &Attestation,
    ) -> Result<(), TransmitError> {
        let bytes = report.report.as_bytes().to_vec();
        if self.fail_on.lock().unwrap().contains(&bytes) {
            return Err(TransmitError::Transport("connection reset".to_string()));
        }
        self.transmitted.lock().unwrap().push((seq_nr, bytes));
        Ok(())
    }
}

// ==================== Progress ====================

pub struct RecordingProgress {
    skipped: Mutex<Vec<(SeqNr, u32)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self {
            skipped: Mutex::new(Vec::new()),
        }
    }

    pub fn skipped(&self) -> Vec<(SeqNr, u32)> {
        self.skipped.lock().unwrap().clone()
    }
}

impl RoundProgressNotifier for RecordingProgress {
    fn on_round_start(&self, _seq_nr: SeqNr, _attempt: u32) {}

    fn on_round_skipped(&self, seq_nr: SeqNr, attempt: u32, _reason: &SkipReason) {
        self.skipped.lock().unwrap().push((seq_nr, attempt));
    }

    fn on_outcome_committed(&self, _seq_nr: SeqNr, _outcome: &Outcome, _report_count: usize) {}
}
