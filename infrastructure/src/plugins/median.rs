//! Median price-feed plugin
//!
//! Every oracle observes a price; the outcome is the median of a 2F+1 quorum
//! of observations, so up to F lying oracles cannot move it outside the range
//! reported by honest ones.
//!
//! | Payload     | Layout                                      | Bytes |
//! |-------------|---------------------------------------------|-------|
//! | Query       | empty                                       | 0     |
//! | Observation | price (u64 BE)                              | 8     |
//! | Outcome     | seq_nr (u64 BE), median (u64 BE)            | 16    |
//! | Report      | config digest, seq_nr (u64 BE), median (BE) | 48    |

use async_trait::async_trait;
use reporting_application::{PluginError, ReportingPlugin, ReportingPluginFactory};
use reporting_domain::{
    AttributedObservation, ConfigDigest, Observation, OracleId, Outcome, OutcomeContext, Query,
    Quorum, ReportWithInfo, ReportingPluginConfig, ReportingPluginInfo, ReportingPluginLimits,
    SeqNr,
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

const PLUGIN_NAME: &str = "median-price-feed";
const PRICE_LEN: usize = 8;
const OUTCOME_LEN: usize = 16;
const REPORT_LEN: usize = ConfigDigest::LEN + 16;

/// Source of the price an oracle observes.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn latest_price(&self, cancel: &CancellationToken) -> Result<u64, PluginError>;
}

/// Deterministic feed that wanders within `base ± jitter`.
///
/// Each oracle gets its own salt, so honest oracles disagree slightly like
/// independent data sources would.
pub struct SimulatedPriceFeed {
    base: u64,
    jitter: u64,
    salt: u64,
    ticks: AtomicU64,
}

impl SimulatedPriceFeed {
    pub fn new(base: u64, jitter: u64, oracle: OracleId) -> Self {
        Self {
            base,
            jitter,
            salt: oracle.index() as u64,
            ticks: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl PriceFeed for SimulatedPriceFeed {
    async fn latest_price(&self, cancel: &CancellationToken) -> Result<u64, PluginError> {
        if cancel.is_cancelled() {
            return Err(PluginError::Cancelled);
        }
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        let spread = self.jitter.saturating_mul(2).saturating_add(1);
        let offset = tick
            .wrapping_mul(7919)
            .wrapping_add(self.salt.wrapping_mul(104_729))
            % spread;
        Ok(self.base.saturating_sub(self.jitter).saturating_add(offset))
    }
}

/// Trace metadata carried with every median report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MedianReportInfo {
    pub seq_nr: SeqNr,
    pub median: u64,
}

/// Limits this plugin declares for its payloads.
pub fn median_limits() -> ReportingPluginLimits {
    ReportingPluginLimits {
        max_query_length: 0,
        max_observation_length: PRICE_LEN,
        max_outcome_length: OUTCOME_LEN,
        max_report_length: REPORT_LEN,
        max_report_count: 1,
    }
}

pub struct MedianPlugin {
    config_digest: ConfigDigest,
    feed: Arc<dyn PriceFeed>,
    closed: AtomicBool,
}

impl MedianPlugin {
    pub fn new(config_digest: ConfigDigest, feed: Arc<dyn PriceFeed>) -> Self {
        Self {
            config_digest,
            feed,
            closed: AtomicBool::new(false),
        }
    }

    /// Whether a report belongs to this instance and to `seq_nr`.
    ///
    /// Depends only on the report bytes, so any instance gives the same
    /// answer regardless of what it has seen before.
    fn check_report(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<MedianReportInfo>,
    ) -> Result<bool, PluginError> {
        let (digest, seq, median) = decode_report(report.report.as_bytes())
            .ok_or_else(|| PluginError::Invalid(format!("report of {} bytes", report.report.len())))?;
        Ok(digest == self.config_digest && seq == seq_nr.get() && median > 0)
    }
}

#[async_trait]
impl ReportingPlugin<MedianReportInfo> for MedianPlugin {
    async fn query(
        &self,
        _cancel: &CancellationToken,
        _ctx: &OutcomeContext,
    ) -> Result<Query, PluginError> {
        Ok(Query::empty())
    }

    async fn observation(
        &self,
        cancel: &CancellationToken,
        _ctx: &OutcomeContext,
        _query: &Query,
    ) -> Result<Observation, PluginError> {
        let price = self.feed.latest_price(cancel).await?;
        Ok(Observation::from(price.to_be_bytes().to_vec()))
    }

    fn validate_observation(
        &self,
        _ctx: &OutcomeContext,
        _query: &Query,
        ao: &AttributedObservation,
    ) -> Result<(), PluginError> {
        match decode_u64(ao.observation.as_bytes()) {
            Some(0) => Err(PluginError::Invalid("zero price".to_string())),
            Some(_) => Ok(()),
            None => Err(PluginError::Invalid(format!(
                "price of {} bytes, expected {}",
                ao.observation.len(),
                PRICE_LEN
            ))),
        }
    }

    fn observation_quorum(
        &self,
        _ctx: &OutcomeContext,
        _query: &Query,
    ) -> Result<Quorum, PluginError> {
        Ok(Quorum::TwoFPlusOne)
    }

    fn outcome(
        &self,
        ctx: &OutcomeContext,
        _query: &Query,
        aos: &[AttributedObservation],
    ) -> Result<Outcome, PluginError> {
        let mut prices: Vec<u64> = aos
            .iter()
            .filter_map(|ao| decode_u64(ao.observation.as_bytes()))
            .collect();
        if prices.is_empty() {
            return Err(PluginError::Invalid("no prices to combine".to_string()));
        }
        // sorting makes the result independent of arrival order
        prices.sort_unstable();
        let median = prices[prices.len() / 2];

        let mut bytes = Vec::with_capacity(OUTCOME_LEN);
        bytes.extend_from_slice(&ctx.seq_nr.get().to_be_bytes());
        bytes.extend_from_slice(&median.to_be_bytes());
        Ok(Outcome::from(bytes))
    }

    fn reports(
        &self,
        seq_nr: SeqNr,
        outcome: &Outcome,
    ) -> Result<Vec<ReportWithInfo<MedianReportInfo>>, PluginError> {
        let bytes = outcome.as_bytes();
        if bytes.len() != OUTCOME_LEN {
            return Err(PluginError::Invalid(format!(
                "outcome of {} bytes",
                bytes.len()
            )));
        }
        let (seq, median) = bytes.split_at(8);
        let (seq, median) = (decode_u64(seq), decode_u64(median));
        let (Some(seq), Some(median)) = (seq, median) else {
            return Err(PluginError::Invalid("undecodable outcome".to_string()));
        };
        if seq != seq_nr.get() {
            return Err(PluginError::Invalid(format!(
                "outcome for seq_nr {seq} offered as {seq_nr}"
            )));
        }

        let mut report = Vec::with_capacity(REPORT_LEN);
        report.extend_from_slice(self.config_digest.as_bytes());
        report.extend_from_slice(&seq.to_be_bytes());
        report.extend_from_slice(&median.to_be_bytes());
        Ok(vec![ReportWithInfo::new(
            report,
            MedianReportInfo { seq_nr, median },
        )])
    }

    async fn should_accept_attested_report(
        &self,
        _cancel: &CancellationToken,
        seq_nr: SeqNr,
        report: &ReportWithInfo<MedianReportInfo>,
    ) -> Result<bool, PluginError> {
        self.check_report(seq_nr, report)
    }

    async fn should_transmit_accepted_report(
        &self,
        _cancel: &CancellationToken,
        seq_nr: SeqNr,
        report: &ReportWithInfo<MedianReportInfo>,
    ) -> Result<bool, PluginError> {
        self.check_report(seq_nr, report)
    }

    fn close(&self) -> Result<(), PluginError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(PluginError::AlreadyClosed);
        }
        Ok(())
    }
}

/// Creates [`MedianPlugin`] instances, one feed per oracle.
pub struct MedianPluginFactory {
    base_price: u64,
    jitter: u64,
    feed: Option<Arc<dyn PriceFeed>>,
}

impl MedianPluginFactory {
    /// Factory backed by a [`SimulatedPriceFeed`] per oracle.
    pub fn new(base_price: u64, jitter: u64) -> Self {
        Self {
            base_price,
            jitter,
            feed: None,
        }
    }

    /// Use one shared feed for every instance.
    pub fn with_feed(mut self, feed: Arc<dyn PriceFeed>) -> Self {
        self.feed = Some(feed);
        self
    }
}

impl ReportingPluginFactory<MedianReportInfo> for MedianPluginFactory {
    fn new_reporting_plugin(
        &self,
        config: &ReportingPluginConfig,
    ) -> Result<
        (
            Arc<dyn ReportingPlugin<MedianReportInfo>>,
            ReportingPluginInfo,
        ),
        PluginError,
    > {
        let feed = self.feed.clone().unwrap_or_else(|| {
            Arc::new(SimulatedPriceFeed::new(
                self.base_price,
                self.jitter,
                config.oracle_id,
            ))
        });
        let plugin = MedianPlugin::new(config.config_digest, feed);
        Ok((
            Arc::new(plugin),
            ReportingPluginInfo::new(PLUGIN_NAME, median_limits()),
        ))
    }
}

fn decode_u64(bytes: &[u8]) -> Option<u64> {
    <[u8; 8]>::try_from(bytes).ok().map(u64::from_be_bytes)
}

fn decode_report(bytes: &[u8]) -> Option<(ConfigDigest, u64, u64)> {
    if bytes.len() != REPORT_LEN {
        return None;
    }
    let (digest, rest) = bytes.split_at(ConfigDigest::LEN);
    let digest = ConfigDigest::new(<[u8; 32]>::try_from(digest).ok()?);
    let (seq, median) = rest.split_at(8);
    Some((digest, decode_u64(seq)?, decode_u64(median)?))
}
