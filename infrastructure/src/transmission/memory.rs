//! In-memory transmitter

use async_trait::async_trait;
use reporting_application::{Attestation, ReportTransmitter, TransmitError};
use reporting_domain::{ConfigDigest, OracleId, Report, ReportInfo, ReportWithInfo, SeqNr};
use std::sync::Mutex;

/// A report as handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmittedReport<RI> {
    pub config_digest: ConfigDigest,
    pub seq_nr: SeqNr,
    pub report: Report,
    pub info: RI,
    pub signers: Vec<OracleId>,
}

/// Collects every transmitted report in order of arrival.
pub struct InMemoryTransmitter<RI> {
    reports: Mutex<Vec<TransmittedReport<RI>>>,
}

impl<RI: ReportInfo> InMemoryTransmitter<RI> {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn reports(&self) -> Vec<TransmittedReport<RI>> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<RI: ReportInfo> Default for InMemoryTransmitter<RI> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<RI: ReportInfo> ReportTransmitter<RI> for InMemoryTransmitter<RI> {
    async fn transmit(
        &self,
        config_digest: ConfigDigest,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        attestation: &Attestation,
    ) -> Result<(), TransmitError> {
        let mut reports = self
            .reports
            .lock()
            .map_err(|_| TransmitError::Transport("report store poisoned".to_string()))?;
        reports.push(TransmittedReport {
            config_digest,
            seq_nr,
            report: report.report.clone(),
            info: report.info.clone(),
            signers: attestation.signers.clone(),
        });
        Ok(())
    }
}
