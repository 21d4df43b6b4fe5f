//! Report transmission port
//!
//! The downstream consumer that ultimately receives accepted reports.

use super::attestor::Attestation;
use async_trait::async_trait;
use reporting_domain::{ConfigDigest, ReportInfo, ReportWithInfo, SeqNr};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransmitError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rejected by consumer: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait ReportTransmitter<RI: ReportInfo>: Send + Sync {
    async fn transmit(
        &self,
        config_digest: ConfigDigest,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        attestation: &Attestation,
    ) -> Result<(), TransmitError>;
}
