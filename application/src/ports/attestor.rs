//! Report attestation port
//!
//! Co-signing of reports by a threshold of oracles happens outside the
//! engine. The engine only checks that enough distinct oracles signed.

use async_trait::async_trait;
use reporting_domain::{OracleId, ReportInfo, ReportWithInfo, SeqNr};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttestationError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Attestation timed out")]
    Timeout,
}

/// Proof that a set of oracles co-signed a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub signers: Vec<OracleId>,
}

impl Attestation {
    pub fn new(signers: Vec<OracleId>) -> Self {
        Self { signers }
    }

    /// Number of distinct signers among oracles `0..n`.
    ///
    /// Duplicate signatures count once; out-of-range signers do not count.
    pub fn distinct_signers(&self, n: usize) -> usize {
        self.signers
            .iter()
            .filter(|signer| signer.index() < n)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[async_trait]
pub trait ReportAttestor<RI: ReportInfo>: Send + Sync {
    /// Collect signatures for `report`.
    async fn attest(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
    ) -> Result<Attestation, AttestationError>;
}
