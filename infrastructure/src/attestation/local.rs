//! Attestation by a fixed set of in-process signers
//!
//! Stands in for the threshold-signing service: every configured signer
//! co-signs every report it is shown.

use async_trait::async_trait;
use reporting_application::{Attestation, AttestationError, ReportAttestor};
use reporting_domain::{OracleId, ReportInfo, ReportWithInfo, SeqNr};
use tracing::debug;

pub struct LocalAttestor {
    signers: Vec<OracleId>,
}

impl LocalAttestor {
    pub fn new(signers: Vec<OracleId>) -> Self {
        Self { signers }
    }

    pub fn signers(&self) -> &[OracleId] {
        &self.signers
    }
}

#[async_trait]
impl<RI: ReportInfo> ReportAttestor<RI> for LocalAttestor {
    async fn attest(
        &self,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
    ) -> Result<Attestation, AttestationError> {
        if report.report.is_empty() {
            return Err(AttestationError::SigningFailed(
                "refusing to sign an empty report".to_string(),
            ));
        }
        debug!(%seq_nr, signers = self.signers.len(), "Report attested");
        Ok(Attestation::new(self.signers.clone()))
    }
}
