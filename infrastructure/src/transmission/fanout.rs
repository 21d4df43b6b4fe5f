//! Fan-out transmitter

use async_trait::async_trait;
use futures::future::join_all;
use reporting_application::{Attestation, ReportTransmitter, TransmitError};
use reporting_domain::{ConfigDigest, ReportInfo, ReportWithInfo, SeqNr};
use std::sync::Arc;

/// Hands each report to every inner transmitter concurrently.
///
/// Succeeds only if every inner transmitter succeeds; the first failure is
/// returned.
pub struct FanoutTransmitter<RI: ReportInfo> {
    targets: Vec<Arc<dyn ReportTransmitter<RI>>>,
}

impl<RI: ReportInfo> FanoutTransmitter<RI> {
    pub fn new(targets: Vec<Arc<dyn ReportTransmitter<RI>>>) -> Self {
        Self { targets }
    }
}

#[async_trait]
impl<RI: ReportInfo> ReportTransmitter<RI> for FanoutTransmitter<RI> {
    async fn transmit(
        &self,
        config_digest: ConfigDigest,
        seq_nr: SeqNr,
        report: &ReportWithInfo<RI>,
        attestation: &Attestation,
    ) -> Result<(), TransmitError> {
        join_all(
            self.targets
                .iter()
                .map(|target| target.transmit(config_digest, seq_nr, report, attestation)),
        )
        .await
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmission::InMemoryTransmitter;
    use reporting_domain::OracleId;

    #[tokio::test]
    async fn test_every_target_receives_report() {
        let first = Arc::new(InMemoryTransmitter::<String>::new());
        let second = Arc::new(InMemoryTransmitter::<String>::new());
        let targets: Vec<Arc<dyn ReportTransmitter<String>>> = vec![first.clone(), second.clone()];
        let fanout = FanoutTransmitter::new(targets);

        let report = ReportWithInfo::new(vec![1u8], "x".to_string());
        fanout
            .transmit(
                ConfigDigest::default(),
                SeqNr::FIRST,
                &report,
                &Attestation::new(vec![OracleId::new(0)]),
            )
            .await
            .unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }
}
