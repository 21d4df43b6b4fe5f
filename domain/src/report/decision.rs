//! Per-report routing decisions.

use crate::core::ids::SeqNr;
use serde::{Deserialize, Serialize};

/// Where a report ended up after attestation, acceptance and transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ReportVerdict {
    /// Too few distinct oracles co-signed the report.
    NotAttested { signers: usize, required: usize },
    /// The attestation collaborator failed.
    AttestationFailed { reason: String },
    /// The plugin declined the attested report.
    Rejected,
    /// The accept check failed or timed out.
    AcceptFailed { reason: String },
    /// Accepted, but the plugin declined to transmit it.
    NotTransmitted,
    /// The transmit check failed or timed out.
    TransmitCheckFailed { reason: String },
    /// Delivered to the downstream consumer.
    Transmitted,
    /// The consumer or transport failed.
    TransmitFailed { reason: String },
}

impl ReportVerdict {
    pub fn is_transmitted(&self) -> bool {
        matches!(self, ReportVerdict::Transmitted)
    }

    /// Whether the report passed the accept check.
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            ReportVerdict::NotTransmitted
                | ReportVerdict::TransmitCheckFailed { .. }
                | ReportVerdict::Transmitted
                | ReportVerdict::TransmitFailed { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportVerdict::NotAttested { .. } => "not_attested",
            ReportVerdict::AttestationFailed { .. } => "attestation_failed",
            ReportVerdict::Rejected => "rejected",
            ReportVerdict::AcceptFailed { .. } => "accept_failed",
            ReportVerdict::NotTransmitted => "not_transmitted",
            ReportVerdict::TransmitCheckFailed { .. } => "transmit_check_failed",
            ReportVerdict::Transmitted => "transmitted",
            ReportVerdict::TransmitFailed { .. } => "transmit_failed",
        }
    }
}

impl std::fmt::Display for ReportVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportVerdict::NotAttested { signers, required } => {
                write!(f, "not attested ({signers}/{required} signers)")
            }
            ReportVerdict::AttestationFailed { reason }
            | ReportVerdict::AcceptFailed { reason }
            | ReportVerdict::TransmitCheckFailed { reason }
            | ReportVerdict::TransmitFailed { reason } => write!(f, "{}: {}", self.as_str(), reason),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

/// The decision for one report of one sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDecision {
    pub seq_nr: SeqNr,
    /// Position of the report in the list produced for `seq_nr`.
    pub index: usize,
    pub verdict: ReportVerdict,
}

impl ReportDecision {
    pub fn new(seq_nr: SeqNr, index: usize, verdict: ReportVerdict) -> Self {
        Self {
            seq_nr,
            index,
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_verdicts() {
        assert!(ReportVerdict::Transmitted.is_accepted());
        assert!(ReportVerdict::NotTransmitted.is_accepted());
        assert!(!ReportVerdict::Rejected.is_accepted());
        assert!(
            !ReportVerdict::NotAttested {
                signers: 1,
                required: 2
            }
            .is_accepted()
        );
    }

    #[test]
    fn test_display() {
        let verdict = ReportVerdict::AcceptFailed {
            reason: "timeout".to_string(),
        };
        assert_eq!(verdict.to_string(), "accept_failed: timeout");
        assert_eq!(ReportVerdict::Transmitted.to_string(), "transmitted");
    }

    #[test]
    fn test_serialize_tagged() {
        let decision = ReportDecision::new(SeqNr::new(3), 1, ReportVerdict::Rejected);
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["seq_nr"], 3);
        assert_eq!(json["verdict"]["verdict"], "rejected");
    }
}
