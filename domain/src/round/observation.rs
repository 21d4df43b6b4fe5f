//! Observations attributed to the oracle that produced them.

use crate::core::ids::OracleId;
use crate::core::payload::Observation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributedObservation {
    pub observation: Observation,
    pub observer: OracleId,
}

impl AttributedObservation {
    pub fn new(observer: OracleId, observation: impl Into<Observation>) -> Self {
        Self {
            observation: observation.into(),
            observer,
        }
    }
}
