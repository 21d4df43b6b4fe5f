//! Reports derived from committed outcomes.

pub mod decision;

pub use decision::{ReportDecision, ReportVerdict};

use crate::core::payload::Report;
use std::fmt::Debug;

/// Opaque trace metadata attached to every report.
///
/// The engine passes it through to attestation and transmission unmodified.
pub trait ReportInfo: Clone + Debug + Send + Sync + 'static {}

impl<T> ReportInfo for T where T: Clone + Debug + Send + Sync + 'static {}

/// A report plus its trace metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWithInfo<RI> {
    pub report: Report,
    pub info: RI,
}

impl<RI> ReportWithInfo<RI> {
    pub fn new(report: impl Into<Report>, info: RI) -> Self {
        Self {
            report: report.into(),
            info,
        }
    }
}
