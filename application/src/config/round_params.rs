//! Round parameters: orchestrator and protocol loop control.
//!
//! [`RoundParams`] groups the knobs that belong to the scheduler driving the
//! rounds rather than to the plugin. The per-stage plugin budgets live in
//! [`ReportingPluginConfig`](reporting_domain::ReportingPluginConfig).

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundParams {
    /// Overall deadline for gathering a quorum of observations.
    pub round_deadline: Duration,
    /// Attempts per sequence number before the protocol loop gives up.
    /// `None` retries forever.
    pub max_attempts_per_seq_nr: Option<u32>,
    /// Pause before retrying a skipped sequence number.
    pub retry_delay: Duration,
    /// Pause between committed rounds.
    pub round_interval: Duration,
    /// Legacy epoch carried opaquely in every context.
    pub epoch: u64,
}

impl Default for RoundParams {
    fn default() -> Self {
        Self {
            round_deadline: Duration::from_secs(2),
            max_attempts_per_seq_nr: None,
            retry_delay: Duration::from_millis(100),
            round_interval: Duration::ZERO,
            epoch: 1,
        }
    }
}

impl RoundParams {
    // ==================== Builder Methods ====================

    pub fn with_round_deadline(mut self, deadline: Duration) -> Self {
        self.round_deadline = deadline;
        self
    }

    pub fn with_max_attempts_per_seq_nr(mut self, max: Option<u32>) -> Self {
        self.max_attempts_per_seq_nr = max;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_round_interval(mut self, interval: Duration) -> Self {
        self.round_interval = interval;
        self
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts_per_seq_nr.is_none_or(|max| attempts < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = RoundParams::default();
        assert_eq!(params.round_deadline, Duration::from_secs(2));
        assert_eq!(params.max_attempts_per_seq_nr, None);
        assert!(params.allows_retry(u32::MAX));
        assert_eq!(params.round_interval, Duration::ZERO);
    }

    #[test]
    fn test_builder() {
        let params = RoundParams::default()
            .with_round_deadline(Duration::from_millis(300))
            .with_max_attempts_per_seq_nr(None)
            .with_epoch(7);

        assert_eq!(params.round_deadline, Duration::from_millis(300));
        assert!(params.max_attempts_per_seq_nr.is_none());
        assert_eq!(params.epoch, 7);
    }

    #[test]
    fn test_allows_retry() {
        let bounded = RoundParams::default().with_max_attempts_per_seq_nr(Some(2));
        assert!(bounded.allows_retry(1));
        assert!(!bounded.allows_retry(2));

        let unbounded = RoundParams::default().with_max_attempts_per_seq_nr(None);
        assert!(unbounded.allows_retry(u32::MAX));
    }
}
