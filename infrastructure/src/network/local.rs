//! In-process oracle network

use reporting_application::{LifecycleError, OracleNetwork, PluginAdapter, PluginLifecycleManager};
use reporting_domain::{
    AttributedObservation, Observation, OracleId, OutcomeContext, Query, ReportInfo,
    ReportingPluginConfig,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a simulated oracle answers observation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OracleBehavior {
    /// Observes through its own plugin instance
    #[default]
    Honest,
    /// Never answers
    Silent,
    /// Answers with one byte more than the declared observation limit
    Oversized,
    /// Answers with bytes its plugin will not validate
    Garbage,
}

struct LocalOracle<RI: ReportInfo> {
    id: OracleId,
    adapter: Arc<PluginAdapter<RI>>,
    behavior: OracleBehavior,
    latency: Duration,
}

/// Every oracle of one protocol instance, running in this process.
pub struct LocalOracleNetwork<RI: ReportInfo> {
    oracles: Vec<LocalOracle<RI>>,
}

impl<RI: ReportInfo> LocalOracleNetwork<RI> {
    /// Create one plugin instance per oracle `0..config.n`.
    ///
    /// Oracles missing from `behaviors` are honest. Oracle `i` answers after
    /// `max_latency * (i + 1) / n`.
    pub fn build(
        manager: &PluginLifecycleManager<RI>,
        config: &ReportingPluginConfig,
        behaviors: &HashMap<OracleId, OracleBehavior>,
        max_latency: Duration,
    ) -> Result<Self, LifecycleError> {
        let n = config.n;
        let mut oracles = Vec::with_capacity(n);

        for id in OracleId::all(n) {
            let adapter = manager.instantiate(config.clone().with_oracle_id(id))?;
            let behavior = behaviors.get(&id).copied().unwrap_or_default();
            let latency = max_latency.mul_f64((id.index() + 1) as f64 / n as f64);
            debug!(oracle = %id, ?behavior, ?latency, "Local oracle ready");
            oracles.push(LocalOracle {
                id,
                adapter,
                behavior,
                latency,
            });
        }

        Ok(Self { oracles })
    }

    pub fn behavior(&self, id: OracleId) -> Option<OracleBehavior> {
        self.oracles
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.behavior)
    }

    /// Oracles that are expected to co-sign reports.
    pub fn honest_oracles(&self) -> Vec<OracleId> {
        self.oracles
            .iter()
            .filter(|o| o.behavior == OracleBehavior::Honest)
            .map(|o| o.id)
            .collect()
    }

    /// Close every oracle's plugin instance.
    pub async fn close(&self) {
        for oracle in &self.oracles {
            if let Err(e) = oracle.adapter.close().await {
                warn!(oracle = %oracle.id, "Closing plugin failed: {}", e);
            }
        }
    }
}

impl<RI: ReportInfo> OracleNetwork for LocalOracleNetwork<RI> {
    fn n(&self) -> usize {
        self.oracles.len()
    }

    fn request_observations(
        &self,
        ctx: &OutcomeContext,
        query: &Query,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<AttributedObservation> {
        let (tx, rx) = mpsc::channel(self.oracles.len().max(1));

        for oracle in &self.oracles {
            let tx = tx.clone();
            let cancel = cancel.clone();
            let ctx = ctx.clone();
            let query = query.clone();
            let id = oracle.id;
            let adapter = Arc::clone(&oracle.adapter);
            let behavior = oracle.behavior;
            let latency = oracle.latency;

            tokio::spawn(async move {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(latency) => {}
                }

                let observation: Observation = match behavior {
                    OracleBehavior::Silent => {
                        // Keep the channel open like a peer that never answers.
                        cancel.cancelled().await;
                        return;
                    }
                    OracleBehavior::Oversized => {
                        vec![0xff; adapter.limits().max_observation_length + 1].into()
                    }
                    OracleBehavior::Garbage => vec![0x00].into(),
                    OracleBehavior::Honest => {
                        match adapter.observation(&ctx, &query, &cancel).await {
                            Ok(observation) => observation,
                            Err(e) => {
                                debug!(oracle = %id, seq_nr = %ctx.seq_nr, "No observation: {}", e);
                                return;
                            }
                        }
                    }
                };

                let _ = tx.send(AttributedObservation::new(id, observation)).await;
            });
        }

        rx
    }
}
