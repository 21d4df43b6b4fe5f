//! Plugin lifecycle manager
//!
//! Creates plugin instances through the factory, checks their declared limits
//! against the protocol ceilings, and swaps instances when the configuration
//! digest changes. An instance is never shared between two digests.

use super::adapter::{PluginAdapter, StageError};
use crate::ports::reporting_plugin::{PluginError, ReportingPluginFactory};
use reporting_domain::{DomainError, ProtocolLimits, ReportInfo, ReportingPluginConfig};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Invalid plugin configuration: {0}")]
    Configuration(#[from] DomainError),

    #[error("Plugin creation failed: {0}")]
    Creation(#[source] PluginError),

    #[error("Plugin {name} declares limits above the protocol ceilings: {source}")]
    Limits { name: String, source: DomainError },

    #[error("Closing the previous instance failed: {0}")]
    Close(#[from] StageError),

    #[error("No active plugin instance")]
    NotActive,
}

impl LifecycleError {
    /// Faults that no retry can fix without a new configuration.
    pub fn is_configuration_fault(&self) -> bool {
        matches!(
            self,
            LifecycleError::Configuration(_) | LifecycleError::Limits { .. }
        )
    }
}

pub struct PluginLifecycleManager<RI: ReportInfo> {
    factory: Arc<dyn ReportingPluginFactory<RI>>,
    ceilings: ProtocolLimits,
    active: Mutex<Option<Arc<PluginAdapter<RI>>>>,
}

impl<RI: ReportInfo> PluginLifecycleManager<RI> {
    pub fn new(factory: Arc<dyn ReportingPluginFactory<RI>>, ceilings: ProtocolLimits) -> Self {
        Self {
            factory,
            ceilings,
            active: Mutex::new(None),
        }
    }

    pub fn ceilings(&self) -> &ProtocolLimits {
        &self.ceilings
    }

    /// Create a new instance without registering it as active.
    ///
    /// The configuration is checked before the factory runs; the declared
    /// limits are checked after. An instance whose limits are rejected is
    /// closed before the error is returned.
    pub fn instantiate(
        &self,
        config: ReportingPluginConfig,
    ) -> Result<Arc<PluginAdapter<RI>>, LifecycleError> {
        config.validate(&self.ceilings)?;

        let (plugin, info) = self
            .factory
            .new_reporting_plugin(&config)
            .map_err(LifecycleError::Creation)?;

        if let Err(source) = info.limits.validate_against(&self.ceilings) {
            if let Err(e) = plugin.close() {
                warn!("Failed to close rejected plugin {}: {}", info.name, e);
            }
            return Err(LifecycleError::Limits {
                name: info.name,
                source,
            });
        }

        info!(
            plugin = %info.name,
            digest = %config.config_digest,
            oracle = %config.oracle_id,
            n = config.n,
            f = config.f,
            "Plugin instance created"
        );
        Ok(Arc::new(PluginAdapter::new(plugin, info, config)))
    }

    /// Return the instance for `config`, creating it if needed.
    ///
    /// The same digest reuses the active instance. A different digest closes
    /// the active instance (after its in-flight calls finish) before the new
    /// one is created.
    pub async fn activate(
        &self,
        config: ReportingPluginConfig,
    ) -> Result<Arc<PluginAdapter<RI>>, LifecycleError> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref()
            && current.config().config_digest == config.config_digest
            && !current.is_closed()
        {
            return Ok(Arc::clone(current));
        }

        if let Some(previous) = active.take() {
            info!(
                from = %previous.config().config_digest,
                to = %config.config_digest,
                "Reconfiguring plugin"
            );
            match previous.close().await {
                Ok(()) | Err(StageError::AlreadyClosed) => {}
                Err(e) => warn!("Previous plugin instance closed with error: {}", e),
            }
        }

        let adapter = self.instantiate(config)?;
        *active = Some(Arc::clone(&adapter));
        Ok(adapter)
    }

    pub async fn active(&self) -> Option<Arc<PluginAdapter<RI>>> {
        self.active.lock().await.clone()
    }

    /// Close and forget the active instance.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let previous = self
            .active
            .lock()
            .await
            .take()
            .ok_or(LifecycleError::NotActive)?;
        previous.close().await?;
        info!("Plugin {} shut down", previous.info().name);
        Ok(())
    }
}
