//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "oracle-reporting";
const PROJECT_FILES: [&str; 2] = ["reporting.toml", ".reporting.toml"];
const ENV_PREFIX: &str = "ORACLE_REPORTING_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. Environment: `ORACLE_REPORTING_PROTOCOL__N=7` style overrides
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./reporting.toml` or `./.reporting.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/oracle-reporting/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(
            Self::global_config_path().as_deref(),
            Self::project_config_path().as_deref(),
            config_path.map(PathBuf::as_path),
        )
        .extract()
        .map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(path) = global
            && path.exists()
        {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = project {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/oracle-reporting/config.toml if set,
    /// otherwise falls back to ~/.config/oracle-reporting/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Print the config file locations being used (for debugging)
    pub fn print_config_sources() {
        println!("Configuration sources (in priority order):");
        println!("  [     ] Env:     {}*", ENV_PREFIX);

        if let Some(path) = Self::project_config_path() {
            println!("  [FOUND] Project: {}", path.display());
        } else {
            println!("  [     ] Project: ./reporting.toml or ./.reporting.toml");
        }

        if let Some(path) = Self::global_config_path() {
            let marker = if path.exists() { "FOUND" } else { "     " };
            println!("  [{}] Global:  {}", marker, path.display());
        }

        println!("  [     ] Default: built-in defaults");
    }
}
