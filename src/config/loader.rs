//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate. Handles file
//! discovery, environment detection and layering of overrides.

use config::{Config, Environment, File, Map};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::DispatchConfig;

const CONFIG_FILE_STEM: &str = "dispatch-config";
const ENV_PREFIX: &str = "DISPATCH";
const ENV_SEPARATOR: &str = "__";

/// Loaded configuration plus the context it was resolved from
#[derive(Debug)]
pub struct ConfigManager {
    config: DispatchConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Process environment variables still apply as the last layer.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_layered(config_dir, environment, None)
    }

    /// Same as [`load_from_directory_with_env`](Self::load_from_directory_with_env) but
    /// reads overrides from `overrides` instead of the process environment
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Map<String, String>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_layered(config_dir, environment, Some(overrides))
    }

    fn load_layered(
        config_dir: Option<PathBuf>,
        environment: &str,
        env_source: Option<Map<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);
        if !config_directory.is_dir() {
            debug!(
                "Configuration directory {} does not exist, using defaults and environment only",
                config_directory.display()
            );
        }

        let base_file = config_directory.join(format!("{CONFIG_FILE_STEM}.yaml"));
        let env_file = config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.yaml"));

        debug!(
            environment = %environment,
            base_file = %base_file.display(),
            env_file = %env_file.display(),
            "Loading configuration"
        );

        let settings = Config::builder()
            .add_source(Config::try_from(&DispatchConfig::default())?)
            .add_source(File::from(base_file).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env_source),
            )
            .build()?;

        let config: DispatchConfig = settings.try_deserialize()?;
        config.validate()?;

        info!(
            environment = %environment,
            worker_pool_size = config.scheduler.worker_pool_size,
            max_retry_attempts = config.scheduler.max_retry_attempts,
            producers = config.producers.len(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: DispatchConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: Self::default_config_directory(),
        }))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Resolved configuration as JSON, for diagnostics
    pub fn debug_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    /// DISPATCH_ENV || APP_ENV || 'development'
    pub fn detect_environment() -> String {
        env::var("DISPATCH_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("DISPATCH_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let candidate = PathBuf::from(manifest_dir).join("config");
            if candidate.is_dir() {
                return candidate;
            }
        }

        PathBuf::from("config")
    }

    /// Fail early when an explicitly requested directory is missing
    pub fn require_directory(path: &Path) -> ConfigResult<()> {
        if path.is_dir() {
            Ok(())
        } else {
            Err(ConfigurationError::DirectoryNotFound(
                path.display().to_string(),
            ))
        }
    }
}
