//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Backend origin URL.
pub const BACKEND_URL: &str = "BACKEND_URL";
/// Listen interface.
pub const HOST: &str = "HOST";
/// Listen port.
pub const PORT: &str = "PORT";
/// Log level used when `RUST_LOG` is unset.
pub const LOG_LEVEL: &str = "LOG_LEVEL";
/// Metrics listener address; setting it enables metrics.
pub const METRICS_ADDR: &str = "METRICS_ADDR";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    load_config_with(path, |var| std::env::var(var).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ProxyConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a configuration.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(BACKEND_URL) {
        config.backend.url = url;
    }
    if let Some(host) = lookup(HOST) {
        config.listener.host = host;
    }
    if let Some(port) = lookup(PORT) {
        config.listener.port = port.trim().parse().map_err(|_| ConfigError::Env {
            var: PORT,
            value: port.clone(),
        })?;
    }
    if let Some(level) = lookup(LOG_LEVEL) {
        config.observability.log_level = level;
    }
    if let Some(addr) = lookup(METRICS_ADDR) {
        config.observability.metrics_address = addr;
        config.observability.metrics_enabled = true;
    }
    Ok(())
}
