//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the backend origin (absolute http/https URL)
//! - Validate value ranges (timeouts > 0, ports valid, pool bounds > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend.url '{url}' is not a valid URL: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("backend.url '{0}' must use http or https")]
    UnsupportedScheme(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("endpoints.{0} must not be empty")]
    EmptyEndpoint(&'static str),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.backend.url) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::UnsupportedScheme(config.backend.url.clone()));
            }
        }
        Err(e) => errors.push(ValidationError::InvalidBackendUrl {
            url: config.backend.url.clone(),
            reason: e.to_string(),
        }),
    }

    let ranges: [(&'static str, bool); 5] = [
        ("listener.port", config.listener.port == 0),
        ("backend.max_connections", config.backend.max_connections == 0),
        ("timeouts.connect_secs", config.timeouts.connect_secs == 0),
        ("timeouts.read_secs", config.timeouts.read_secs == 0),
        ("timeouts.request_secs", config.timeouts.request_secs == 0),
    ];
    for (field, is_zero) in ranges {
        if is_zero {
            errors.push(ValidationError::Zero(field));
        }
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_body_bytes"));
    }

    let endpoints: [(&'static str, &str); 3] = [
        ("session_send", &config.endpoints.session_send),
        ("pool_send", &config.endpoints.pool_send),
        ("health", &config.endpoints.health),
    ];
    for (name, path) in endpoints {
        if path.trim_matches('/').is_empty() {
            errors.push(ValidationError::EmptyEndpoint(name));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
