//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// The single backend origin and its connection pool.
    pub backend: BackendConfig,

    /// Backend endpoints targeted by the legacy rewrite and health probe.
    pub endpoints: EndpointConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Transient error retry configuration.
    pub retries: RetryConfig,

    /// "No active sessions" fallback configuration.
    pub fallback: FallbackConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// TCP port to bind.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` form suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Backend origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend origin URL (e.g., "http://127.0.0.1:3010").
    pub url: String,

    /// Maximum concurrent in-flight calls to the backend.
    pub max_connections: usize,

    /// Idle connections kept per host for reuse.
    pub pool_max_idle_per_host: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3010".to_string(),
            max_connections: 100,
            pool_max_idle_per_host: 50,
        }
    }
}

/// Relative paths of the backend endpoints the proxy depends on.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Send from one named session.
    pub session_send: String,

    /// Send through the session pool (rotation).
    pub pool_send: String,

    /// Backend health endpoint probed by `GET /health`.
    pub health: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            session_send: "api/session/send-message".to_string(),
            pool_send: "api/messages/send".to_string(),
            health: "health".to_string(),
        }
    }
}

/// Timeout configuration for backend calls and the inbound exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Read timeout for backend responses in seconds.
    pub read_secs: u64,

    /// Upper bound on the whole inbound exchange in seconds.
    pub request_secs: u64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            read_secs: 20,
            request_secs: 90,
        }
    }
}

/// Retry configuration for transient backend errors (502/503).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry once on a transient status.
    pub enabled: bool,

    /// Fixed delay before the retry in milliseconds.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backoff_ms: 500,
        }
    }
}

/// Queued-delivery fallback configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Re-dispatch to the pool endpoint when the backend has no sessions.
    pub enabled: bool,

    /// Case-insensitive substring searched in the backend's `error` field.
    pub error_signature: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error_signature: "no hay sesiones activas".to_string(),
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_legacy_deployment() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:5000");
        assert_eq!(config.timeouts.connect(), Duration::from_secs(5));
        assert_eq!(config.timeouts.read(), Duration::from_secs(20));
        assert_eq!(config.retries.backoff_ms, 500);
        assert_eq!(config.endpoints.pool_send, "api/messages/send");
        assert_eq!(config.endpoints.session_send, "api/session/send-message");
        assert_eq!(config.fallback.error_signature, "no hay sesiones activas");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [backend]
            url = "http://10.0.0.5:3010"

            [timeouts]
            read_secs = 45
            "#,
        )
        .unwrap();

        assert_eq!(config.backend.url, "http://10.0.0.5:3010");
        assert_eq!(config.backend.max_connections, 100);
        assert_eq!(config.timeouts.read_secs, 45);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.listener.port, 5000);
    }
}
