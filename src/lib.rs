//! Compatibility proxy in front of a messaging backend.
//!
//! Relays every request to one backend origin, rewrites legacy
//! `GET ?to=…&message=…` sends into JSON POSTs, retries transient gateway
//! errors once, and re-queues sends the backend rejects for lack of active
//! sessions.

// Core subsystems
pub mod config;
pub mod http;
pub mod rewrite;
pub mod upstream;

// Cross-cutting concerns
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::{load_config, ConfigError, ProxyConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
