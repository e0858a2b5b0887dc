//! Retry logic.
//!
//! # Responsibilities
//! - Classify backend statuses as transient (502, 503)
//! - Hold the single-retry policy: one retry after a fixed backoff
//!
//! # Design Decisions
//! - Only a transient status is retried; transport failures are not
//! - At most one retry per dispatch, so a failing backend sees at most
//!   two calls per inbound request (plus one queued fallback)
//! - Fixed backoff; no jitter is needed for a single retry

use axum::http::StatusCode;
use std::time::Duration;

use crate::config::RetryConfig;

/// Backend statuses treated as transient.
pub fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    )
}

/// Single-retry policy for transient backend errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }

    /// Whether a first attempt that returned `status` gets its one retry.
    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.enabled && is_transient(status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
