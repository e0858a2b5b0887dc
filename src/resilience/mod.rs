//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → connect/read timeouts (configured on the shared client)
//!     → retries.rs (502/503 → wait backoff → retry once)
//!     → fallback.rs (400+ JSON "no active sessions" → queued re-dispatch)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - Retry and fallback are bounded: one retry, one fallback dispatch
//! - Fallback evaluation failures never replace the original response

pub mod fallback;
pub mod retries;

pub use fallback::{evaluate, FallbackDecision, FallbackError, QueuedSend};
pub use retries::{is_transient, RetryPolicy};
