//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request parameters:
//!     → sanitize.rs (decode, flatten, truncate)
//!     → logging.rs (structured log events)
//!
//! Request outcomes:
//!     → metrics.rs (counters, histograms)
//!     → Prometheus scrape (optional)
//! ```
//!
//! # Design Decisions
//! - One summary line per request and one per response
//! - Request ID flows through every log event of an exchange
//! - Raw parameter values never reach a log line

pub mod logging;
pub mod metrics;
pub mod sanitize;

pub use sanitize::{sanitize, sanitize_opt, truncate_for_log};
