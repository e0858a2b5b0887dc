//! Health reporting subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → probe.rs: GET <backend>/health through the shared pool
//!     → HealthReport rendered as plain text
//! ```
//!
//! # Design Decisions
//! - The proxy reports itself healthy whenever it can answer
//! - Backend state is reported, not enforced: no traffic is withheld

pub mod probe;

pub use probe::{probe_backend, BackendProbe, HealthReport};
