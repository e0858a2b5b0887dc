//! Request rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → OutboundRequest::pass_through (same method, path, query, body)
//!     → legacy.rs (GET with to + message? → JSON POST to a send endpoint)
//!     → Forwarder
//! ```
//!
//! # Design Decisions
//! - The decision is a pure function of method and query parameters
//! - A failed rewrite is logged and the request passes through unchanged

pub mod legacy;

pub use legacy::{legacy_send, parse_flag, LegacySend, RewriteError, SendRoute};
