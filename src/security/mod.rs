//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (strip hop-by-hop + Host)
//!     → forwarded to the backend
//!
//! Backend response:
//!     → headers.rs (strip hop-by-hop)
//!     → returned to the client with CORS headers
//! ```
//!
//! # Design Decisions
//! - No authentication or rate limiting: the proxy is transparent
//! - Header filtering never rewrites the values it keeps

pub mod headers;

pub use headers::{filter_headers, is_hop_by_hop, Direction};
