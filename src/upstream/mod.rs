//! Backend forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! OutboundRequest (types.rs)
//!     → forwarder.rs (acquire pool slot, connect/read timeouts, no redirects)
//!     → backend origin (origin.rs)
//!     → BackendResponse, body read in full
//!     → 502/503: wait backoff, dispatch once more
//! ```
//!
//! # Design Decisions
//! - One client and connection pool per process, shared by reference
//! - Pool access is the only synchronization point between requests
//! - Transport failures surface as `ForwardError`, never as a response

pub mod error;
pub mod forwarder;
pub mod origin;
pub mod types;

pub use error::ForwardError;
pub use forwarder::Forwarder;
pub use origin::BackendOrigin;
pub use types::{BackendResponse, OutboundRequest};
