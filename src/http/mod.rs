//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, CORS, timeout, body limit)
//!     → request.rs (query parameters, body decoding, client IP)
//!     → [rewrite layer: legacy GET → JSON POST]
//!     → [upstream forwarder: retry, fallback]
//!     → response.rs (relay verbatim, strip hop-by-hop headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{InboundRequest, Payload, QueryParams, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
