//! Hop-by-hop header stripping.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip `Host` from inbound headers (the backend origin supplies its own)
//!
//! # Design Decisions
//! - Matching is case-insensitive
//! - Retained headers keep their order and repeated values

use axum::http::HeaderMap;

/// Connection header (hop-by-hop).
pub const CONNECTION: &str = "connection";
/// Keep-Alive header (hop-by-hop).
pub const KEEP_ALIVE: &str = "keep-alive";
/// Proxy-Authenticate header (hop-by-hop).
pub const PROXY_AUTHENTICATE: &str = "proxy-authenticate";
/// Proxy-Authorization header (hop-by-hop).
pub const PROXY_AUTHORIZATION: &str = "proxy-authorization";
/// TE header (hop-by-hop).
pub const TE: &str = "te";
/// Trailers header (hop-by-hop).
pub const TRAILERS: &str = "trailers";
/// Transfer-Encoding header (hop-by-hop).
pub const TRANSFER_ENCODING: &str = "transfer-encoding";
/// Upgrade header (hop-by-hop).
pub const UPGRADE: &str = "upgrade";
/// Host header, dropped from inbound traffic only.
pub const HOST: &str = "host";

/// Headers that only make sense for a single transport hop.
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    CONNECTION,
    KEEP_ALIVE,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILERS,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Which side of the proxy a header set comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client → proxy headers about to be sent to the backend.
    Inbound,
    /// Backend → proxy headers about to be sent to the client.
    Outbound,
}

/// Check if a header is a hop-by-hop header that shouldn't be forwarded.
pub fn is_hop_by_hop(header_name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(header_name))
}

/// Whether `header_name` is dropped when crossing the proxy in `direction`.
pub fn is_filtered(header_name: &str, direction: Direction) -> bool {
    is_hop_by_hop(header_name)
        || (direction == Direction::Inbound && header_name.eq_ignore_ascii_case(HOST))
}

/// Copy of `headers` without the names filtered for `direction`.
pub fn filter_headers(headers: &HeaderMap, direction: Direction) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if !is_filtered(name.as_str(), direction) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
