//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend response to the client
//! - Strip hop-by-hop headers from the backend response
//! - Build the structured `{ok:false,error}` body for proxy-side failures
//! - Define the permissive CORS headers added to every response
//!
//! # Design Decisions
//! - The backend body is relayed byte-for-byte; `Content-Length` is dropped
//!   and recomputed by the server for the same bytes
//! - CORS headers are applied by a router layer so error responses get them

use axum::{
    body::Body,
    http::{header::CONTENT_LENGTH, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::security::headers::{filter_headers, Direction};
use crate::upstream::BackendResponse;

/// `Access-Control-Allow-Origin` value.
pub const CORS_ALLOW_ORIGIN: &str = "*";
/// `Access-Control-Allow-Headers` value.
pub const CORS_ALLOW_HEADERS: &str = "*";
/// `Access-Control-Allow-Methods` value: the verbs the proxy accepts.
pub const CORS_ALLOW_METHODS: &str = "GET,POST,PUT,PATCH,DELETE,OPTIONS";

/// Body of a response the proxy produces itself on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

/// `{ "ok": false, "error": <message> }` with `status`.
pub fn error_response(status: StatusCode, error: impl Display) -> Response {
    let body = ErrorBody {
        ok: false,
        error: error.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Convert a backend response into the client response.
pub fn relay(backend: BackendResponse) -> Response {
    let mut headers = filter_headers(&backend.headers, Direction::Outbound);
    headers.remove(CONTENT_LENGTH);

    let mut response = Response::new(Body::from(backend.body));
    *response.status_mut() = backend.status;
    *response.headers_mut() = headers;
    response
}
