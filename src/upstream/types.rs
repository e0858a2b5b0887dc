//! Backend request and response values.

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::http::request::{is_json_content_type, InboundRequest, Payload, QueryParams};
use crate::security::headers::{filter_headers, Direction};
use crate::upstream::origin::BackendOrigin;

/// A request about to be dispatched to the backend.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Absolute target URL, without query string.
    pub target: Url,
    /// Inbound headers with hop-by-hop and `Host` removed.
    pub headers: HeaderMap,
    /// Forwarded as the query string on every dispatch.
    pub query: QueryParams,
    pub body: Payload,
}

impl OutboundRequest {
    /// Forward `inbound` unchanged to the same path under `origin`.
    pub fn pass_through(
        inbound: &InboundRequest,
        origin: &BackendOrigin,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            method: inbound.method.clone(),
            target: origin.join(&inbound.path)?,
            headers: filter_headers(&inbound.headers, Direction::Inbound),
            query: inbound.query.clone(),
            body: inbound.payload.clone(),
        })
    }

    /// A JSON `POST` to `target` carrying this request's headers and query.
    /// The body is re-encoded, so the inbound content type is dropped.
    pub fn json_post(&self, target: Url, body: Value) -> Self {
        let mut headers = self.headers.clone();
        headers.remove(CONTENT_TYPE);
        Self {
            method: Method::POST,
            target,
            headers,
            query: self.query.clone(),
            body: Payload::Json(body),
        }
    }

    /// A bare `GET` with no headers, query or body.
    pub fn get(target: Url) -> Self {
        Self {
            method: Method::GET,
            target,
            headers: HeaderMap::new(),
            query: QueryParams::default(),
            body: Payload::Empty,
        }
    }
}

/// A fully read backend response. The body is relayed verbatim.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn is_json(&self) -> bool {
        is_json_content_type(&self.headers)
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
