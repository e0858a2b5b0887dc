//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Read the inbound request into an [`InboundRequest`]: flattened query,
//!   headers, and a body tagged as JSON, raw bytes, multipart parts or none
//! - Determine the client address for the request summary
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The body is buffered once; every backend dispatch (retry, fallback)
//!   re-sends the same buffered payload
//! - Duplicate query keys keep the first value

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, FromRequest, Multipart},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, Request, StatusCode},
};
use serde_json::Value;
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use url::form_urlencoded;
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header consulted first for the client address.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Request ID generator backed by UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID assigned to a request, or `unknown`.
pub fn request_id_of(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
pub fn client_ip<B>(request: &Request<B>) -> String {
    let forwarded = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match forwarded {
        Some(ip) => ip.to_string(),
        None => request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "-".to_string()),
    }
}

/// Flat query parameter mapping. The first occurrence of a key wins and
/// first-seen order is kept for forwarding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parse a raw (still encoded) query string.
    pub fn parse(query: Option<&str>) -> Self {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            if !pairs.iter().any(|(k, _)| *k == key) {
                pairs.push((key.into_owned(), value.into_owned()));
            }
        }
        Self(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key` if present and not empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::default();
        for (key, value) in iter {
            let key = key.into();
            if params.get(&key).is_none() {
                params.0.push((key, value.into()));
            }
        }
        params
    }
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    /// Set for file uploads.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A request body, tagged by how it is re-sent to the backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// JSON built by the proxy; serialized on dispatch.
    Json(Value),
    /// An inbound JSON body. `value` is for inspection only; `raw` is what
    /// the backend receives, byte for byte.
    InboundJson { value: Value, raw: Bytes },
    /// Opaque bytes; re-sent verbatim.
    Raw(Bytes),
    /// Form fields and uploaded files; re-encoded on dispatch.
    Multipart(Vec<FormPart>),
    #[default]
    Empty,
}

impl Payload {
    /// Select the payload variant for a buffered, non-multipart body.
    pub fn from_bytes(headers: &HeaderMap, bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Payload::Empty;
        }
        if is_json_content_type(headers) {
            if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
                return Payload::InboundJson { value, raw: bytes };
            }
        }
        Payload::Raw(bytes)
    }

    pub fn as_json_object(&self) -> Option<&serde_json::Map<String, Value>> {
        match self {
            Payload::Json(value) | Payload::InboundJson { value, .. } => value.as_object(),
            _ => None,
        }
    }
}

fn media_type(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = value.split(';').next()?.trim().to_ascii_lowercase();
    Some(essence)
}

/// `application/json` or any `+json` structured syntax.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    media_type(headers)
        .map(|m| m == "application/json" || m.ends_with("+json"))
        .unwrap_or(false)
}

pub fn is_multipart(headers: &HeaderMap) -> bool {
    media_type(headers)
        .map(|m| m == "multipart/form-data")
        .unwrap_or(false)
}

/// Failure to read the inbound request.
#[derive(Debug, Error)]
pub enum InboundError {
    #[error("request body rejected: {reason}")]
    Body { status: StatusCode, reason: String },

    #[error("malformed multipart body: {reason}")]
    Multipart { status: StatusCode, reason: String },
}

impl InboundError {
    pub fn status(&self) -> StatusCode {
        match self {
            InboundError::Body { status, .. } | InboundError::Multipart { status, .. } => *status,
        }
    }
}

/// An inbound request, fully buffered.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: QueryParams,
    pub payload: Payload,
}

impl InboundRequest {
    /// Buffer `request`. Body limits configured on the router apply.
    pub async fn read(request: Request<Body>) -> Result<Self, InboundError> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let query = QueryParams::parse(request.uri().query());
        let headers = request.headers().clone();

        let payload = if is_multipart(&headers) {
            Payload::Multipart(read_form_parts(request).await?)
        } else {
            let bytes = Bytes::from_request(request, &())
                .await
                .map_err(|rejection| InboundError::Body {
                    status: rejection.status(),
                    reason: rejection.body_text(),
                })?;
            Payload::from_bytes(&headers, bytes)
        };

        Ok(Self {
            method,
            path,
            headers,
            query,
            payload,
        })
    }
}

async fn read_form_parts(request: Request<Body>) -> Result<Vec<FormPart>, InboundError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| InboundError::Multipart {
            status: rejection.status(),
            reason: rejection.body_text(),
        })?;

    let mut parts = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(InboundError::Multipart {
                    status: e.status(),
                    reason: e.body_text(),
                })
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| InboundError::Multipart {
            status: e.status(),
            reason: e.body_text(),
        })?;

        parts.push(FormPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(parts)
}
