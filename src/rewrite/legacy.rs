//! Legacy `GET /?to=…&message=…` sends.
//!
//! Older clients can only issue a GET with the phone number and message in
//! the query string. The backend expects a JSON `POST`, so matching requests
//! are rewritten to one of two send endpoints:
//!
//! ```text
//! GET ?to=T&message=M&session=S   → POST session_send {sessionName, phoneNumber, message}
//! GET ?to=T&message=M[&immediate] → POST pool_send    {phoneNumber, message, immediate}
//! anything else                   → forwarded unchanged
//! ```

use axum::http::Method;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::EndpointConfig;
use crate::http::request::QueryParams;
use crate::upstream::{BackendOrigin, OutboundRequest};

/// Values of `immediate` (case-insensitive) that mean true.
const TRUTHY: &[&str] = &["1", "true", "yes", "y"];

/// Which backend send endpoint a legacy request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRoute {
    /// Send from a named session.
    Session,
    /// Send through the session pool (rotation).
    Pool,
}

impl SendRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendRoute::Session => "session",
            SendRoute::Pool => "pool",
        }
    }
}

/// The override produced for a legacy GET.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacySend {
    pub route: SendRoute,
    /// Endpoint path relative to the backend origin.
    pub path: String,
    pub body: Value,
    /// Delivery mode for pool sends.
    pub immediate: Option<bool>,
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("cannot build target for '{path}': {source}")]
    Target {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

/// Permissive boolean: absent → `default`; otherwise true only for
/// `1`, `true`, `yes`, `y` (trimmed, any case).
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(raw) => {
            let normalized = raw.trim().to_lowercase();
            TRUTHY.contains(&normalized.as_str())
        }
    }
}

/// Decide whether `method` + `query` is a legacy send. `None` means the
/// request passes through unchanged.
pub fn legacy_send(
    method: &Method,
    query: &QueryParams,
    endpoints: &EndpointConfig,
) -> Option<LegacySend> {
    if method != Method::GET {
        return None;
    }
    let phone = query.non_empty("to")?;
    let message = query.non_empty("message")?;

    let session = query
        .non_empty("session")
        .or_else(|| query.non_empty("sessionName"));

    let plan = match session {
        Some(session) => LegacySend {
            route: SendRoute::Session,
            path: endpoints.session_send.clone(),
            body: json!({
                "sessionName": session,
                "phoneNumber": phone,
                "message": message,
            }),
            immediate: None,
        },
        None => {
            let immediate = parse_flag(query.get("immediate"), true);
            LegacySend {
                route: SendRoute::Pool,
                path: endpoints.pool_send.clone(),
                body: json!({
                    "phoneNumber": phone,
                    "message": message,
                    "immediate": immediate,
                }),
                immediate: Some(immediate),
            }
        }
    };
    Some(plan)
}

impl LegacySend {
    /// Apply the override to the pass-through request `base`.
    pub fn apply(
        &self,
        base: &OutboundRequest,
        origin: &BackendOrigin,
    ) -> Result<OutboundRequest, RewriteError> {
        let target = origin.join(&self.path).map_err(|source| RewriteError::Target {
            path: self.path.clone(),
            source,
        })?;
        Ok(base.json_post(target, self.body.clone()))
    }
}
