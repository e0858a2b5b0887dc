//! Backend health probe and the plain-text report served at `GET /health`.
//!
//! # Report Format
//! ```text
//! proxy: ok
//! backend_url: http://127.0.0.1:3010
//! backend_status: 200
//! backend_ct: application/json
//! backend_body: {"status":"ok"}
//! ```
//! When the backend cannot be reached the last three lines are replaced by
//! `backend_error: <reason>`.

use crate::upstream::{Forwarder, OutboundRequest};

/// Longest backend body excerpt included in the report.
pub const MAX_PROBE_BODY_CHARS: usize = 400;

/// Result of probing the backend's own health endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendProbe {
    Responded {
        status: u16,
        content_type: String,
        body: String,
    },
    Failed(String),
}

/// Proxy health plus the backend probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub backend_url: String,
    pub probe: BackendProbe,
}

impl HealthReport {
    pub fn render(&self) -> String {
        let mut lines = vec![
            "proxy: ok".to_string(),
            format!("backend_url: {}", self.backend_url),
        ];
        match &self.probe {
            BackendProbe::Responded {
                status,
                content_type,
                body,
            } => {
                lines.push(format!("backend_status: {status}"));
                lines.push(format!("backend_ct: {content_type}"));
                let body = if body.is_empty() { "-" } else { body };
                lines.push(format!("backend_body: {body}"));
            }
            BackendProbe::Failed(reason) => {
                lines.push(format!("backend_error: {reason}"));
            }
        }
        lines.join("\n")
    }
}

/// Cut `body` to [`MAX_PROBE_BODY_CHARS`] characters, appending `...`.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_PROBE_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// GET `health_path` on the backend through the shared pool.
pub async fn probe_backend(forwarder: &Forwarder, health_path: &str) -> BackendProbe {
    let target = match forwarder.origin().join(health_path) {
        Ok(target) => target,
        Err(e) => return BackendProbe::Failed(e.to_string()),
    };

    match forwarder.dispatch(&OutboundRequest::get(target)).await {
        Ok(response) => BackendProbe::Responded {
            status: response.status.as_u16(),
            content_type: response.content_type().to_string(),
            body: truncate_body(&String::from_utf8_lossy(&response.body)),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Backend health probe failed");
            BackendProbe::Failed(e.to_string())
        }
    }
}
