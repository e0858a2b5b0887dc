//! Queued-delivery fallback for "no active sessions" failures.
//!
//! When the backend rejects a send because it has no active sessions, an
//! immediate pool send can still be accepted as a queued message. This module
//! decides whether a failed response qualifies and what to re-send.
//!
//! # Design Decisions
//! - Only responses with status >= 400 and a JSON content type are inspected
//! - Session-targeted sends are never redirected to the pool
//! - Evaluation is pure; dispatching the re-send is the caller's job

use serde_json::{json, Map, Value};
use thiserror::Error;
use url::Url;

use crate::http::request::QueryParams;
use crate::upstream::{BackendResponse, OutboundRequest};

/// Why a failed response could not be inspected.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("backend error body is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
}

/// Outcome of inspecting a backend response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackDecision {
    /// Success status, non-JSON body, or a JSON body that is not an object.
    NotApplicable,
    /// The error does not carry the no-sessions signature.
    OtherError,
    /// The send named a session; it stays failed.
    SessionTargeted { session: String },
    /// Phone number or message could not be recovered.
    MissingFields,
    /// Re-send through the pool as a queued message.
    Requeue(QueuedSend),
}

/// A pool send with queued (non-immediate) delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedSend {
    pub phone: String,
    pub message: String,
}

impl QueuedSend {
    pub fn body(&self) -> Value {
        json!({
            "phoneNumber": self.phone,
            "message": self.message,
            "immediate": false,
        })
    }

    /// The re-send: `POST pool_target` with the original headers and query.
    pub fn request(&self, sent: &OutboundRequest, pool_target: Url) -> OutboundRequest {
        sent.json_post(pool_target, self.body())
    }
}

/// Inspect `response` to the request `sent` for the no-sessions signature.
pub fn evaluate(
    response: &BackendResponse,
    sent: &OutboundRequest,
    signature: &str,
) -> Result<FallbackDecision, FallbackError> {
    if response.status.as_u16() < 400 || !response.is_json() {
        return Ok(FallbackDecision::NotApplicable);
    }

    let payload: Value = serde_json::from_slice(&response.body)?;
    let Some(object) = payload.as_object() else {
        return Ok(FallbackDecision::NotApplicable);
    };

    if !carries_signature(object, signature) {
        return Ok(FallbackDecision::OtherError);
    }

    let json = sent.body.as_json_object();
    let phone = recover(json, &sent.query, &["phoneNumber", "to"], &["phoneNumber", "to"]);
    let message = recover(json, &sent.query, &["message"], &["message"]);
    let session = recover(json, &sent.query, &["sessionName", "session"], &["session", "sessionName"]);

    if let Some(session) = session {
        return Ok(FallbackDecision::SessionTargeted { session });
    }

    match (phone, message) {
        (Some(phone), Some(message)) => Ok(FallbackDecision::Requeue(QueuedSend { phone, message })),
        _ => Ok(FallbackDecision::MissingFields),
    }
}

fn carries_signature(object: &Map<String, Value>, signature: &str) -> bool {
    let text = match object.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return false,
    };
    text.to_lowercase().contains(&signature.to_lowercase())
}

/// First present value: JSON body keys in order, then query keys in order.
fn recover(
    json: Option<&Map<String, Value>>,
    query: &QueryParams,
    json_keys: &[&str],
    query_keys: &[&str],
) -> Option<String> {
    let from_json = json.and_then(|object| {
        json_keys
            .iter()
            .find_map(|key| object.get(*key).and_then(present_text))
    });

    from_json.or_else(|| {
        query_keys
            .iter()
            .find_map(|key| query.non_empty(key).map(str::to_string))
    })
}

fn present_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Payload;
    use crate::upstream::BackendOrigin;
    use axum::body::Bytes;
    use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, Method, StatusCode};

    const SIGNATURE: &str = "no hay sesiones activas";

    fn response(status: u16, content_type: &str, body: &str) -> BackendResponse {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        BackendResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn no_sessions() -> BackendResponse {
        response(400, "application/json", r#"{"success":false,"error":"No hay sesiones activas"}"#)
    }

    fn sent(query: &str, body: Payload) -> OutboundRequest {
        let origin = BackendOrigin::parse("http://backend:3010").unwrap();
        OutboundRequest {
            method: Method::POST,
            target: origin.join("api/messages/send").unwrap(),
            headers: HeaderMap::new(),
            query: QueryParams::parse(Some(query)),
            body,
        }
    }

    #[test]
    fn test_requeues_rewritten_pool_send() {
        let req = sent(
            "to=123&message=hi",
            Payload::Json(json!({"phoneNumber": "123", "message": "hi", "immediate": true})),
        );
        let decision = evaluate(&no_sessions(), &req, SIGNATURE).unwrap();

        let expected = QueuedSend {
            phone: "123".into(),
            message: "hi".into(),
        };
        assert_eq!(decision, FallbackDecision::Requeue(expected.clone()));
        assert_eq!(
            expected.body(),
            json!({"phoneNumber": "123", "message": "hi", "immediate": false})
        );
    }

    #[test]
    fn test_session_name_blocks_fallback() {
        let req = sent(
            "to=123&message=hi&session=S1",
            Payload::Json(json!({"sessionName": "S1", "phoneNumber": "123", "message": "hi"})),
        );
        assert_eq!(
            evaluate(&no_sessions(), &req, SIGNATURE).unwrap(),
            FallbackDecision::SessionTargeted { session: "S1".into() }
        );

        let query_only = sent("to=123&message=hi&sessionName=S2", Payload::Empty);
        assert_eq!(
            evaluate(&no_sessions(), &query_only, SIGNATURE).unwrap(),
            FallbackDecision::SessionTargeted { session: "S2".into() }
        );
    }

    #[test]
    fn test_json_fields_take_priority_over_query() {
        let req = sent(
            "phoneNumber=999&message=from-query",
            Payload::Json(json!({"to": 5215500011122u64, "message": "from-body"})),
        );
        assert_eq!(
            evaluate(&no_sessions(), &req, SIGNATURE).unwrap(),
            FallbackDecision::Requeue(QueuedSend {
                phone: "5215500011122".into(),
                message: "from-body".into(),
            })
        );
    }

    #[test]
    fn test_query_fills_missing_json_fields() {
        let req = sent("to=777&message=q", Payload::Json(json!({"phoneNumber": ""})));
        assert_eq!(
            evaluate(&no_sessions(), &req, SIGNATURE).unwrap(),
            FallbackDecision::Requeue(QueuedSend {
                phone: "777".into(),
                message: "q".into(),
            })
        );
    }

    #[test]
    fn test_missing_message() {
        let req = sent("to=123", Payload::Empty);
        assert_eq!(
            evaluate(&no_sessions(), &req, SIGNATURE).unwrap(),
            FallbackDecision::MissingFields
        );
    }

    #[test]
    fn test_signature_is_case_insensitive_substring() {
        let resp = response(
            503,
            "application/json",
            r#"{"error":"Error: NO HAY SESIONES ACTIVAS disponibles"}"#,
        );
        let req = sent("to=1&message=m", Payload::Empty);
        assert!(matches!(
            evaluate(&resp, &req, SIGNATURE).unwrap(),
            FallbackDecision::Requeue(_)
        ));
    }

    #[test]
    fn test_not_applicable_cases() {
        let req = sent("to=1&message=m", Payload::Empty);
        let ok = response(200, "application/json", r#"{"error":"No hay sesiones activas"}"#);
        let html = response(400, "text/html", "No hay sesiones activas");
        let array = response(400, "application/json", r#"["No hay sesiones activas"]"#);

        for resp in [ok, html, array] {
            assert_eq!(
                evaluate(&resp, &req, SIGNATURE).unwrap(),
                FallbackDecision::NotApplicable
            );
        }
    }

    #[test]
    fn test_other_errors_are_left_alone() {
        let req = sent("to=1&message=m", Payload::Empty);
        let resp = response(400, "application/json", r#"{"error":"Número inválido"}"#);
        assert_eq!(evaluate(&resp, &req, SIGNATURE).unwrap(), FallbackDecision::OtherError);

        let missing = response(500, "application/json", r#"{"message":"boom"}"#);
        assert_eq!(evaluate(&missing, &req, SIGNATURE).unwrap(), FallbackDecision::OtherError);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let req = sent("to=1&message=m", Payload::Empty);
        let resp = response(400, "application/json", "{not json");
        assert!(matches!(
            evaluate(&resp, &req, SIGNATURE),
            Err(FallbackError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_queued_request_keeps_headers_and_query() {
        let mut req = sent("to=1&message=m", Payload::Raw(Bytes::from_static(b"x")));
        req.headers.insert("x-api-key", HeaderValue::from_static("k"));
        let queued = QueuedSend {
            phone: "1".into(),
            message: "m".into(),
        };
        let target = BackendOrigin::parse("http://backend:3010")
            .unwrap()
            .join("api/messages/send")
            .unwrap();

        let resend = queued.request(&req, target);
        assert_eq!(resend.method, Method::POST);
        assert_eq!(resend.target.path(), "/api/messages/send");
        assert_eq!(resend.headers.get("x-api-key").unwrap(), "k");
        assert_eq!(resend.query, req.query);
        assert_eq!(resend.body, Payload::Json(queued.body()));
    }
}
