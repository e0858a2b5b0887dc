//! Retry, queued fallback and unreachable-backend behaviour.

use serde_json::{json, Value};
use std::time::Duration;

mod common;

const NO_SESSIONS: &str = r#"{"success":false,"error":"No hay sesiones activas"}"#;

#[tokio::test]
async fn test_retry_once_on_503() {
    let backend = common::start_programmable_backend(|_, index| {
        if index == 0 {
            (503, "text/plain", "Service Unavailable".into())
        } else {
            (200, "application/json", r#"{"ok":true}"#.into())
        }
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(&backend.url())).await;

    let res = common::client()
        .post(proxy.url("/api/messages/send"))
        .json(&json!({"phoneNumber": "1", "message": "m"}))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(backend.call_count(), 2, "Should have attempted exactly twice");

    let calls = backend.calls();
    assert_eq!(calls[0].body, calls[1].body, "Retry must resend the same body");
}

#[tokio::test]
async fn test_second_transient_failure_is_relayed() {
    let backend =
        common::start_programmable_backend(|_, _| (502, "text/plain", "bad gateway".into())).await;
    let proxy = common::start_proxy(common::proxy_config(&backend.url())).await;

    let res = common::client().get(proxy.url("/x")).send().await.unwrap();

    assert_eq!(res.status(), 502);
    assert_eq!(res.text().await.unwrap(), "bad gateway");
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn test_non_transient_errors_are_not_retried() {
    for status in [404u16, 500] {
        let backend =
            common::start_programmable_backend(move |_, _| (status, "text/plain", "no".into()))
                .await;
        let proxy = common::start_proxy(common::proxy_config(&backend.url())).await;

        let res = common::client().get(proxy.url("/x")).send().await.unwrap();
        assert_eq!(res.status().as_u16(), status);
        assert_eq!(backend.call_count(), 1, "status {status} must not be retried");
    }
}

#[tokio::test]
async fn test_retry_disabled() {
    let backend =
        common::start_programmable_backend(|_, _| (503, "text/plain", "down".into())).await;
    let mut config = common::proxy_config(&backend.url());
    config.retries.enabled = false;
    let proxy = common::start_proxy(config).await;

    let res = common::client().get(proxy.url("/x")).send().await.unwrap();
    assert_eq!(res.status(), 503);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_no_sessions_fallback_requeues() {
    let backend = common::start_programmable_backend(|_, index| {
        if index == 0 {
            (400, "application/json", NO_SESSIONS.into())
        } else {
            (200, "application/json", r#"{"success":true,"queued":true}"#.into())
        }
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(&backend.url())).await;

    let res = common::client()
        .get(proxy.url("/?to=123&message=hi"))
        .header("x-api-key", "secret")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "queued": true}));

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].json()["immediate"], json!(true));

    let fallback = &calls[1];
    assert_eq!(fallback.method, "POST");
    assert_eq!(fallback.path, "/api/messages/send");
    assert_eq!(
        fallback.json(),
        json!({"phoneNumber": "123", "message": "hi", "immediate": false})
    );
    assert_eq!(fallback.header("x-api-key"), Some("secret"));
}

#[tokio::test]
async fn test_fallback_response_replaces_original_even_on_error() {
    let backend = common::start_programmable_backend(|_, index| {
        if index == 0 {
            (400, "application/json", NO_SESSIONS.into())
        } else {
            (500, "application/json", r#"{"error":"queue full"}"#.into())
        }
    })
    .await;
    let proxy = common::start_proxy(common::proxy_config(&backend.url())).await;

    let res = common::client()
        .post(proxy.url("/api/messages/send"))
        .json(&json!({"phoneNumber": "123", "message": "hi"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert_eq!(res.text().await.unwrap(), r#"{"error":"queue full"}"#);
    assert_eq!(backend.call_count(), 2, "The fallback dispatch is never retried");
}

#[tokio::test]
async fn test_session_sends_are_not_requeued() {
    let backend =
        common::start_programmable_backend(|_, _| (400, "application/json", NO_SESSIONS.into()))
            .await;
    let proxy = common::start_proxy(common::proxy_config(&backend.url())).await;

    let res = common::client()
        .get(proxy.url("/?to=123&message=hi&session=S1"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    assert_eq!(res.text().await.unwrap(), NO_SESSIONS);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_fallback_disabled() {
    let backend =
        common::start_programmable_backend(|_, _| (400, "application/json", NO_SESSIONS.into()))
            .await;
    let mut config = common::proxy_config(&backend.url());
    config.fallback.enabled = false;
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .get(proxy.url("/?to=123&message=hi"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_unreachable_backend_returns_502_json() {
    let addr = common::closed_port().await;
    let proxy = common::start_proxy(common::proxy_config(&format!("http://{addr}"))).await;

    let res = common::client()
        .get(proxy.url("/?to=123&message=hi"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("unreachable"));
}

#[tokio::test]
async fn test_request_deadline_returns_502_json() {
    let backend = common::start_delayed_backend(Duration::from_millis(2500), |_, _| {
        (200, "application/json", "{}".into())
    })
    .await;
    let mut config = common::proxy_config(&backend.url());
    config.timeouts.request_secs = 1;
    let proxy = common::start_proxy(config).await;

    let res = common::client()
        .get(proxy.url("/?to=123&message=hi"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 502);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("did not answer"));
}
