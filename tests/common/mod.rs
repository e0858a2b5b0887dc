//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use legacy_send_proxy::config::ProxyConfig;
use legacy_send_proxy::http::HttpServer;
use legacy_send_proxy::lifecycle::Shutdown;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// A request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("backend received non-JSON body")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// What the mock backend answers: status, content type, body.
pub type Reply = (u16, &'static str, String);

type Responder = dyn Fn(&Recorded, usize) -> Reply + Send + Sync;

#[derive(Clone)]
struct MockState {
    calls: Arc<Mutex<Vec<Recorded>>>,
    respond: Arc<Responder>,
    delay: Duration,
}

/// Handle to a running mock backend.
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

/// Start a mock backend that records every request and answers through `f`.
/// `f` receives the request and its zero-based call index.
pub async fn start_programmable_backend<F>(f: F) -> MockBackend
where
    F: Fn(&Recorded, usize) -> Reply + Send + Sync + 'static,
{
    start_delayed_backend(Duration::ZERO, f).await
}

/// Like [`start_programmable_backend`], but every reply waits `delay` first.
pub async fn start_delayed_backend<F>(delay: Duration, f: F) -> MockBackend
where
    F: Fn(&Recorded, usize) -> Reply + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        calls: calls.clone(),
        respond: Arc::new(f),
        delay,
    };

    let app = Router::new().fallback(record_and_reply).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, calls }
}

/// Start a mock backend that always returns `200` with a JSON body.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_, _| (200, "application/json", body.to_string())).await
}

async fn record_and_reply(State(state): State<MockState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let recorded = Recorded {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
    };

    let index = {
        let mut calls = state.calls.lock().unwrap();
        calls.push(recorded.clone());
        calls.len() - 1
    };

    let (status, content_type, body) = (state.respond)(&recorded, index);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (
        StatusCode::from_u16(status).unwrap(),
        [(CONTENT_TYPE, content_type)],
        body,
    )
        .into_response()
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Default config pointed at `backend_url`, with a short retry backoff.
pub fn proxy_config(backend_url: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.backend.url = backend_url.to_string();
    config.retries.backoff_ms = 50;
    config
}

/// A running proxy.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });

    TestProxy { addr, shutdown }
}

/// A client that neither pools nor follows redirects nor uses env proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
