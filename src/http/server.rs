//! HTTP server setup and the per-request proxy pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, body limit)
//! - Bound every proxied exchange by the request deadline
//! - Bind server to listener with graceful shutdown
//! - Rewrite legacy GET sends, forward to the backend, apply the queued
//!   fallback, relay the response
//! - Serve the plain-text `/health` report

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{
        header::{
            HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
        },
        Request, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::{EndpointConfig, FallbackConfig, ProxyConfig};
use crate::health::{probe_backend, HealthReport};
use crate::http::request::{client_ip, request_id_of, InboundRequest, MakeRequestUuid};
use crate::http::response::{
    error_response, relay, CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS, CORS_ALLOW_ORIGIN,
};
use crate::observability::metrics;
use crate::observability::sanitize::{or_dash, sanitize, sanitize_opt, truncate_for_log};
use crate::resilience::fallback::{self, FallbackDecision};
use crate::rewrite::legacy_send;
use crate::upstream::{BackendResponse, ForwardError, Forwarder, OutboundRequest};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
    pub endpoints: Arc<EndpointConfig>,
    pub fallback: Arc<FallbackConfig>,
    /// Backend URL as configured, for the health report.
    pub backend_url: Arc<str>,
    /// Deadline for a whole proxied exchange, retry and fallback included.
    pub request_timeout: Duration,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration. The backend
    /// client and its connection pool are built here, once.
    pub fn new(config: ProxyConfig) -> Result<Self, ForwardError> {
        let forwarder = Arc::new(Forwarder::new(&config)?);

        let state = AppState {
            forwarder,
            endpoints: Arc::new(config.endpoints.clone()),
            fallback: Arc::new(config.fallback.clone()),
            backend_url: Arc::from(config.backend.url.as_str()),
            request_timeout: config.timeouts.request(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let x_request_id = HeaderName::from_static(crate::http::request::X_REQUEST_ID);

        Router::new()
            .route("/health", proxied(get(health_handler)))
            .route("/", proxied(get(proxy_handler)))
            .route("/{*path}", proxied(get(proxy_handler)))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(x_request_id))
                    .layer(SetResponseHeaderLayer::overriding(
                        ACCESS_CONTROL_ALLOW_ORIGIN,
                        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        ACCESS_CONTROL_ALLOW_HEADERS,
                        HeaderValue::from_static(CORS_ALLOW_HEADERS),
                    ))
                    .layer(SetResponseHeaderLayer::overriding(
                        ACCESS_CONTROL_ALLOW_METHODS,
                        HeaderValue::from_static(CORS_ALLOW_METHODS),
                    )),
            )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving with a custom transport.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Add the proxied verbs other than GET to `router`.
fn proxied(router: MethodRouter<AppState>) -> MethodRouter<AppState> {
    router
        .post(proxy_handler)
        .put(proxy_handler)
        .patch(proxy_handler)
        .delete(proxy_handler)
        .options(proxy_handler)
}

/// Main proxy handler. A request that outlives the deadline is answered
/// with 502 and the JSON error body.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id_of(request.headers());
    let method_label = request.method().to_string();
    let deadline = state.request_timeout;

    let exchange = proxy_exchange(&state, request, &request_id, &method_label, start_time);
    match tokio::time::timeout(deadline, exchange).await {
        Ok(response) => response,
        Err(_) => {
            let e = ForwardError::Deadline(deadline);
            tracing::error!(request_id = %request_id, error = %e, "Request deadline exceeded");
            metrics::record_request(&method_label, 502, start_time);
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

/// Rewrites legacy sends, forwards, applies the queued fallback, relays.
async fn proxy_exchange(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
    method_label: &str,
    start_time: Instant,
) -> Response {
    let client_ip = client_ip(&request);

    let inbound = match InboundRequest::read(request).await {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Rejected inbound request");
            metrics::record_request(method_label, e.status().as_u16(), start_time);
            return error_response(e.status(), e);
        }
    };

    let pretty_to = sanitize_opt(inbound.query.get("to"));
    let pretty_message = truncate_for_log(&sanitize_opt(inbound.query.get("message")));

    let base = match OutboundRequest::pass_through(&inbound, state.forwarder.origin()) {
        Ok(base) => base,
        Err(e) => {
            let e = ForwardError::from(e);
            tracing::error!(request_id = %request_id, path = %inbound.path, error = %e, "Cannot build backend target");
            metrics::record_request(method_label, 502, start_time);
            return error_response(StatusCode::BAD_GATEWAY, e);
        }
    };
    let outbound = rewrite_legacy(state, &inbound, base, request_id);

    tracing::info!(
        request_id = %request_id,
        ip = %client_ip,
        method = %outbound.method,
        path = %inbound.path,
        to = %or_dash(&pretty_to),
        message = %or_dash(&pretty_message),
        target = %outbound.target,
        "REQ"
    );

    let response = match state.forwarder.forward(&outbound).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, target = %outbound.target, error = %e, "Error contacting backend");
            if e.is_unreachable() {
                metrics::record_unreachable();
            }
            metrics::record_request(method_label, 502, start_time);
            return error_response(StatusCode::BAD_GATEWAY, e);
        }
    };

    let (response, target) = apply_fallback(state, &outbound, response, request_id).await;

    tracing::info!(
        request_id = %request_id,
        status = response.status.as_u16(),
        size = response.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        target = %target,
        "RESP"
    );
    metrics::record_request(method_label, response.status.as_u16(), start_time);

    relay(response)
}

/// Apply the legacy GET rewrite to `base`, or return it unchanged.
fn rewrite_legacy(
    state: &AppState,
    inbound: &InboundRequest,
    base: OutboundRequest,
    request_id: &str,
) -> OutboundRequest {
    let Some(send) = legacy_send(&inbound.method, &inbound.query, &state.endpoints) else {
        return base;
    };

    match send.apply(&base, state.forwarder.origin()) {
        Ok(rewritten) => {
            tracing::info!(
                request_id = %request_id,
                route = send.route.as_str(),
                path = %send.path,
                to = %sanitize(inbound.query.get("to").unwrap_or_default()),
                immediate = ?send.immediate,
                "TRANSFORM GET -> POST"
            );
            metrics::record_rewrite(send.route.as_str());
            rewritten
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Error preparing GET -> POST rewrite");
            base
        }
    }
}

/// Re-send a "no active sessions" failure as a queued pool send. Returns the
/// response to relay and the target it came from.
async fn apply_fallback(
    state: &AppState,
    sent: &OutboundRequest,
    response: BackendResponse,
    request_id: &str,
) -> (BackendResponse, Url) {
    if !state.fallback.enabled {
        return (response, sent.target.clone());
    }

    let queued = match fallback::evaluate(&response, sent, &state.fallback.error_signature) {
        Ok(FallbackDecision::Requeue(queued)) => queued,
        Ok(FallbackDecision::SessionTargeted { session }) => {
            tracing::info!(
                request_id = %request_id,
                session = %sanitize(&session),
                "No active sessions for session-targeted send, not re-queued"
            );
            return (response, sent.target.clone());
        }
        Ok(_) => return (response, sent.target.clone()),
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Skipping queued fallback");
            return (response, sent.target.clone());
        }
    };

    let pool_target = match state.forwarder.origin().join(&state.endpoints.pool_send) {
        Ok(target) => target,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Error in queued fallback");
            return (response, sent.target.clone());
        }
    };
    let resend = queued.request(sent, pool_target);

    tracing::warn!(
        request_id = %request_id,
        to = %sanitize(&queued.phone),
        "Fallback: no active sessions, re-sending as queued (immediate=false)"
    );

    match state.forwarder.dispatch(&resend).await {
        Ok(fallback_response) => {
            tracing::info!(
                request_id = %request_id,
                status = fallback_response.status.as_u16(),
                size = fallback_response.len(),
                target = %resend.target,
                "FALLBACK RESP"
            );
            metrics::record_fallback("dispatched");
            (fallback_response, resend.target)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Queued fallback dispatch failed");
            metrics::record_fallback("failed");
            (response, sent.target.clone())
        }
    }
}

/// `GET /health`: proxy status plus a live probe of the backend.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let probe = probe_backend(&state.forwarder, &state.endpoints.health).await;
    let report = HealthReport {
        backend_url: state.backend_url.to_string(),
        probe,
    };
    (
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        report.render(),
    )
}
