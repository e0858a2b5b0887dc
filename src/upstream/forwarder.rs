//! Backend dispatch over the shared connection pool.
//!
//! # Responsibilities
//! - Own the single HTTP client (connection pool) used for every backend call
//! - Bound concurrent in-flight backend calls
//! - Apply connect/read timeouts and never follow redirects
//! - Retry once on a transient status after a fixed backoff

use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::ProxyConfig;
use crate::http::request::{FormPart, Payload};
use crate::observability::metrics;
use crate::resilience::retries::RetryPolicy;
use crate::upstream::error::ForwardError;
use crate::upstream::origin::BackendOrigin;
use crate::upstream::types::{BackendResponse, OutboundRequest};

/// Forwards requests to the backend origin. Built once at startup and shared
/// by every request task.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    origin: BackendOrigin,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self, ForwardError> {
        let origin = BackendOrigin::parse(&config.backend.url)?;

        let client = reqwest::Client::builder()
            .connect_timeout(config.timeouts.connect())
            .read_timeout(config.timeouts.read())
            .redirect(Policy::none())
            .pool_max_idle_per_host(config.backend.pool_max_idle_per_host)
            .build()
            .map_err(ForwardError::Client)?;

        tracing::info!(
            origin = %origin,
            max_connections = config.backend.max_connections,
            connect_timeout_secs = config.timeouts.connect_secs,
            read_timeout_secs = config.timeouts.read_secs,
            "Backend client initialized"
        );

        Ok(Self {
            client,
            origin,
            permits: Arc::new(Semaphore::new(config.backend.max_connections)),
            retry: RetryPolicy::from_config(&config.retries),
        })
    }

    pub fn origin(&self) -> &BackendOrigin {
        &self.origin
    }

    /// Dispatch with the transient-error policy: a 502/503 is retried once.
    /// Transport failures are returned without retrying.
    pub async fn forward(&self, request: &OutboundRequest) -> Result<BackendResponse, ForwardError> {
        let response = self.dispatch(request).await?;

        if self.retry.should_retry(response.status) {
            tracing::warn!(
                status = %response.status,
                delay = ?self.retry.backoff,
                target = %request.target,
                "Transient backend error, retrying once"
            );
            metrics::record_retry();
            tokio::time::sleep(self.retry.backoff).await;
            return self.dispatch(request).await;
        }

        Ok(response)
    }

    /// A single backend call; the response body is read in full.
    pub async fn dispatch(&self, request: &OutboundRequest) -> Result<BackendResponse, ForwardError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ForwardError::PoolClosed)?;

        let mut headers = request.headers.clone();
        headers.remove(CONTENT_LENGTH);
        if matches!(request.body, Payload::Multipart(_)) {
            headers.remove(CONTENT_TYPE);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), request.target.clone())
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(request.query.pairs());
        }
        builder = match &request.body {
            Payload::Json(value) => builder.json(value),
            Payload::InboundJson { raw, .. } | Payload::Raw(raw) => builder.body(raw.clone()),
            Payload::Multipart(parts) => builder.multipart(build_form(parts)?),
            Payload::Empty => builder,
        };

        let response = builder.send().await.map_err(ForwardError::transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(ForwardError::transport)?;

        tracing::debug!(
            status = %status,
            size = body.len(),
            target = %request.target,
            "Backend responded"
        );

        Ok(BackendResponse {
            status,
            headers,
            body,
        })
    }
}

fn build_form(parts: &[FormPart]) -> Result<Form, ForwardError> {
    let mut form = Form::new();
    for part in parts {
        let mut encoded = Part::bytes(part.data.to_vec());
        if let Some(file_name) = &part.file_name {
            encoded = encoded.file_name(file_name.clone());
        }
        if let Some(content_type) = &part.content_type {
            encoded = encoded
                .mime_str(content_type)
                .map_err(|source| ForwardError::InvalidPart {
                    name: part.name.clone(),
                    source,
                })?;
        }
        form = form.part(part.name.clone(), encoded);
    }
    Ok(form)
}
