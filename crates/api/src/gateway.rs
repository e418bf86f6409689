//! Reverse proxy in front of the auth, catalog and orders services.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, LOCATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use reqwest::Client;
use serde::Serialize;

use crate::error::ApiError;

/// Largest request body relayed upstream.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// One relayed path prefix and the service root it maps to.
///
/// `GET /auth/login?x=1` with upstream `http://auth-service:3001/auth`
/// is relayed to `http://auth-service:3001/auth/login?x=1`.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub name: &'static str,
    pub prefix: &'static str,
    pub base_url: String,
}

impl Upstream {
    pub fn new(name: &'static str, prefix: &'static str, base_url: &str) -> Self {
        Self {
            name,
            prefix,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Maps an incoming path and query onto this upstream.
    fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let rest = path.strip_prefix(self.prefix).unwrap_or(path);
        match query {
            Some(query) => format!("{}{rest}?{query}", self.base_url),
            None => format!("{}{rest}", self.base_url),
        }
    }
}

/// Shared relay state for one upstream.
#[derive(Clone)]
pub struct RelayState {
    client: Client,
    upstream: Arc<Upstream>,
    timeout: Duration,
}

impl RelayState {
    pub fn new(client: Client, upstream: Upstream, timeout: Duration) -> Self {
        Self {
            client,
            upstream: Arc::new(upstream),
            timeout,
        }
    }
}

/// Relays a request and hands back the upstream status and body unchanged.
///
/// Only `content-type` and `location` are copied from the upstream response.
/// An unreachable or slow upstream is a 503.
pub async fn relay(State(state): State<RelayState>, request: Request) -> Response {
    let upstream = &state.upstream;
    let (parts, body) = request.into_parts();
    let url = upstream.target_url(parts.uri.path(), parts.uri.query());

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => return ApiError::BadRequest(format!("Unreadable request body: {e}")).into_response(),
    };

    let mut headers = parts.headers;
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);

    tracing::info!(method = %parts.method, %url, upstream = upstream.name, "relaying request");

    let result = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .timeout(state.timeout)
        .send()
        .await;

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            metrics::counter!(
                "gateway_requests_total",
                "upstream" => upstream.name,
                "outcome" => "unavailable"
            )
            .increment(1);
            tracing::warn!(error = %e, upstream = upstream.name, "upstream unavailable");
            return ApiError::ServiceUnavailable(format!("{} service unavailable", upstream.name))
                .into_response();
        }
    };

    let status = response.status();
    let mut out_headers = HeaderMap::new();
    for name in [CONTENT_TYPE, LOCATION] {
        if let Some(value) = response.headers().get(&name) {
            out_headers.insert(name, value.clone());
        }
    }
    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => {
            metrics::counter!(
                "gateway_requests_total",
                "upstream" => upstream.name,
                "outcome" => "unavailable"
            )
            .increment(1);
            tracing::warn!(error = %e, upstream = upstream.name, "upstream response interrupted");
            return ApiError::ServiceUnavailable(format!("{} service unavailable", upstream.name))
                .into_response();
        }
    };

    metrics::counter!(
        "gateway_requests_total",
        "upstream" => upstream.name,
        "outcome" => "relayed"
    )
    .increment(1);
    tracing::debug!(%status, upstream = upstream.name, "upstream answered");

    (status, out_headers, Body::from(bytes)).into_response()
}

#[derive(Serialize)]
pub struct GatewayHealth {
    pub ok: bool,
    pub service: &'static str,
    /// Seconds since the gateway started.
    pub uptime: f64,
}

/// GET /health — gateway liveness and uptime.
pub async fn health(State(started): State<Instant>) -> (StatusCode, Json<GatewayHealth>) {
    (
        StatusCode::OK,
        Json(GatewayHealth {
            ok: true,
            service: "api-gateway",
            uptime: started.elapsed().as_secs_f64(),
        }),
    )
}
