use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;

use crate::admission::InFlightGuard;
use crate::metrics::{REQUEST_LATENCY, UPSTREAM_FAILURES};
use crate::models::ErrorBody;
use crate::state::AppState;

// Relay an admitted request upstream and stream the answer back verbatim.
// Never retried: replaying a partially billed generation would double-spend
// the caller's own upstream quota.
pub async fn forward(
    state: &AppState,
    headers: &HeaderMap,
    body: Bytes,
    guard: InFlightGuard,
) -> Response {
    let start = Instant::now();

    let mut request = state
        .client
        .post(&state.upstream_url)
        .header("Content-Type", "application/json")
        .body(body);

    // The upstream cannot serve without the caller's own key.
    if let Some(auth) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        request = request.header("Authorization", auth);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            UPSTREAM_FAILURES.inc();
            tracing::warn!(error = %e, "upstream timed out");
            return error_response(
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody::upstream("Upstream timed out."),
            );
        }
        Err(e) => {
            UPSTREAM_FAILURES.inc();
            tracing::warn!(error = %e, "upstream unreachable");
            return error_response(
                StatusCode::BAD_GATEWAY,
                ErrorBody::upstream("Upstream is unreachable."),
            );
        }
    };

    REQUEST_LATENCY.observe(start.elapsed().as_secs_f64());

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        // surfaced to the caller with its original status, never retried
        UPSTREAM_FAILURES.inc();
        tracing::info!(%status, "relaying upstream error");
    }

    let mut relay_headers = HeaderMap::new();
    if let Some(content_type) = response
        .headers()
        .get("content-type")
        .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok())
    {
        relay_headers.insert(header::CONTENT_TYPE, content_type);
    }

    // Chunk-for-chunk relay, nothing buffered proxy-side. Dropping this
    // stream (the client went away) drops the upstream response and the
    // in-flight guard with it.
    let stream = response.bytes_stream().map(move |chunk| {
        let _in_flight = &guard;
        chunk
    });

    (status, relay_headers, Body::from_stream(stream)).into_response()
}

pub fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, axum::Json(body)).into_response()
}
