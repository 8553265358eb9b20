use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Json;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::admission::Decision;
use crate::forwarder;
use crate::identity::extract_identity;
use crate::metrics::{ADMITTED_TOTAL, REJECTED_TOTAL, REQUEST_TOTAL};
use crate::models::ErrorBody;
use crate::state::AppState;

// Chat handler: admission first, forward on allow. The payload is relayed
// as raw bytes; this gateway does not reshape it.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    REQUEST_TOTAL.inc();

    let identity = extract_identity(&headers, peer);
    let reading = state.monitor.current();

    match state.gate.admit(&identity, Instant::now(), &reading) {
        Decision::Allow(guard) => {
            ADMITTED_TOTAL.inc();
            tracing::info!(identity = %identity, "request admitted");
            forwarder::forward(&state, &headers, body, guard).await
        }
        Decision::Reject { retry_after } => {
            REJECTED_TOTAL.inc();
            let seconds = retry_after_secs(retry_after);
            tracing::info!(identity = %identity, seconds, "request told to wait");

            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(ErrorBody::cooldown(seconds))).into_response();
            if let Ok(value) = header::HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        Decision::Busy => {
            REJECTED_TOTAL.inc();
            tracing::info!(identity = %identity, "request rejected, identity already in flight");
            (StatusCode::FORBIDDEN, Json(ErrorBody::busy())).into_response()
        }
    }
}

// Ceiling in whole seconds so a client honoring Retry-After lands outside
// the window.
fn retry_after_secs(retry_after: Duration) -> u64 {
    let mut seconds = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::ZERO), 0);
        assert_eq!(retry_after_secs(Duration::from_secs(30)), 30);
        assert_eq!(retry_after_secs(Duration::from_millis(29_500)), 30);
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
    }
}
