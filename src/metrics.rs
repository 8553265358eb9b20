use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of chat requests").unwrap();
    pub static ref ADMITTED_TOTAL: Counter = register_counter!(
        "gateway_admitted_total",
        "Requests admitted and forwarded upstream"
    )
    .unwrap();
    pub static ref REJECTED_TOTAL: Counter = register_counter!(
        "gateway_rejected_total",
        "Requests rejected by the admission gate"
    )
    .unwrap();
    pub static ref UPSTREAM_FAILURES: Counter = register_counter!(
        "gateway_upstream_failures_total",
        "Upstream error statuses and transport failures"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Latency from admission to upstream response headers"
    )
    .unwrap();
    pub static ref BANDWIDTH_GIB: Gauge = register_gauge!(
        "gateway_bandwidth_gib",
        "Last refreshed aggregate bandwidth usage in GiB"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge = register_gauge!(
        "gateway_tracked_clients",
        "Client cooldown records currently tracked"
    )
    .unwrap();
}
