use std::sync::Arc;

use crate::admission::AdmissionGate;
use crate::bandwidth::BandwidthMonitor;

// App's shared state.
pub struct AppState {
    pub client: reqwest::Client,
    pub upstream_url: String,
    pub gate: AdmissionGate,
    pub monitor: Arc<BandwidthMonitor>,
}
