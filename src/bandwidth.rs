use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Datelike, SecondsFormat, Timelike, Utc};
use serde::Deserialize;

use crate::error::MeteringError;
use crate::metrics::BANDWIDTH_GIB;

// Most recent usage figure as seen by admission checks.
#[derive(Debug, Clone, Copy)]
pub struct UsageReading {
    pub gib: f64,
    pub observed_at: Option<Instant>,
    pub valid: bool,
}

impl UsageReading {
    // Value fed to the cooldown policy. An invalid reading evaluates the
    // default tier instead of trusting a figure nobody vouches for.
    pub fn effective(&self) -> f64 {
        if self.valid { self.gib } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    gib: f64,
    observed_at: Instant,
}

// Cached aggregate-bandwidth view. Single writer (the refresh task), many
// readers on the admission path.
pub struct BandwidthMonitor {
    sample: RwLock<Option<Sample>>,
    staleness: Duration,
}

impl BandwidthMonitor {
    pub fn new(staleness: Duration) -> Self {
        Self {
            sample: RwLock::new(None),
            staleness,
        }
    }

    // Non-blocking beyond a copy under the read lock.
    pub fn current(&self) -> UsageReading {
        let sample = match self.sample.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        match sample {
            Some(sample) => UsageReading {
                gib: sample.gib,
                observed_at: Some(sample.observed_at),
                valid: sample.observed_at.elapsed() <= self.staleness,
            },
            None => UsageReading {
                gib: 0.0,
                observed_at: None,
                valid: false,
            },
        }
    }

    pub fn record(&self, gib: f64) {
        self.record_at(gib, Instant::now());
    }

    fn record_at(&self, gib: f64, observed_at: Instant) {
        let mut guard = match self.sample.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Sample { gib, observed_at });
    }
}

// Pull-based external metering service. The request/response shape is an
// adapter detail behind this seam, which also keeps tests off the network.
#[async_trait]
pub trait MeteringSource: Send + Sync {
    // Current-window aggregate egress in GiB.
    async fn fetch_usage(&self) -> Result<f64, MeteringError>;
}

// Render bandwidth metrics adapter. Usage is summed over the window from
// the start of the current UTC month to now; the endpoint reports MiB.
pub struct RenderMetering {
    client: reqwest::Client,
    url: String,
    service_id: String,
    api_key: String,
}

impl RenderMetering {
    pub fn new(client: reqwest::Client, url: String, service_id: String, api_key: String) -> Self {
        Self {
            client,
            url,
            service_id,
            api_key,
        }
    }
}

#[derive(Deserialize)]
struct MeteringPoint {
    #[serde(default)]
    value: f64,
}

#[derive(Deserialize)]
struct MeteringSeries {
    #[serde(default)]
    unit: String,
    #[serde(default)]
    values: Vec<MeteringPoint>,
}

#[async_trait]
impl MeteringSource for RenderMetering {
    async fn fetch_usage(&self) -> Result<f64, MeteringError> {
        let end = Utc::now();
        let start = end
            .with_day(1)
            .and_then(|t| t.with_hour(0))
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(end);

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("resource", self.service_id.clone()),
                ("startTime", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
                ("endTime", end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ])
            .header("Accept", "application/json")
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MeteringError::Status(response.status().as_u16()));
        }

        let mut series: Vec<MeteringSeries> = response.json().await?;
        if series.len() != 1 {
            return Err(MeteringError::Malformed);
        }
        let series = series.remove(0);

        let total_mib: f64 = series.values.iter().map(|point| point.value).sum();
        tracing::debug!(total_mib, unit = %series.unit, "bandwidth query succeeded");

        Ok(total_mib / 1024.0)
    }
}

// Periodic refresh, decoupled from request traffic. Failures keep the
// previous sample and retry on the next tick.
pub async fn refresh_loop(
    monitor: Arc<BandwidthMonitor>,
    source: Arc<dyn MeteringSource>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match source.fetch_usage().await {
            Ok(gib) => {
                BANDWIDTH_GIB.set(gib);
                tracing::info!(gib, "bandwidth usage refreshed");
                monitor.record(gib);
            }
            Err(e) => {
                tracing::warn!(error = %e, "bandwidth refresh failed, keeping last sample");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyMetering {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MeteringSource for FlakyMetering {
        async fn fetch_usage(&self) -> Result<f64, MeteringError> {
            // first call fails, later ones answer
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(MeteringError::Status(429))
            } else {
                Ok(42.0)
            }
        }
    }

    #[test]
    fn never_refreshed_reading_is_invalid() {
        let monitor = BandwidthMonitor::new(Duration::from_secs(60));
        let reading = monitor.current();
        assert!(!reading.valid);
        assert!(reading.observed_at.is_none());
        assert_eq!(reading.effective(), 0.0);
    }

    #[test]
    fn recorded_reading_is_valid() {
        let monitor = BandwidthMonitor::new(Duration::from_secs(60));
        monitor.record(12.5);
        let reading = monitor.current();
        assert!(reading.valid);
        assert_eq!(reading.gib, 12.5);
        assert_eq!(reading.effective(), 12.5);
    }

    #[test]
    fn reading_goes_stale_past_the_bound() {
        let monitor = BandwidthMonitor::new(Duration::from_secs(60));
        let Some(past) = Instant::now().checked_sub(Duration::from_secs(120)) else {
            return;
        };
        monitor.record_at(30.0, past);
        let reading = monitor.current();
        assert!(!reading.valid);
        // the stale figure is still visible, just not trusted
        assert_eq!(reading.gib, 30.0);
        assert_eq!(reading.effective(), 0.0);
    }

    #[tokio::test]
    async fn refresh_loop_survives_metering_failures() {
        let monitor = Arc::new(BandwidthMonitor::new(Duration::from_secs(60)));
        let source = Arc::new(FlakyMetering {
            calls: AtomicUsize::new(0),
        });

        let task = tokio::spawn(refresh_loop(
            Arc::clone(&monitor),
            source.clone(),
            Duration::from_millis(5),
        ));

        for _ in 0..200 {
            if monitor.current().valid {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        task.abort();

        let reading = monitor.current();
        assert!(reading.valid);
        assert_eq!(reading.gib, 42.0);
        assert!(source.calls.load(Ordering::SeqCst) >= 2);
    }
}
