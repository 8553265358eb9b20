use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use genai_gateway::admission::AdmissionGate;
use genai_gateway::bandwidth::{BandwidthMonitor, RenderMetering, refresh_loop};
use genai_gateway::config::Args;
use genai_gateway::cooldown::CooldownPolicy;
use genai_gateway::metrics::TRACKED_CLIENTS;
use genai_gateway::router;
use genai_gateway::state::AppState;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // a malformed policy is fatal before any traffic is served
    let policy = match CooldownPolicy::parse(&args.cooldown) {
        Ok(policy) => policy,
        Err(e) => {
            tracing::error!(error = %e, spec = %args.cooldown, "invalid cooldown policy");
            process::exit(1);
        }
    };

    let client = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(args.connect_timeout))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client");
            process::exit(1);
        }
    };

    let monitor = Arc::new(BandwidthMonitor::new(Duration::from_secs(
        args.metering_staleness,
    )));

    match (&args.metering_service_id, &args.metering_api_key) {
        (Some(service_id), Some(api_key)) => {
            let source = Arc::new(RenderMetering::new(
                client.clone(),
                args.metering_url.clone(),
                service_id.clone(),
                api_key.clone(),
            ));
            tokio::spawn(refresh_loop(
                Arc::clone(&monitor),
                source,
                Duration::from_secs(args.metering_interval),
            ));
        }
        _ => {
            tracing::warn!("metering credentials missing, admission runs on the default tier");
        }
    }

    let gate = AdmissionGate::new(policy);

    // idle-record sweeper keeps the cooldown map bounded
    {
        let gate = gate.clone();
        let idle = Duration::from_secs(args.idle_evict.max(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(idle.min(Duration::from_secs(300)));
            loop {
                interval.tick().await;
                gate.prune(Instant::now(), idle);
                TRACKED_CLIENTS.set(gate.tracked() as f64);
            }
        });
    }

    let state = Arc::new(AppState {
        client,
        upstream_url: args.upstream_url.clone(),
        gate,
        monitor,
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind listener");
            process::exit(1);
        }
    };

    tracing::info!(
        port = args.port,
        upstream = %args.upstream_url,
        cooldown = %args.cooldown,
        "gateway running"
    );

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "server exited");
        process::exit(1);
    }
}
