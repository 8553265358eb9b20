use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "genai-gateway")]
#[command(about = "Bandwidth-aware admission gateway for a generative language API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Upstream generative API endpoint receiving forwarded requests
    #[arg(
        long,
        default_value = "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
    )]
    pub upstream_url: String,

    // Cooldown policy: "default_seconds, duration:threshold, ..." with
    // thresholds in GiB of monthly egress. Example: "30, 60:70, 90:80"
    #[arg(long, default_value = "0")]
    pub cooldown: String,

    // Bandwidth metering endpoint
    #[arg(long, default_value = "https://api.render.com/v1/metrics/bandwidth")]
    pub metering_url: String,

    // Metered service resource id
    #[arg(long)]
    pub metering_service_id: Option<String>,

    // Metering API key. Without one the monitor stays offline and
    // admission runs on the default tier.
    #[arg(long)]
    pub metering_api_key: Option<String>,

    // Seconds between bandwidth refreshes
    #[arg(long, default_value_t = 300)]
    pub metering_interval: u64,

    // Seconds after which a cached reading no longer counts as valid
    #[arg(long, default_value_t = 900)]
    pub metering_staleness: u64,

    // Seconds of inactivity before a client record is evicted
    #[arg(long, default_value_t = 3600)]
    pub idle_evict: u64,

    // Upstream connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub connect_timeout: u64,
}
