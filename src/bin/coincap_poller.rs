use tracing::{error, info};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

use coincap_poller::config::PollerConfig;
use coincap_poller::error::Error;
use coincap_poller::run_poller;

/// Formats log timestamps in the system's local timezone instead of UTC.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f"))
    }
}

#[tokio::main]
async fn main() {
    // RUST_LOG controls verbosity (default "info"); per-asset dumps are at debug.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(LocalTimer)
        .init();

    // Only fatal errors come back; the supervisor restarts us.
    if let Err(e) = app_main().await {
        error!("❌ Critical Error: {}", e);
        std::process::exit(1);
    }
}

async fn app_main() -> Result<(), Error> {
    // Fail fast: without a valid config there is nothing to poll.
    let cfg = PollerConfig::load()?;

    info!("🚀 Starting CoinCap asset poller...");
    run_poller(&cfg).await
}
