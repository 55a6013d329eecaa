/// Extra Innings Live — MLB extra innings notifier
///
/// What it does:
///   1. Every 60s reads today's MLB schedule
///   2. Pulls the live linescore for each game
///   3. Posts one webhook alert per game that goes past the ninth
///
/// Run:
///   DISCORD_WEBHOOK_URL=https://discord.com/api/webhooks/... cargo run --bin extra-innings

mod config;
mod dedup;
mod poll_loop;

use anyhow::{Context, Result};
use config::Config;
use dotenv::dotenv;
use logger::EventLogger;
use mlb_monitor::MlbClient;
use poll_loop::PollLoop;
use std::env;
use std::fs::File;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use webhook_alert::WebhookNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {e}");
            return Err(e).context("refusing to start without a valid webhook");
        }
    };

    // Single instance lock: two processes would each keep their own notified set.
    let lock_file_path = env::temp_dir().join("extra_innings_notifier.lock");
    let lock_file = File::create(&lock_file_path)
        .with_context(|| format!("cannot create lock file {}", lock_file_path.display()))?;

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of extra-innings is already running! Exiting.");
            return Ok(());
        }
    };

    info!("Provider: {}", config.api_base);
    info!("Poll interval: {}s, HTTP timeout: {}s", config.poll_interval.as_secs(), config.http_timeout.as_secs());
    info!("Event log: ./{}/", config.event_log_dir);

    let source = MlbClient::new(&config.api_base, config.http_timeout);
    let sink = WebhookNotifier::new(&config.webhook_url, config.http_timeout);
    let events = EventLogger::new(&config.event_log_dir);

    PollLoop::new(source, sink, config.poll_interval)
        .with_event_log(events)
        .run()
        .await;

    Ok(())
}
