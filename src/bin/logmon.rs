//! logmon - HTTP access log monitor
//!
//! Usage:
//!   logmon [-f <access log>] [-r <requests per second>] [--replay | --tail] [--jsonl <path>]
//!
//! Environment variables (flags win):
//!   LOGMON_FILE - access log path (default: /var/log/access.log)
//!   LOGMON_RATE_THRESHOLD - alert threshold in requests/sec (default: 10)
//!   LOGMON_READ_MODE - follow | tail | replay (default: follow)
//!   LOGMON_JSONL_PATH - also append events to this JSONL file
//!   LOGMON_CHANNEL_BUFFER - channel size (default: 10000)

use dotenv::dotenv;
use log::{error, info};
use logmon::config::{usage, ArgsOutcome, MonitorConfig};
use logmon::monitor::run_monitor;
use logmon::output::{ConsoleSink, EventSink, JsonlSink};
use std::env;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    // stdout belongs to the event stream
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let mut config = MonitorConfig::from_env()?;
    if config.apply_args(env::args().skip(1))? == ArgsOutcome::Help {
        println!("{}", usage());
        return Ok(());
    }

    info!("🚀 Starting logmon");
    info!("📊 Configuration:");
    info!("   ├─ Site: {}", config.site_name);
    info!("   ├─ Access log: {} ({})", config.log_file.display(), config.read_mode.as_str());
    info!("   ├─ Rate threshold: {} req/s over 2 minutes", config.rate_threshold);
    info!("   ├─ Section alert max: {}", config.section_alert_max);
    info!("   ├─ Channel buffer: {}", config.channel_buffer);
    match &config.jsonl_path {
        Some(path) => info!("   └─ JSONL events: {}", path.display()),
        None => info!("   └─ JSONL events: disabled"),
    }

    let mut sinks: Vec<Box<dyn EventSink>> =
        vec![Box::new(ConsoleSink::stdout(config.rate_threshold))];
    if let Some(path) = &config.jsonl_path {
        sinks.push(Box::new(JsonlSink::open(path.clone())?));
    }

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("⚠️  Received CTRL+C, shutting down...");
                ctrl_c_cancel.cancel();
            }
            Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
        }
    });

    let report = run_monitor(&config, sinks, cancel).await?;
    info!(
        "✅ logmon stopped ({} records, {} events)",
        report.records_ingested, report.events_emitted
    );
    Ok(())
}
