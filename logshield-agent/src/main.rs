//! logshield-agent - on-device telemetry agent daemon
//!
//! Runs the monitoring loop: captures derived device events (battery,
//! network, foreground app), forwards them as syslog records over UDP, and
//! replays the retry queue each tick.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/logshield/agent.db (~/.local/share/logshield/agent.db)
//! - Logs: $XDG_STATE_HOME/logshield/logshield.log (~/.local/state/logshield/logshield.log)
//! - Config: $XDG_CONFIG_HOME/logshield/config.toml (~/.config/logshield/config.toml)

mod probes;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use logshield_core::monitor::{self, Monitor};
use logshield_core::{
    Config, ConfigResolver, EventCategory, ForwardingPipeline, RetryQueue, Store, SyslogEncoder,
    Transport, UdpTransport,
};

use crate::probes::SysfsProbe;

#[derive(Parser)]
#[command(name = "logshield-agent")]
#[command(about = "On-device telemetry agent: capture, persist, and forward device events")]
#[command(version)]
struct Args {
    /// Run a single monitoring tick and exit
    #[arg(long)]
    once: bool,

    /// Set the live poll interval in seconds before starting
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        logshield_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("logshield-agent starting");

    // Open database at XDG-compliant path
    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let store = Arc::new(Store::open(&db_path).context("failed to open store")?);
    store.migrate().context("failed to run database migrations")?;

    println!("Database: {}", db_path.display());

    if let Some(secs) = args.interval {
        monitor::set_interval(&store, secs).context("failed to set interval")?;
        println!("Poll interval set to {}s", secs);
    }

    let encoder = SyslogEncoder::new(config.agent.device_tag.clone());
    let transport: Arc<dyn Transport> = Arc::new(UdpTransport::new(Duration::from_secs(
        config.transport.send_timeout_secs,
    )));
    let retry = Arc::new(RetryQueue::new(Arc::clone(&store), encoder.clone()));

    let pipeline = ForwardingPipeline::spawn(
        Arc::clone(&store),
        ConfigResolver::new(Arc::clone(&store)),
        encoder,
        Arc::clone(&transport),
        Arc::clone(&retry),
    );

    let mut mon = Monitor::new(
        Arc::clone(&store),
        retry,
        transport,
        Box::new(SysfsProbe::default()),
        &config.agent,
    );

    pipeline.report_event(EventCategory::Service, "Monitoring service started");

    if args.once {
        mon.tick(&pipeline).await;
        println!("Single tick complete");
    } else {
        // Set up signal handler for graceful shutdown
        let running = Arc::new(AtomicBool::new(false));
        let r = running.clone();

        ctrlc::set_handler(move || {
            eprintln!("\nShutting down...");
            r.store(true, Ordering::SeqCst);
        })
        .context("failed to set Ctrl+C handler")?;

        println!(
            "Monitoring active (interval {}s). Press Ctrl+C to stop.",
            mon.interval().as_secs()
        );

        mon.run(&pipeline, running).await;
    }

    pipeline.report_event(EventCategory::Service, "Monitoring service stopped");

    // Stop accepting submissions; let in-flight sends drain or time out
    pipeline
        .shutdown()
        .await
        .context("failed to drain send worker")?;

    tracing::info!("logshield-agent shut down");
    Ok(())
}
