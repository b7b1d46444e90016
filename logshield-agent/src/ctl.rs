//! logshield-ctl - host-bridge CLI for the telemetry agent
//!
//! The pull-only surface a host UI talks to: status summaries, destination
//! writes, interval changes, test records, and the clear-data operation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chrono::{TimeZone, Utc};
use logshield_core::monitor;
use logshield_core::{
    Config, ConfigResolver, ForwardingPipeline, RetryQueue, Store, SyslogEncoder, Transport,
    UdpTransport,
};

#[derive(Parser)]
#[command(name = "logshield-ctl")]
#[command(about = "Inspect and configure the logshield telemetry agent")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show agent status: event counts, counters, last known values
    Status {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the forwarding destination (host or host:port) and send a
    /// confirmation record
    SetServer { url: String },
    /// Set the live poll interval in seconds
    SetInterval { seconds: u64 },
    /// Send a test record to the configured destination
    Test,
    /// Clear retained events and monitor state (keeps the destination)
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();
    let config = Config::load().context("failed to load configuration")?;

    let store = Arc::new(Store::open(&Config::database_path()).context("failed to open store")?);
    store.migrate().context("failed to run database migrations")?;

    match args.command {
        Command::Status { json } => {
            let report = monitor::status_report(&store, config.agent.interval_secs)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let resolver = ConfigResolver::new(Arc::clone(&store));
                match resolver.resolve_destination() {
                    Some(dest) => println!("Destination:      {}", dest),
                    None => println!("Destination:      (not configured)"),
                }
                println!("Poll interval:    {}s", report.interval_secs);
                println!("Last check:       {}", format_ms(report.last_check_ms));
                println!("Ticks processed:  {}", report.events_processed);
                println!("Pending retries:  {}", report.pending_retries);
                println!("Retained events:");
                for (category, count) in &report.event_counts {
                    println!("  {:<12} {}", category, count);
                }
                if let Some(pct) = report.last_battery_percent {
                    println!("Last battery:     {}%", pct);
                }
                if let Some(net) = &report.last_network_type {
                    println!("Last network:     {}", net);
                }
                if let Some(app) = &report.last_foreground_package {
                    println!("Last foreground:  {}", app);
                }
            }
        }
        Command::SetServer { url } => {
            let resolver = ConfigResolver::new(Arc::clone(&store));
            resolver.set_destination(&url).context("failed to save destination")?;
            match resolver.resolve_destination() {
                Some(dest) => println!("Destination saved: {}", dest),
                None => anyhow::bail!("destination '{}' is empty after cleanup", url),
            }

            // Confirm the new destination end to end
            send_one_shot(&store, &config, "CONFIG_TEST", "Server URL saved successfully").await?;
        }
        Command::SetInterval { seconds } => {
            monitor::set_interval(&store, seconds).context("failed to set interval")?;
            println!("Poll interval set to {}s", seconds);
        }
        Command::Test => {
            let resolver = ConfigResolver::new(Arc::clone(&store));
            if resolver.resolve_destination().is_none() {
                anyhow::bail!("cannot test: no destination configured");
            }
            let message = format!("Test message at {}", Utc::now().to_rfc3339());
            send_one_shot(&store, &config, "CONNECTION_TEST", &message).await?;
            println!("Test record submitted");
        }
        Command::Clear => {
            monitor::clear_monitoring_data(&store).context("failed to clear data")?;
            println!("Monitoring data cleared");
        }
    }

    Ok(())
}

/// Run one record through the real pipeline and drain it.
async fn send_one_shot(
    store: &Arc<Store>,
    config: &Config,
    event_type: &'static str,
    message: &str,
) -> Result<()> {
    let encoder = SyslogEncoder::new(config.agent.device_tag.clone());
    let transport: Arc<dyn Transport> = Arc::new(UdpTransport::new(Duration::from_secs(
        config.transport.send_timeout_secs,
    )));
    let retry = Arc::new(RetryQueue::new(Arc::clone(store), encoder.clone()));

    let pipeline = ForwardingPipeline::spawn(
        Arc::clone(store),
        ConfigResolver::new(Arc::clone(store)),
        encoder,
        transport,
        retry,
    );
    pipeline.send_now(event_type, message.to_string());
    pipeline.shutdown().await.context("failed to drain send")?;
    Ok(())
}

fn format_ms(ms: i64) -> String {
    if ms == 0 {
        return "never".to_string();
    }
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}
