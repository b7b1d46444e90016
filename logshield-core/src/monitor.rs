//! Periodic monitoring loop
//!
//! One cooperative timer loop drives the agent's derived events: each tick
//! reads device state through a [`DeviceProbe`], diffs it against the last
//! reported values, and emits change events through the forwarding pipeline.
//! This is state-diff emission: a reading that matches the last report
//! produces nothing.
//!
//! Each tick then flushes the retry queue and persists the monitor state.
//! The interval is re-read from the settings store every tick, so the host
//! can reconfigure the cadence without a restart. A failing check never
//! stops the loop; errors are logged and the next tick is always scheduled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::pipeline::ForwardingPipeline;
use crate::resolver::ConfigResolver;
use crate::retry::RetryQueue;
use crate::store::Store;
use crate::transport::Transport;
use crate::types::{
    BatteryReading, EventCategory, ForegroundApp, NetworkReading, StatusReport,
};

/// Battery changes below this many percentage points are not reported...
const BATTERY_DELTA_PERCENT: i32 = 5;
/// ...unless this much time has passed since the last battery report.
const BATTERY_REPORT_INTERVAL_MS: i64 = 5 * 60 * 1000;

/// Settings namespace holding persisted monitor state scalars.
const STATE_NS: &str = "monitor_state";
/// Settings namespace holding the live poll interval.
const MONITOR_NS: &str = "monitor";
/// Live poll interval slot, in seconds.
pub const INTERVAL_KEY: &str = "interval_secs";

/// Reads current device state. Concrete probes are thin adapters outside the
/// core (sysfs readers, OS hooks); a probe returning `Ok(None)` means the
/// reading is unavailable on this device, which is not an error.
pub trait DeviceProbe: Send {
    fn battery(&self) -> Result<Option<BatteryReading>>;
    fn network(&self) -> Result<Option<NetworkReading>>;
    fn foreground_app(&self) -> Result<Option<ForegroundApp>>;
}

/// Last reported values and counters, persisted across restarts.
///
/// Owned by the monitor, mutated only inside ticks, saved explicitly at the
/// end of each tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorState {
    pub last_battery_percent: Option<i32>,
    pub last_battery_report_ms: i64,
    pub last_network_type: Option<String>,
    pub last_network_connected: bool,
    pub last_foreground_package: Option<String>,
    pub last_check_ms: i64,
    pub events_processed: u64,
}

impl MonitorState {
    /// Load persisted state, falling back to defaults for missing or
    /// malformed slots.
    pub fn load(store: &Store) -> Self {
        let get = |key: &str| store.get_setting(STATE_NS, key).ok().flatten();

        Self {
            last_battery_percent: get("last_battery_percent").and_then(|v| v.parse().ok()),
            last_battery_report_ms: get("last_battery_report_ms")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            last_network_type: get("last_network_type"),
            last_network_connected: get("last_network_connected")
                .map(|v| v == "true")
                .unwrap_or(false),
            last_foreground_package: get("last_foreground_package"),
            last_check_ms: get("last_check_ms").and_then(|v| v.parse().ok()).unwrap_or(0),
            events_processed: get("events_processed").and_then(|v| v.parse().ok()).unwrap_or(0),
        }
    }

    /// Persist the state scalars.
    pub fn save(&self, store: &Store) -> Result<()> {
        if let Some(p) = self.last_battery_percent {
            store.set_setting(STATE_NS, "last_battery_percent", &p.to_string())?;
        }
        store.set_setting(
            STATE_NS,
            "last_battery_report_ms",
            &self.last_battery_report_ms.to_string(),
        )?;
        if let Some(t) = &self.last_network_type {
            store.set_setting(STATE_NS, "last_network_type", t)?;
        }
        store.set_setting(
            STATE_NS,
            "last_network_connected",
            if self.last_network_connected { "true" } else { "false" },
        )?;
        if let Some(p) = &self.last_foreground_package {
            store.set_setting(STATE_NS, "last_foreground_package", p)?;
        }
        store.set_setting(STATE_NS, "last_check_ms", &self.last_check_ms.to_string())?;
        store.set_setting(STATE_NS, "events_processed", &self.events_processed.to_string())?;
        Ok(())
    }
}

/// The periodic scheduler.
pub struct Monitor {
    store: Arc<Store>,
    resolver: ConfigResolver,
    retry: Arc<RetryQueue>,
    transport: Arc<dyn Transport>,
    probe: Box<dyn DeviceProbe>,
    default_interval_secs: u64,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        store: Arc<Store>,
        retry: Arc<RetryQueue>,
        transport: Arc<dyn Transport>,
        probe: Box<dyn DeviceProbe>,
        agent_config: &AgentConfig,
    ) -> Self {
        let state = MonitorState::load(&store);
        let resolver = ConfigResolver::new(Arc::clone(&store));
        Self {
            store,
            resolver,
            retry,
            transport,
            probe,
            default_interval_secs: agent_config.interval_secs,
            state,
        }
    }

    /// Current poll interval, read fresh from the settings store.
    pub fn interval(&self) -> Duration {
        let secs = self
            .store
            .get_setting(MONITOR_NS, INTERVAL_KEY)
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.default_interval_secs);
        Duration::from_secs(secs.max(1))
    }

    /// Last reported values (for tests and status assembly).
    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Run ticks until the shutdown flag is set.
    pub async fn run(&mut self, pipeline: &ForwardingPipeline, shutdown: Arc<AtomicBool>) {
        tracing::info!(interval = ?self.interval(), "Monitor loop starting");

        while !shutdown.load(Ordering::Relaxed) {
            self.tick(pipeline).await;

            // Re-read each cycle so a live interval change takes effect on
            // the very next tick
            let interval = self.interval();
            let deadline = tokio::time::Instant::now() + interval;
            while tokio::time::Instant::now() < deadline {
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }

        tracing::info!("Monitor loop stopped");
    }

    /// One tick: state-diff checks, retry flush, state save.
    ///
    /// Total by design: every failure inside is logged and swallowed, so a
    /// bad tick can never stall the loop.
    pub async fn tick(&mut self, pipeline: &ForwardingPipeline) {
        let now = chrono::Utc::now().timestamp_millis();

        if let Err(e) = self.check_battery(pipeline, now) {
            tracing::error!(error = %e, "Battery check failed");
        }
        if let Err(e) = self.check_network(pipeline) {
            tracing::error!(error = %e, "Network check failed");
        }
        if let Err(e) = self.check_foreground(pipeline) {
            tracing::error!(error = %e, "Foreground app check failed");
        }

        self.flush_retries().await;

        self.state.last_check_ms = now;
        self.state.events_processed += 1;
        if let Err(e) = self.state.save(&self.store) {
            tracing::error!(error = %e, "Failed to persist monitor state");
        }
    }

    /// Emit a battery event when the level moved at least
    /// [`BATTERY_DELTA_PERCENT`] points, or when
    /// [`BATTERY_REPORT_INTERVAL_MS`] has passed since the last report.
    fn check_battery(&mut self, pipeline: &ForwardingPipeline, now: i64) -> Result<()> {
        let Some(reading) = self.probe.battery()? else {
            return Ok(());
        };

        let delta = self
            .state
            .last_battery_percent
            .map(|last| (last - reading.percent).abs())
            .unwrap_or(i32::MAX);
        let elapsed = now - self.state.last_battery_report_ms;

        if delta >= BATTERY_DELTA_PERCENT || elapsed > BATTERY_REPORT_INTERVAL_MS {
            let message = format!(
                "Battery: {}% - {}",
                reading.percent,
                if reading.charging { "Charging" } else { "Discharging" }
            );
            pipeline.report_event(EventCategory::Battery, &message);
            self.state.last_battery_percent = Some(reading.percent);
            self.state.last_battery_report_ms = now;
        }

        Ok(())
    }

    /// Emit a network event when the type or connectivity flag changed.
    fn check_network(&mut self, pipeline: &ForwardingPipeline) -> Result<()> {
        let Some(reading) = self.probe.network()? else {
            return Ok(());
        };

        let changed = self.state.last_network_type.as_deref() != Some(reading.network_type.as_str())
            || self.state.last_network_connected != reading.connected;

        if changed {
            let message = format!(
                "Network changed to: {} (Connected: {})",
                reading.network_type, reading.connected
            );
            pipeline.report_event(EventCategory::Network, &message);
            self.state.last_network_type = Some(reading.network_type);
            self.state.last_network_connected = reading.connected;
        }

        Ok(())
    }

    /// Emit a foreground event when the focused package changed.
    fn check_foreground(&mut self, pipeline: &ForwardingPipeline) -> Result<()> {
        let Some(app) = self.probe.foreground_app()? else {
            return Ok(());
        };

        if self.state.last_foreground_package.as_deref() != Some(app.package.as_str()) {
            let message = format!("App in foreground: {} ({})", app.name, app.package);
            pipeline.report_event(EventCategory::Foreground, &message);
            self.state.last_foreground_package = Some(app.package);
        }

        Ok(())
    }

    /// Replay the retry queue if a destination is configured.
    async fn flush_retries(&self) {
        let Some(dest) = self.resolver.resolve_destination() else {
            tracing::debug!("No destination configured, skipping retry flush");
            return;
        };

        match self.retry.flush(&dest, self.transport.as_ref()).await {
            Ok(outcome) if outcome.sent > 0 || outcome.failed > 0 => {
                tracing::info!(sent = outcome.sent, failed = outcome.failed, "Retry flush");
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Retry flush failed"),
        }
    }
}

/// Assemble the read-only summary served to status consumers.
pub fn status_report(store: &Store, default_interval_secs: u64) -> Result<StatusReport> {
    let state = MonitorState::load(store);
    let interval_secs = store
        .get_setting(MONITOR_NS, INTERVAL_KEY)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(default_interval_secs);

    Ok(StatusReport {
        event_counts: store.event_counts()?,
        pending_retries: store.pending_count()?,
        last_check_ms: state.last_check_ms,
        events_processed: state.events_processed,
        interval_secs,
        last_battery_percent: state.last_battery_percent,
        last_network_type: state.last_network_type,
        last_foreground_package: state.last_foreground_package,
    })
}

/// Write the live poll interval slot.
pub fn set_interval(store: &Store, secs: u64) -> Result<()> {
    store.set_setting(MONITOR_NS, INTERVAL_KEY, &secs.to_string())
}

/// The "clear data" operation: retained events and monitor state are
/// dropped and the interval slot reset. Configured destination slots are
/// kept.
pub fn clear_monitoring_data(store: &Store) -> Result<()> {
    store.clear_events()?;
    store.clear_namespace(STATE_NS)?;
    store.delete_setting(MONITOR_NS, INTERVAL_KEY)?;
    Ok(())
}
