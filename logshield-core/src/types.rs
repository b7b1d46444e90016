//! Core domain types for logshield
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Event** | A discrete observation (state change) the agent captures |
//! | **Destination** | The network host:port records are forwarded to |
//! | **Record** | The wire-format (syslog) encoding of one event |
//! | **Retry queue** | Durable holding area for records that failed transport |
//! | **Tick** | One execution of the periodic monitor loop |

use serde::{Deserialize, Serialize};

/// Default syslog port used when a destination string carries no port.
pub const DEFAULT_PORT: u16 = 1514;

/// Category of a captured device event.
///
/// Categories partition local storage: each has its own bounded record set.
/// Within a category identity is positional; two identical payloads are two
/// distinct events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// App install / uninstall / update
    App,
    /// Screen on / off / unlock
    Screen,
    /// Power connect / disconnect, battery low / okay
    Power,
    /// Network type or connectivity change
    Network,
    /// Battery level report
    Battery,
    /// Foreground application change
    Foreground,
    /// Agent lifecycle (start / stop)
    Service,
}

impl EventCategory {
    /// All categories, in a stable order (used for status summaries).
    pub const ALL: [EventCategory; 7] = [
        EventCategory::App,
        EventCategory::Screen,
        EventCategory::Power,
        EventCategory::Network,
        EventCategory::Battery,
        EventCategory::Foreground,
        EventCategory::Service,
    ];

    /// Storage key for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::App => "app",
            EventCategory::Screen => "screen",
            EventCategory::Power => "power",
            EventCategory::Network => "network",
            EventCategory::Battery => "battery",
            EventCategory::Foreground => "foreground",
            EventCategory::Service => "service",
        }
    }

    /// Wire event type tag placed in forwarded records.
    pub fn event_type(&self) -> &'static str {
        match self {
            EventCategory::App => "APP_EVENT",
            EventCategory::Screen => "SCREEN_EVENT",
            EventCategory::Power => "POWER_EVENT",
            EventCategory::Network => "NETWORK_EVENT",
            EventCategory::Battery => "BATTERY_EVENT",
            EventCategory::Foreground => "FOREGROUND_APP",
            EventCategory::Service => "SERVICE_EVENT",
        }
    }

    /// Maximum number of events retained locally for this category.
    ///
    /// Screen and power events are high-churn and keep a shorter history.
    pub fn retention_cap(&self) -> usize {
        match self {
            EventCategory::Screen | EventCategory::Power => 50,
            _ => 100,
        }
    }

    /// Parse a storage key back into a category.
    pub fn parse(s: &str) -> Option<Self> {
        EventCategory::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured device event. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Capture time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Storage partition
    pub category: EventCategory,
    /// Free-form event payload
    pub payload: String,
}

/// A record that failed transport and is awaiting replay.
///
/// Entries are not deduplicated: repeated identical failures produce repeated
/// entries, up to the queue cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLogEntry {
    /// Storage row id (used to reconcile sent entries after a flush)
    pub id: i64,
    /// Time of the original failed attempt, milliseconds since the epoch
    pub timestamp_ms: i64,
    /// Wire event type of the original record
    pub event_type: String,
    /// Original message body
    pub message: String,
}

/// Resolved forwarding destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDestination {
    pub host: String,
    pub port: u16,
}

impl ServerDestination {
    /// Parse a stored `host[:port]` string into a destination.
    ///
    /// Leading `http://` / `https://` prefixes are stripped and the value is
    /// whitespace-trimmed. A missing or unparsable port falls back to
    /// [`DEFAULT_PORT`]. Returns `None` only for an empty value.
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned = raw
            .trim()
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim();
        if cleaned.is_empty() {
            return None;
        }

        match cleaned.split_once(':') {
            Some((host, port)) => {
                let host = host.trim();
                if host.is_empty() {
                    return None;
                }
                Some(ServerDestination {
                    host: host.to_string(),
                    port: port.trim().parse().unwrap_or(DEFAULT_PORT),
                })
            }
            None => Some(ServerDestination {
                host: cleaned.to_string(),
                port: DEFAULT_PORT,
            }),
        }
    }
}

impl std::fmt::Display for ServerDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Current battery reading from a device probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryReading {
    /// Charge level, 0..=100
    pub percent: i32,
    pub charging: bool,
}

/// Current network reading from a device probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkReading {
    /// Human-readable type ("WiFi", "Ethernet", "Unknown", ...)
    pub network_type: String,
    pub connected: bool,
}

/// Currently focused application, as reported by a device probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundApp {
    /// Display name (falls back to the package name when unknown)
    pub name: String,
    pub package: String,
}

/// Read-only agent summary served to status consumers.
///
/// The core never pushes state; host bridges pull this snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Retained event count per category key
    pub event_counts: Vec<(String, usize)>,
    /// Depth of the retry queue
    pub pending_retries: usize,
    /// Last monitor tick, milliseconds since the epoch (0 = never)
    pub last_check_ms: i64,
    /// Cumulative ticks processed
    pub events_processed: u64,
    /// Current poll interval in seconds
    pub interval_secs: u64,
    /// Last known battery percent, if any tick has reported one
    pub last_battery_percent: Option<i32>,
    /// Last known network type
    pub last_network_type: Option<String>,
    /// Last known foreground package
    pub last_foreground_package: Option<String>,
}
