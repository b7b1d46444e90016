//! # logshield-core
//!
//! Core library for logshield - a lightweight on-device telemetry agent.
//!
//! The agent observes discrete device events (app install/remove, screen
//! on/off, power and battery transitions, foreground-app changes), persists
//! them in bounded local record sets, and forwards them as syslog-formatted
//! records to a remote log-collection endpoint over UDP. Delivery is
//! best-effort: failed sends land in a durable retry queue that the monitor
//! loop replays.
//!
//! ## Architecture
//!
//! One send path. Event sources call [`ForwardingPipeline::report_event`];
//! the pipeline appends to the bounded [`Store`], resolves the destination
//! through [`ConfigResolver`], encodes with [`SyslogEncoder`], and transmits
//! via [`UdpTransport`] on a dedicated single-worker task. Transport
//! failures are enqueued into the [`RetryQueue`]; the periodic [`Monitor`]
//! diffs device state, emits derived events through the same pipeline, and
//! flushes the retry queue each tick.
//!
//! ## Example
//!
//! ```rust,no_run
//! use logshield_core::{Config, Store};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open the local database
//! let store = Store::open(&Config::database_path()).expect("failed to open store");
//! store.migrate().expect("failed to run migrations");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use monitor::{DeviceProbe, Monitor, MonitorState};
pub use pipeline::ForwardingPipeline;
pub use resolver::ConfigResolver;
pub use retry::RetryQueue;
pub use store::Store;
pub use syslog::SyslogEncoder;
pub use transport::{Transport, UdpTransport};
pub use types::*;

// Public modules
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod store;
pub mod syslog;
pub mod transport;
pub mod types;
