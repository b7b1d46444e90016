//! Integration tests for the logshield forwarding pipeline
//!
//! These run the real pipeline against a loopback UDP receiver and a
//! temporary on-disk database to verify the end-to-end capture, persist,
//! forward, and replay flow.

use std::sync::Arc;
use std::time::Duration;

use logshield_core::config::AgentConfig;
use logshield_core::monitor::{self, DeviceProbe, Monitor};
use logshield_core::syslog::{parse_record, SyslogEncoder};
use logshield_core::{
    BatteryReading, ConfigResolver, EventCategory, ForegroundApp, ForwardingPipeline,
    NetworkReading, RetryQueue, Store, Transport, UdpTransport,
};
use tempfile::TempDir;
use tokio::net::UdpSocket;

/// A loopback collector endpoint.
struct Collector {
    socket: UdpSocket,
    port: u16,
}

impl Collector {
    async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        Self { socket, port }
    }

    async fn recv(&self) -> String {
        let mut buf = [0u8; 2048];
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), self.socket.recv_from(&mut buf))
            .await
            .expect("expected a datagram")
            .unwrap();
        String::from_utf8_lossy(&buf[..len]).to_string()
    }

    async fn expect_silence(&self) {
        let mut buf = [0u8; 2048];
        let result =
            tokio::time::timeout(Duration::from_millis(300), self.socket.recv_from(&mut buf)).await;
        assert!(result.is_err(), "expected no datagram, got one");
    }
}

fn open_store(dir: &TempDir) -> Arc<Store> {
    let store = Store::open(&dir.path().join("agent.db")).unwrap();
    store.migrate().unwrap();
    Arc::new(store)
}

fn spawn_pipeline(store: &Arc<Store>) -> ForwardingPipeline {
    let retry = Arc::new(RetryQueue::new(Arc::clone(store), SyslogEncoder::default()));
    ForwardingPipeline::spawn(
        Arc::clone(store),
        ConfigResolver::new(Arc::clone(store)),
        SyslogEncoder::default(),
        Arc::new(UdpTransport::default()),
        retry,
    )
}

#[tokio::test]
async fn test_report_event_reaches_collector() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let collector = Collector::bind().await;

    let resolver = ConfigResolver::new(Arc::clone(&store));
    resolver
        .set_destination(&format!("127.0.0.1:{}", collector.port))
        .unwrap();

    let pipeline = spawn_pipeline(&store);
    pipeline.report_event(EventCategory::App, "Application INSTALLED: Foo (com.foo)");

    let record = collector.recv().await;
    let parsed = parse_record(&record).unwrap();
    assert_eq!(parsed.event_type, "APP_EVENT");
    assert_eq!(parsed.message, "Application INSTALLED: Foo (com.foo)");
    assert!(record.starts_with("<13>"));

    // Also retained locally
    assert_eq!(store.event_count(EventCategory::App).unwrap(), 1);

    pipeline.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unconfigured_agent_stores_but_stays_silent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let collector = Collector::bind().await;

    let pipeline = spawn_pipeline(&store);
    pipeline.report_event(EventCategory::Screen, "Screen: SCREEN_ON");
    pipeline.shutdown().await.unwrap();

    collector.expect_silence().await;
    assert_eq!(store.event_count(EventCategory::Screen).unwrap(), 1);
    // Absent config is not a send failure: nothing queued for retry
    assert_eq!(store.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn test_retry_replay_drains_into_collector() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let collector = Collector::bind().await;

    let retry = RetryQueue::new(Arc::clone(&store), SyslogEncoder::default());
    retry.enqueue("POWER_EVENT", "Power: POWER_DISCONNECTED (47%)").unwrap();
    retry.enqueue("SCREEN_EVENT", "Screen: SCREEN_OFF").unwrap();

    let dest = logshield_core::ServerDestination {
        host: "127.0.0.1".to_string(),
        port: collector.port,
    };
    let transport = UdpTransport::default();
    let outcome = retry.flush(&dest, &transport).await.unwrap();

    assert_eq!(outcome.sent, 2);
    assert!(retry.is_empty().unwrap());

    for _ in 0..2 {
        let record = collector.recv().await;
        let parsed = parse_record(&record).unwrap();
        assert_eq!(parsed.event_type, "RETRY");
    }
}

struct OneBatteryProbe;

impl DeviceProbe for OneBatteryProbe {
    fn battery(&self) -> logshield_core::Result<Option<BatteryReading>> {
        Ok(Some(BatteryReading { percent: 63, charging: true }))
    }
    fn network(&self) -> logshield_core::Result<Option<NetworkReading>> {
        Ok(None)
    }
    fn foreground_app(&self) -> logshield_core::Result<Option<ForegroundApp>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_monitor_tick_forwards_battery_event() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let collector = Collector::bind().await;

    ConfigResolver::new(Arc::clone(&store))
        .set_destination(&format!("127.0.0.1:{}", collector.port))
        .unwrap();

    let transport: Arc<dyn Transport> = Arc::new(UdpTransport::default());
    let retry = Arc::new(RetryQueue::new(Arc::clone(&store), SyslogEncoder::default()));
    let pipeline = ForwardingPipeline::spawn(
        Arc::clone(&store),
        ConfigResolver::new(Arc::clone(&store)),
        SyslogEncoder::default(),
        Arc::clone(&transport),
        Arc::clone(&retry),
    );
    let mut monitor = Monitor::new(
        Arc::clone(&store),
        retry,
        transport,
        Box::new(OneBatteryProbe),
        &AgentConfig::default(),
    );

    monitor.tick(&pipeline).await;

    let record = collector.recv().await;
    let parsed = parse_record(&record).unwrap();
    assert_eq!(parsed.event_type, "BATTERY_EVENT");
    assert_eq!(parsed.message, "Battery: 63% - Charging");

    pipeline.shutdown().await.unwrap();

    // Tick bookkeeping landed in the status report
    let report = monitor::status_report(&store, 30).unwrap();
    assert_eq!(report.events_processed, 1);
    assert_eq!(report.last_battery_percent, Some(63));
    assert!(report.last_check_ms > 0);
}

#[tokio::test]
async fn test_events_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("agent.db");

    {
        let store = Store::open(&path).unwrap();
        store.migrate().unwrap();
        store
            .append_event(EventCategory::Service, "Monitoring service started", 1_000)
            .unwrap();
        store.enqueue_pending("APP_EVENT", "pending one", 2_000).unwrap();
    }

    let store = Store::open(&path).unwrap();
    store.migrate().unwrap();
    assert_eq!(store.event_count(EventCategory::Service).unwrap(), 1);
    assert_eq!(store.pending_count().unwrap(), 1);
}
