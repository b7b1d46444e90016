//! Forwarding pipeline
//!
//! The single integration point every event source must call. All sends go
//! through one dedicated worker task fed by a bounded inbox, so network I/O
//! never blocks an event source or the monitor loop, and no two sends are
//! ever in flight concurrently. Within the worker, submissions are processed
//! in order.
//!
//! Worker steps per record: resolve destination; if absent, log and drop
//! (no destination is a configuration-absence state, not a transient
//! failure; nothing is queued for retry); else encode and transport; on
//! transport failure, enqueue into the retry queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::resolver::ConfigResolver;
use crate::retry::RetryQueue;
use crate::store::Store;
use crate::syslog::SyslogEncoder;
use crate::transport::Transport;
use crate::types::EventCategory;

/// Inbox bound for the send worker. Event volume is human-scale; records are
/// dropped (with a warning) rather than blocking producers if this fills.
const INBOX_CAPACITY: usize = 256;

struct SendJob {
    event_type: &'static str,
    message: String,
}

/// Fire-and-forget send path shared by every event source.
pub struct ForwardingPipeline {
    tx: mpsc::Sender<SendJob>,
    store: Arc<Store>,
    worker: JoinHandle<()>,
}

impl ForwardingPipeline {
    /// Spawn the send worker and return the pipeline handle.
    pub fn spawn(
        store: Arc<Store>,
        resolver: ConfigResolver,
        encoder: SyslogEncoder,
        transport: Arc<dyn Transport>,
        retry: Arc<RetryQueue>,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<SendJob>(INBOX_CAPACITY);

        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                process(&resolver, &encoder, transport.as_ref(), &retry, &job).await;
            }
            tracing::debug!("Send worker drained, exiting");
        });

        Self { tx, store, worker }
    }

    /// Capture an event: append to the local store, then forward.
    ///
    /// Local storage is best-effort, not authoritative; a failed write is
    /// logged and the forward still happens.
    pub fn report_event(&self, category: EventCategory, payload: &str) {
        let now = chrono::Utc::now().timestamp_millis();
        if let Err(e) = self.store.append_event(category, payload, now) {
            tracing::error!(%category, error = %e, "Failed to store event locally");
        }
        self.send_now(category.event_type(), payload.to_string());
    }

    /// Submit one record for background sending. Never blocks and never
    /// fails from the caller's perspective.
    pub fn send_now(&self, event_type: &'static str, message: String) {
        match self.tx.try_send(SendJob { event_type, message }) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                tracing::warn!(event_type = job.event_type, "Send inbox full, dropping record");
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                tracing::warn!(event_type = job.event_type, "Send worker stopped, dropping record");
            }
        }
    }

    /// Stop accepting submissions and let in-flight sends drain or time out.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.tx);
        self.worker
            .await
            .map_err(|e| crate::error::Error::Pipeline(format!("worker join failed: {}", e)))
    }
}

async fn process(
    resolver: &ConfigResolver,
    encoder: &SyslogEncoder,
    transport: &dyn Transport,
    retry: &RetryQueue,
    job: &SendJob,
) {
    let Some(dest) = resolver.resolve_destination() else {
        tracing::info!(
            event_type = job.event_type,
            "No destination configured, skipping send"
        );
        return;
    };

    let record = encoder.encode(job.event_type, &job.message, chrono::Utc::now());

    match transport.send(&dest, record.as_bytes()).await {
        Ok(()) => {
            tracing::debug!(event_type = job.event_type, %dest, "Forwarded record");
        }
        Err(e) => {
            tracing::warn!(event_type = job.event_type, %dest, error = %e, "Send failed, queueing for retry");
            if let Err(e) = retry.enqueue(job.event_type, &job.message) {
                tracing::error!(error = %e, "Failed to queue record for retry");
            }
        }
    }
}
