//! Retry queue
//!
//! Durable holding area for records that failed transport. Replays are
//! best-effort and time-agnostic: each entry is re-encoded with a current
//! timestamp under the `RETRY` event type, so the collector sees when the
//! record finally arrived, not when the original send failed.

use std::sync::Arc;

use crate::error::Result;
use crate::store::Store;
use crate::syslog::{SyslogEncoder, RETRY_EVENT_TYPE};
use crate::transport::Transport;
use crate::types::ServerDestination;

/// Result of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Bounded durable queue of failed records.
pub struct RetryQueue {
    store: Arc<Store>,
    encoder: SyslogEncoder,
}

impl RetryQueue {
    pub fn new(store: Arc<Store>, encoder: SyslogEncoder) -> Self {
        Self { store, encoder }
    }

    /// Record a failed send for later replay. Bounded; oldest entries are
    /// evicted beyond the cap. Entries are not deduplicated.
    pub fn enqueue(&self, event_type: &str, message: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.store.enqueue_pending(event_type, message, now)?;
        tracing::debug!(event_type, "Stored record for retry");
        Ok(())
    }

    /// Current queue depth.
    pub fn len(&self) -> Result<usize> {
        self.store.pending_count()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replay the pending set against the given destination.
    ///
    /// Snapshots the current entries, attempts each, then removes exactly the
    /// entries that sent (by id). Entries enqueued concurrently while the
    /// flush runs are never touched.
    pub async fn flush(
        &self,
        dest: &ServerDestination,
        transport: &dyn Transport,
    ) -> Result<FlushOutcome> {
        let entries = self.store.pending_entries()?;
        if entries.is_empty() {
            return Ok(FlushOutcome::default());
        }

        tracing::debug!(pending = entries.len(), %dest, "Replaying pending records");

        let mut sent_ids = Vec::new();
        let mut outcome = FlushOutcome::default();

        for entry in &entries {
            let record = self
                .encoder
                .encode(RETRY_EVENT_TYPE, &entry.message, chrono::Utc::now());

            match transport.send(dest, record.as_bytes()).await {
                Ok(()) => {
                    sent_ids.push(entry.id);
                    outcome.sent += 1;
                }
                Err(e) => {
                    tracing::debug!(
                        event_type = %entry.event_type,
                        error = %e,
                        "Replay attempt failed, keeping entry"
                    );
                    outcome.failed += 1;
                }
            }
        }

        if !sent_ids.is_empty() {
            self.store.remove_pending(&sent_ids)?;
        }

        tracing::info!(sent = outcome.sent, failed = outcome.failed, "Retry flush complete");
        Ok(outcome)
    }
}
