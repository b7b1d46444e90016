//! Destination resolution
//!
//! The forwarding destination may live in more than one settings slot: the
//! agent's own slot, the monitor loop's legacy slot, and the slot a host UI
//! writes through its bridge. Rather than scattering fallback reads per call
//! site, the ordered candidate list is one explicit design parameter here,
//! and the first non-empty slot wins.

use std::sync::Arc;

use crate::store::Store;
use crate::types::ServerDestination;

/// Default candidate slots, highest priority first. The first entry is also
/// the canonical write target for [`ConfigResolver::set_destination`].
pub const DEFAULT_CANDIDATES: &[(&str, &str)] = &[
    ("agent", "server_url"),
    ("monitor", "server_url"),
    ("ui", "server_url"),
];

/// Resolves the single active forwarding destination.
pub struct ConfigResolver {
    store: Arc<Store>,
    candidates: Vec<(String, String)>,
}

impl ConfigResolver {
    /// Resolver over the default candidate list.
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_candidates(
            store,
            DEFAULT_CANDIDATES
                .iter()
                .map(|(ns, k)| (ns.to_string(), k.to_string()))
                .collect(),
        )
    }

    /// Resolver over an explicit ordered candidate list.
    pub fn with_candidates(store: Arc<Store>, candidates: Vec<(String, String)>) -> Self {
        Self { store, candidates }
    }

    /// Return the first non-empty candidate value, parsed.
    ///
    /// An absent result is a normal outcome ("not yet configured"), not an
    /// error. Slots holding an unparsable port still resolve, falling back to
    /// the default port. Storage read errors are logged and treated as an
    /// empty slot.
    pub fn resolve_destination(&self) -> Option<ServerDestination> {
        for (namespace, key) in &self.candidates {
            let raw = match self.store.get_setting(namespace, key) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(namespace, key, error = %e, "Failed to read destination slot");
                    continue;
                }
            };

            if let Some(raw) = raw {
                if let Some(dest) = ServerDestination::parse(&raw) {
                    tracing::debug!(namespace, key, %dest, "Resolved destination");
                    return Some(dest);
                }
            }
        }

        tracing::debug!("No destination configured in any candidate slot");
        None
    }

    /// Write a destination string to the canonical slot (the first
    /// candidate). The value is stored cleaned: schemes stripped, trimmed.
    pub fn set_destination(&self, raw: &str) -> crate::error::Result<()> {
        let (namespace, key) = self
            .candidates
            .first()
            .map(|(ns, k)| (ns.as_str(), k.as_str()))
            .unwrap_or(DEFAULT_CANDIDATES[0]);

        let cleaned = raw
            .trim()
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim()
            .to_string();

        tracing::info!(namespace, key, value = %cleaned, "Saving destination");
        self.store.set_setting(namespace, key, &cleaned)
    }
}
