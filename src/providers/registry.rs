//! Provider registry for managing available search providers

use super::traits::{QueueAffinity, SearchProvider};
use crate::error::SearchError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One registration of a provider.
///
/// Sessions snapshot entries at start; `revoked` fires when the registration
/// is removed or overwritten, so an in-flight call against a dead
/// registration settles as an immediate provider error.
pub struct ProviderEntry {
    pub provider: Arc<dyn SearchProvider>,
    /// Monotonic registration sequence; defines registration order
    pub seq: u64,
    pub revoked: CancellationToken,
}

impl ProviderEntry {
    pub fn id(&self) -> &str {
        self.provider.id()
    }
}

struct RegistryInner {
    entries: HashMap<String, Arc<ProviderEntry>>,
    next_seq: u64,
}

/// Registry of all available search providers.
///
/// Clonable shared handle; mutated only through [`register`](Self::register)
/// and [`unregister`](Self::unregister).
#[derive(Clone)]
pub struct ProviderRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner {
                entries: HashMap::new(),
                next_seq: 0,
            })),
        }
    }

    /// Register a provider.
    ///
    /// Inserts or overwrites by id; last registration wins. Overwriting
    /// revokes the previous registration, settling any session still
    /// awaiting it as a provider error.
    pub fn register(&self, provider: Arc<dyn SearchProvider>) -> Result<(), SearchError> {
        let id = provider.id().to_string();
        if id.trim().is_empty() {
            return Err(SearchError::configuration("provider id must not be empty"));
        }

        let mut inner = self.inner.write().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let entry = Arc::new(ProviderEntry {
            provider,
            seq,
            revoked: CancellationToken::new(),
        });

        if let Some(previous) = inner.entries.insert(id.clone(), entry) {
            previous.revoked.cancel();
            info!("Search provider '{}' re-registered", id);
        } else {
            info!("Search provider '{}' registered", id);
        }
        Ok(())
    }

    /// Unregister a provider by id.
    ///
    /// Any session still awaiting that provider treats it as an immediate
    /// provider error rather than leaving the slot unresolved.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.inner.write().unwrap().entries.remove(id);
        match removed {
            Some(entry) => {
                entry.revoked.cancel();
                info!("Search provider '{}' unregistered", id);
                true
            }
            None => {
                warn!("Search provider '{}' is not registered", id);
                false
            }
        }
    }

    /// Get a provider entry by id
    pub fn get(&self, id: &str) -> Option<Arc<ProviderEntry>> {
        self.inner.read().unwrap().entries.get(id).cloned()
    }

    /// Check if a provider is registered
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().unwrap().entries.contains_key(id)
    }

    /// Get number of registered providers
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().entries.is_empty()
    }

    /// All registered provider ids, in registration order
    pub fn ids(&self) -> Vec<String> {
        let mut entries = self.snapshot();
        entries.sort_by_key(|e| e.seq);
        entries.iter().map(|e| e.id().to_string()).collect()
    }

    /// Snapshot of every current registration, unordered
    pub fn snapshot(&self) -> Vec<Arc<ProviderEntry>> {
        self.inner.read().unwrap().entries.values().cloned().collect()
    }

    /// Providers declaring the given tier, in registration order.
    ///
    /// Registration order is the deterministic tie-break used by the
    /// aggregator's ranking comparator.
    pub fn snapshot_by_queue(&self, tier: QueueAffinity) -> Vec<Arc<ProviderEntry>> {
        let mut entries: Vec<_> = self
            .inner
            .read()
            .unwrap()
            .entries
            .values()
            .filter(|e| e.provider.queue_affinity() == tier)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.seq);
        entries
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
