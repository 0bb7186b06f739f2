//! Queue classification: buckets eligible providers into latency tiers

use crate::providers::{ProviderEntry, ProviderRegistry, QueueAffinity};
use crate::query::Query;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The two per-session provider lists, fixed for the life of the session.
pub struct ClassifiedProviders {
    pub default_tier: Vec<Arc<ProviderEntry>>,
    pub fallback_tier: Vec<Arc<ProviderEntry>>,
}

impl ClassifiedProviders {
    pub fn total(&self) -> usize {
        self.default_tier.len() + self.fallback_tier.len()
    }

    /// Provider id -> registration sequence, for the aggregator's tie-break
    pub fn provider_order(&self) -> HashMap<String, u64> {
        self.default_tier
            .iter()
            .chain(self.fallback_tier.iter())
            .map(|e| (e.id().to_string(), e.seq))
            .collect()
    }
}

/// Partition the registry's eligible providers by declared queue affinity.
///
/// A query's provider filter restricts eligibility in both tiers. Each tier
/// keeps registration order, stably reordered by declared priority (higher
/// admitted earlier). A query with `skip_fallback` drops the fallback tier
/// entirely.
pub fn classify(registry: &ProviderRegistry, query: &Query) -> ClassifiedProviders {
    let mut default_tier = registry.snapshot_by_queue(QueueAffinity::Default);
    let mut fallback_tier = if query.skip_fallback {
        Vec::new()
    } else {
        registry.snapshot_by_queue(QueueAffinity::Fallback)
    };

    if query.provider_filter.is_some() {
        default_tier.retain(|e| query.matches_provider(e.id()));
        fallback_tier.retain(|e| query.matches_provider(e.id()));
    }

    default_tier.sort_by_key(|e| std::cmp::Reverse(e.provider.priority()));
    fallback_tier.sort_by_key(|e| std::cmp::Reverse(e.provider.priority()));

    debug!(
        "Classified providers: {} default, {} fallback{}",
        default_tier.len(),
        fallback_tier.len(),
        if query.skip_fallback { " (fallback skipped)" } else { "" }
    );

    ClassifiedProviders {
        default_tier,
        fallback_tier,
    }
}
