//! Search engine facade: provider registration, session start, maintenance

use super::classifier::classify;
use super::session::{run_session, GatherController, SearchHandle};
use super::tier::{spawn_tier, TierConfig};
use crate::config::Settings;
use crate::error::SearchError;
use crate::providers::{ProviderRegistry, QueueAffinity, SearchProvider};
use crate::query::Query;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The public search engine surface.
///
/// Constructed explicitly with injected settings; hold one instance and
/// share it (cheaply clonable) wherever searches are started. Each call to
/// [`search`](Self::search) creates one isolated session; concurrent
/// sessions share no mutable state, and superseding a stale session is the
/// caller's responsibility.
#[derive(Clone)]
pub struct SearchEngine {
    settings: Settings,
    registry: ProviderRegistry,
}

impl SearchEngine {
    /// Create an engine with validated settings
    pub fn new(settings: Settings) -> Result<Self, SearchError> {
        settings.validate()?;
        Ok(Self {
            settings,
            registry: ProviderRegistry::new(),
        })
    }

    /// Create an engine with default settings
    pub fn with_defaults() -> Self {
        Self {
            settings: Settings::default(),
            registry: ProviderRegistry::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Register a provider; last registration per id wins
    pub fn register_provider(&self, provider: Arc<dyn SearchProvider>) -> Result<(), SearchError> {
        self.registry.register(provider)
    }

    /// Unregister a provider; sessions still awaiting it settle it as an
    /// immediate provider error
    pub fn unregister_provider(&self, id: &str) -> bool {
        self.registry.unregister(id)
    }

    /// Start one search session.
    ///
    /// Buckets eligible providers into tiers, spawns the tier worker pools
    /// and the session control task, and returns the update stream plus
    /// controller. Fails synchronously on invalid configuration, before any
    /// session work starts.
    pub fn search(&self, query: Query) -> Result<SearchHandle, SearchError> {
        self.settings.validate()?;

        let mut query = query;
        query.text = query.text.trim().to_string();

        let session_id = Uuid::new_v4();
        let classified = classify(&self.registry, &query);
        let total = classified.total();

        info!(
            "Executing search '{}' on {} providers (session {})",
            query.text, total, session_id
        );

        let cancel = CancellationToken::new();
        let (msg_tx, msg_rx) = mpsc::channel((total * 2).max(8));
        let (update_tx, update_rx) = mpsc::channel(self.settings.update_channel_capacity);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let provider_order = classified.provider_order();

        spawn_tier(
            classified.default_tier,
            TierConfig::from_settings(&self.settings, QueueAffinity::Default),
            query.clone(),
            cancel.clone(),
            msg_tx.clone(),
        );
        spawn_tier(
            classified.fallback_tier,
            TierConfig::from_settings(&self.settings, QueueAffinity::Fallback),
            query,
            cancel.clone(),
            msg_tx,
        );

        tokio::spawn(run_session(
            session_id,
            total,
            provider_order,
            self.settings.force_push_delay(),
            msg_rx,
            update_tx,
            outcome_tx,
            cancel.clone(),
        ));

        Ok(SearchHandle::new(
            GatherController::new(session_id, cancel),
            update_rx,
            outcome_rx,
        ))
    }

    /// Run every provider's maintenance hook concurrently.
    ///
    /// Best-effort: failures are logged and never propagate.
    pub async fn maintain(&self) {
        let entries = self.registry.snapshot();
        debug!("Running maintenance across {} providers", entries.len());

        let tasks = entries.into_iter().map(|entry| async move {
            if let Err(error) = entry.provider.maintain().await {
                warn!("Provider '{}' maintenance failed: {:#}", entry.id(), error);
            }
        });
        join_all(tasks).await;
    }
}
