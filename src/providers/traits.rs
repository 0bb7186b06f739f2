//! Provider traits and types

use crate::query::Query;
use crate::results::Item;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Latency tier a provider declares itself into.
///
/// Each tier has its own timeout and concurrency budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueAffinity {
    /// Fast local sources searched on every keystroke
    #[default]
    Default,
    /// Slower sources (network lookups, heavyweight indexes)
    Fallback,
}

/// One batch of items yielded by a provider
pub type ItemBatch = Vec<Item>;

/// A finite, non-restartable sequence of item batches.
///
/// Batches are forwarded to the aggregator as they arrive; a provider that
/// yields an `Err` settles as failed and the rest of its stream is dropped.
pub type BatchStream = BoxStream<'static, anyhow::Result<ItemBatch>>;

/// Main trait that all search providers must implement
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Unique provider id
    fn id(&self) -> &str;

    /// Declared latency tier
    fn queue_affinity(&self) -> QueueAffinity {
        QueueAffinity::Default
    }

    /// Admission precedence within the tier (higher is admitted earlier)
    fn priority(&self) -> i32 {
        0
    }

    /// Execute a search, returning a stream of item batches.
    ///
    /// The cancellation token is cooperative: the engine stops awaiting the
    /// call on cancellation or timeout, but never forcibly terminates it, so
    /// well-behaved providers should observe the token to stop promptly.
    async fn on_search(
        &self,
        query: Query,
        cancel: CancellationToken,
    ) -> anyhow::Result<BatchStream>;

    /// Best-effort maintenance hook (cache warming etc.).
    ///
    /// Failures are logged by the engine and never propagate.
    async fn maintain(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Wrap a single ready batch as a [`BatchStream`]
pub fn single_batch(items: ItemBatch) -> BatchStream {
    stream::once(async move { Ok(items) }).boxed()
}

/// Wrap several ready batches as a [`BatchStream`]
pub fn batches(batches: Vec<ItemBatch>) -> BatchStream {
    stream::iter(batches.into_iter().map(Ok)).boxed()
}
