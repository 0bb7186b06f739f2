//! Per-tier admission control and timeout governance
//!
//! Each tier runs a bounded FIFO worker pool: at most `concurrency` provider
//! calls are in flight, and every admitted call is raced against the tier's
//! timeout. Results are forwarded to the session's control task as they
//! arrive.

use crate::config::Settings;
use crate::providers::{ItemBatch, ProviderEntry, QueueAffinity};
use crate::query::Query;
use crate::results::{SourceStat, SourceStatus};
use chrono::Utc;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Message from a tier worker to the session control task
pub(crate) enum SessionMsg {
    /// One forwarded item batch from an in-flight provider
    Batch {
        provider_id: String,
        items: ItemBatch,
    },
    /// A provider settled, timed out or errored
    Settled { stat: SourceStat },
}

/// One tier's admission budget
#[derive(Debug, Clone)]
pub struct TierConfig {
    pub queue: QueueAffinity,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl TierConfig {
    pub fn from_settings(settings: &Settings, queue: QueueAffinity) -> Self {
        match queue {
            QueueAffinity::Default => Self {
                queue,
                timeout: settings.timeout.default_tier(),
                concurrency: settings.concurrent.default_providers,
            },
            QueueAffinity::Fallback => Self {
                queue,
                timeout: settings.timeout.fallback_tier(),
                concurrency: settings.concurrent.fallback_providers,
            },
        }
    }
}

/// Spawn the worker pool for one tier.
///
/// Admission is FIFO over `entries`; completion order is unconstrained.
pub(crate) fn spawn_tier(
    entries: Vec<Arc<ProviderEntry>>,
    config: TierConfig,
    query: Query,
    cancel: CancellationToken,
    tx: mpsc::Sender<SessionMsg>,
) {
    if entries.is_empty() {
        return;
    }

    let workers = config.concurrency.min(entries.len());
    let queue = Arc::new(Mutex::new(entries.into_iter().collect::<VecDeque<_>>()));

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let config = config.clone();
        let query = query.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    return;
                }
                let entry = queue.lock().unwrap().pop_front();
                let Some(entry) = entry else { return };
                run_provider(entry, &config, query.clone(), &cancel, &tx).await;
            }
        });
    }
}

/// Run one admitted provider call, racing it against the tier timeout, the
/// session's cancellation token and the registration's revocation token.
async fn run_provider(
    entry: Arc<ProviderEntry>,
    config: &TierConfig,
    query: Query,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<SessionMsg>,
) {
    let provider_id = entry.id().to_string();
    let started_at = Utc::now();
    let mut item_count = 0usize;

    let status = if entry.revoked.is_cancelled() {
        // Unregistered while waiting in the admission queue
        warn!("Provider '{}' unregistered before admission", provider_id);
        SourceStatus::Error
    } else {
        debug!(
            "Searching provider '{}' with timeout {:?}",
            provider_id, config.timeout
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Session cancelled: the call is abandoned and no stat recorded
                return;
            }
            _ = entry.revoked.cancelled() => {
                warn!("Provider '{}' unregistered mid-call", provider_id);
                SourceStatus::Error
            }
            outcome = timeout(
                config.timeout,
                drain_provider(&entry, query, cancel.clone(), tx, &provider_id, &mut item_count),
            ) => {
                match outcome {
                    Ok(Ok(())) => {
                        debug!("Provider '{}' returned {} items", provider_id, item_count);
                        SourceStatus::Ok
                    }
                    Ok(Err(error)) => {
                        warn!("Provider '{}' failed: {:#}", provider_id, error);
                        SourceStatus::Error
                    }
                    Err(_) => {
                        // The call future is dropped here; anything the
                        // provider still produces is lost. No late updates.
                        warn!(
                            "Provider '{}' timed out after {:?}",
                            provider_id, config.timeout
                        );
                        SourceStatus::Timeout
                    }
                }
            }
        }
    };

    let stat = SourceStat {
        provider_id,
        queue: config.queue,
        started_at,
        ended_at: Utc::now(),
        status,
        item_count,
    };
    let _ = tx.send(SessionMsg::Settled { stat }).await;
}

/// Await the provider call and forward each yielded batch to the session.
async fn drain_provider(
    entry: &Arc<ProviderEntry>,
    query: Query,
    cancel: CancellationToken,
    tx: &mpsc::Sender<SessionMsg>,
    provider_id: &str,
    item_count: &mut usize,
) -> anyhow::Result<()> {
    let mut stream = entry.provider.on_search(query, cancel).await?;
    while let Some(batch) = stream.next().await {
        let items = batch?;
        if items.is_empty() {
            continue;
        }
        *item_count += items.len();
        let msg = SessionMsg::Batch {
            provider_id: provider_id.to_string(),
            items,
        };
        if tx.send(msg).await.is_err() {
            // Session ended; stop draining
            break;
        }
    }
    Ok(())
}
