//! Session lifecycle: cancellation control, update delivery, control task
//!
//! One search session is one spawned control task. Tier workers funnel
//! batches and settle records into it over a channel; it owns the session's
//! aggregation map and push window, emits batched updates on a bounded
//! channel, and resolves the result handle exactly once.

use super::scheduler::PushScheduler;
use super::tier::SessionMsg;
use crate::results::{ResultAggregator, SearchOutcome, SourceStat, Update};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Handle for cancelling a running session.
///
/// Cloneable; `cancel()` is idempotent and cooperative: providers observe
/// the propagated token, nothing is forcibly terminated.
#[derive(Clone)]
pub struct GatherController {
    session_id: Uuid,
    token: CancellationToken,
}

impl GatherController {
    pub(crate) fn new(session_id: Uuid, token: CancellationToken) -> Self {
        Self { session_id, token }
    }

    /// Cancel the session. Calling more than once has no additional effect.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("Cancelling search session {}", self.session_id);
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// The cancellation token threaded into every provider call
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

/// What `search()` returns: the update stream, the controller, and the
/// terminal result handle.
pub struct SearchHandle {
    pub controller: GatherController,
    updates: mpsc::Receiver<Update>,
    outcome: oneshot::Receiver<SearchOutcome>,
}

impl SearchHandle {
    pub(crate) fn new(
        controller: GatherController,
        updates: mpsc::Receiver<Update>,
        outcome: oneshot::Receiver<SearchOutcome>,
    ) -> Self {
        Self {
            controller,
            updates,
            outcome,
        }
    }

    /// Receive the next batched update; `None` after the terminal update.
    pub async fn next_update(&mut self) -> Option<Update> {
        self.updates.recv().await
    }

    /// Await the terminal result, discarding any unconsumed updates.
    ///
    /// The update receiver is dropped first so the session is never blocked
    /// on a channel nobody reads.
    pub async fn result(self) -> SearchOutcome {
        drop(self.updates);
        Self::await_outcome(self.outcome).await
    }

    /// Drive a handler for every emitted update, then return the terminal
    /// result. This is the callback-style consumption mode.
    pub async fn for_each<F>(mut self, mut handler: F) -> SearchOutcome
    where
        F: FnMut(Update),
    {
        while let Some(update) = self.updates.recv().await {
            handler(update);
        }
        Self::await_outcome(self.outcome).await
    }

    async fn await_outcome(outcome: oneshot::Receiver<SearchOutcome>) -> SearchOutcome {
        outcome.await.unwrap_or(SearchOutcome {
            total_count: 0,
            cancelled: true,
            source_stats: Vec::new(),
        })
    }
}

/// Run one session's control loop to completion.
///
/// Select order is deliberate: cancellation preempts everything, then the
/// push-window deadline, then incoming worker messages.
pub(crate) async fn run_session(
    session_id: Uuid,
    total_providers: usize,
    provider_order: HashMap<String, u64>,
    force_push_delay: Duration,
    mut rx: mpsc::Receiver<SessionMsg>,
    updates: mpsc::Sender<Update>,
    outcome: oneshot::Sender<SearchOutcome>,
    cancel: CancellationToken,
) {
    let mut aggregator = ResultAggregator::new(provider_order);
    let mut scheduler = PushScheduler::new(force_push_delay);
    let mut stats: Vec<SourceStat> = Vec::new();
    let mut settled = 0usize;

    if total_providers == 0 {
        debug!("Session {} has no providers, finishing immediately", session_id);
        finish(session_id, &aggregator, &mut scheduler, stats, &updates, outcome).await;
        return;
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                scheduler.release();
                let update = Update {
                    new_items: Vec::new(),
                    total_count: aggregator.total_count(),
                    is_done: true,
                    cancelled: true,
                    source_stats: stats.clone(),
                };
                let _ = updates.send(update).await;
                let _ = outcome.send(SearchOutcome {
                    total_count: aggregator.total_count(),
                    cancelled: true,
                    source_stats: stats,
                });
                debug!("Session {} cancelled", session_id);
                return;
            }
            _ = tokio::time::sleep_until(scheduler.deadline().unwrap_or_else(Instant::now)),
                if scheduler.deadline().is_some() =>
            {
                flush(&aggregator, &mut scheduler, &stats, false, &updates).await;
            }
            msg = rx.recv() => {
                match msg {
                    Some(SessionMsg::Batch { provider_id, items }) => {
                        let delta = aggregator.merge(items, &provider_id);
                        if !delta.is_empty() {
                            scheduler.note_delta(delta);
                        }
                    }
                    Some(SessionMsg::Settled { stat }) => {
                        debug!(
                            "Session {}: provider '{}' settled as {} ({} items)",
                            session_id, stat.provider_id, stat.status, stat.item_count
                        );
                        stats.push(stat);
                        settled += 1;
                        if settled >= total_providers {
                            // Fast path: nothing more can arrive, close the
                            // window without waiting for the timer.
                            finish(session_id, &aggregator, &mut scheduler, stats, &updates, outcome).await;
                            return;
                        }
                    }
                    None => {
                        // All workers gone; nothing more can arrive.
                        finish(session_id, &aggregator, &mut scheduler, stats, &updates, outcome).await;
                        return;
                    }
                }
            }
        }
    }
}

/// Emit one update with the buffered delta.
async fn flush(
    aggregator: &ResultAggregator,
    scheduler: &mut PushScheduler,
    stats: &[SourceStat],
    is_done: bool,
    updates: &mpsc::Sender<Update>,
) {
    let pending = scheduler.take_pending();
    let update = Update {
        new_items: aggregator.ordered_subset(&pending),
        total_count: aggregator.total_count(),
        is_done,
        cancelled: false,
        source_stats: stats.to_vec(),
    };
    let _ = updates.send(update).await;
}

/// Emit the terminal update (exactly once per session, even with zero new
/// items) and resolve the result handle.
async fn finish(
    session_id: Uuid,
    aggregator: &ResultAggregator,
    scheduler: &mut PushScheduler,
    stats: Vec<SourceStat>,
    updates: &mpsc::Sender<Update>,
    outcome: oneshot::Sender<SearchOutcome>,
) {
    flush(aggregator, scheduler, &stats, true, updates).await;
    debug!(
        "Session {} done with {} items",
        session_id,
        aggregator.total_count()
    );
    let _ = outcome.send(SearchOutcome {
        total_count: aggregator.total_count(),
        cancelled: false,
        source_stats: stats,
    });
}
