//! Push-window scheduler: batches result deltas into flicker-free updates

use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;

/// Push-window state machine for one session.
///
/// `idle` until a delta arrives; the first delta arms a window timer of
/// `force_push_delay` and moves to `collecting`; further deltas join the
/// pending buffer without re-arming the window. The owning control task
/// closes the window when the timer fires or when every provider has
/// settled, whichever happens first, and emits exactly one update per close.
pub struct PushScheduler {
    delay: Duration,
    deadline: Option<Instant>,
    pending: Vec<String>,
    pending_set: HashSet<String>,
}

impl PushScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: Vec::new(),
            pending_set: HashSet::new(),
        }
    }

    /// Buffer a delta. The first delta after idle arms the window.
    pub fn note_delta(&mut self, ids: Vec<String>) {
        for id in ids {
            if self.pending_set.insert(id.clone()) {
                self.pending.push(id);
            }
        }
        if self.deadline.is_none() && !self.pending.is_empty() {
            self.deadline = Some(Instant::now() + self.delay);
        }
    }

    /// The armed window deadline, if collecting
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Close the window: drain the buffered delta and return to idle.
    pub fn take_pending(&mut self) -> Vec<String> {
        self.deadline = None;
        self.pending_set.clear();
        std::mem::take(&mut self.pending)
    }

    /// Release the window timer without emitting (cancellation path).
    pub fn release(&mut self) {
        self.deadline = None;
        self.pending.clear();
        self.pending_set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_delta_arms_window() {
        let mut scheduler = PushScheduler::new(Duration::from_millis(50));
        assert!(scheduler.deadline().is_none());

        scheduler.note_delta(vec!["a".to_string()]);
        let deadline = scheduler.deadline().unwrap();
        assert_eq!(deadline, Instant::now() + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_deltas_do_not_rearm() {
        let mut scheduler = PushScheduler::new(Duration::from_millis(50));
        scheduler.note_delta(vec!["a".to_string()]);
        let first = scheduler.deadline().unwrap();

        tokio::time::advance(Duration::from_millis(20)).await;
        scheduler.note_delta(vec!["b".to_string()]);
        assert_eq!(scheduler.deadline().unwrap(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_pending_returns_to_idle() {
        let mut scheduler = PushScheduler::new(Duration::from_millis(50));
        scheduler.note_delta(vec!["a".to_string(), "b".to_string()]);
        scheduler.note_delta(vec!["a".to_string()]);

        let pending = scheduler.take_pending();
        assert_eq!(pending, vec!["a".to_string(), "b".to_string()]);
        assert!(scheduler.deadline().is_none());
        assert!(!scheduler.has_pending());

        // Next delta re-arms a fresh window
        scheduler.note_delta(vec!["c".to_string()]);
        assert!(scheduler.deadline().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_discards_pending() {
        let mut scheduler = PushScheduler::new(Duration::from_millis(50));
        scheduler.note_delta(vec!["a".to_string()]);

        scheduler.release();
        assert!(scheduler.deadline().is_none());
        assert!(!scheduler.has_pending());
    }
}
