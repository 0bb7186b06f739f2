//! Result type definitions

use crate::providers::QueueAffinity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single ranked search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item id; the aggregation map is keyed by it
    pub id: String,
    /// Provider that delivered this item (stamped by the engine)
    pub source_id: String,
    /// Relevance score; higher ranks earlier
    pub score: f64,
    /// User-pinned items always surface ahead of unpinned ones
    #[serde(default)]
    pub pinned: bool,
    /// When the item was pinned; recent pins rank earlier among pinned items
    #[serde(default)]
    pub pinned_at: Option<DateTime<Utc>>,
    /// Opaque payload rendered by the caller
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Item {
    /// Create a new unpinned item
    pub fn new(id: impl Into<String>, score: f64) -> Self {
        Self {
            id: id.into(),
            source_id: String::new(),
            score,
            pinned: false,
            pinned_at: None,
            content: serde_json::Value::Null,
        }
    }

    /// Attach a content payload
    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = content;
        self
    }

    /// Mark the item pinned at the given time
    pub fn pinned_at(mut self, at: DateTime<Utc>) -> Self {
        self.pinned = true;
        self.pinned_at = Some(at);
        self
    }
}

/// Outcome of one provider call within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Timeout,
    Error,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One provider's timing and status record, appended once per provider per
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStat {
    pub provider_id: String,
    pub queue: QueueAffinity,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: SourceStatus,
    /// Items forwarded to the aggregator before the provider settled
    pub item_count: usize,
}

impl SourceStat {
    /// Wall-clock duration of the call in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

/// A batched update streamed to the caller.
///
/// Immutable once emitted. A session emits zero or more non-terminal
/// updates followed by exactly one terminal update (`is_done`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    /// Items added or changed since the previous update, in rank order
    pub new_items: Vec<Item>,
    /// Size of the session's aggregation map; non-decreasing until a
    /// cancelled terminal update
    pub total_count: usize,
    /// All providers have settled, timed out or errored
    pub is_done: bool,
    /// The session was cancelled; no update follows
    #[serde(default)]
    pub cancelled: bool,
    /// Per-provider stats recorded so far
    pub source_stats: Vec<SourceStat>,
}

/// Terminal result of a session, resolved by the controller's result handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Final aggregation map size
    pub total_count: usize,
    /// The session ended by cancellation
    pub cancelled: bool,
    /// One stat per provider that settled before session end
    pub source_stats: Vec<SourceStat>,
}
