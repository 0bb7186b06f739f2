//! Aggregation map for merging, deduplicating and ranking provider results

use super::types::Item;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Per-session aggregation map.
///
/// Merges item batches from any tier into one id-keyed map and computes the
/// rank order for emitted updates. Owned by the session's control task; never
/// shared between sessions.
pub struct ResultAggregator {
    items: HashMap<String, Item>,
    /// Provider id -> registration sequence, for deterministic tie-breaking
    provider_order: HashMap<String, u64>,
}

impl ResultAggregator {
    /// Create an aggregator for a session over the given providers
    pub fn new(provider_order: HashMap<String, u64>) -> Self {
        Self {
            items: HashMap::new(),
            provider_order,
        }
    }

    /// Merge one batch from a provider, keying by item id.
    ///
    /// Last write wins on content, score and pin state; the item's position
    /// is recomputed from its new score at emit time. Returns the delta: ids
    /// added or changed by this call. A rewrite identical to the stored item
    /// is not a change and is excluded, so an id already flushed is never
    /// re-emitted unless it actually changes again.
    pub fn merge(&mut self, batch: Vec<Item>, provider_id: &str) -> Vec<String> {
        let mut delta = Vec::new();
        for mut item in batch {
            item.source_id = provider_id.to_string();
            let changed = match self.items.get(&item.id) {
                Some(existing) => *existing != item,
                None => true,
            };
            if changed {
                delta.push(item.id.clone());
                self.items.insert(item.id.clone(), item);
            }
        }
        delta
    }

    /// Number of distinct items aggregated so far
    pub fn total_count(&self) -> usize {
        self.items.len()
    }

    /// All aggregated items in rank order
    pub fn ordered_items(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self.items.values().cloned().collect();
        items.sort_by(|a, b| self.compare(a, b));
        items
    }

    /// The given ids in rank order, skipping ids no longer present
    pub fn ordered_subset(&self, ids: &[String]) -> Vec<Item> {
        let mut items: Vec<Item> = ids
            .iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect();
        items.sort_by(|a, b| self.compare(a, b));
        items
    }

    /// Rank comparator: pinned items first (most recent pin first), then
    /// score descending, then originating provider registration order, then
    /// item id.
    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        match (a.pinned, b.pinned) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => {
                let a_at = a.pinned_at.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN);
                let b_at = b.pinned_at.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN);
                match b_at.cmp(&a_at) {
                    Ordering::Equal => {}
                    other => return other,
                }
            }
            (false, false) => {}
        }

        match b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal) {
            Ordering::Equal => {}
            other => return other,
        }

        let a_seq = self.provider_seq(&a.source_id);
        let b_seq = self.provider_seq(&b.source_id);
        match a_seq.cmp(&b_seq) {
            Ordering::Equal => {}
            other => return other,
        }

        a.id.cmp(&b.id)
    }

    fn provider_seq(&self, provider_id: &str) -> u64 {
        self.provider_order
            .get(provider_id)
            .copied()
            .unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn order(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs.iter().map(|(id, seq)| (id.to_string(), *seq)).collect()
    }

    #[test]
    fn test_dedup_by_id() {
        let mut agg = ResultAggregator::new(order(&[("a", 0), ("b", 1)]));

        agg.merge(vec![Item::new("x", 0.5)], "a");
        agg.merge(vec![Item::new("x", 0.5)], "b");

        // Same id from two providers: one entry, attributed to the last writer
        assert_eq!(agg.total_count(), 1);
        assert_eq!(agg.ordered_items()[0].source_id, "b");
    }

    #[test]
    fn test_last_write_wins_and_reorders() {
        let mut agg = ResultAggregator::new(order(&[("a", 0), ("b", 1)]));

        agg.merge(
            vec![
                Item::new("x", 0.5).with_content(serde_json::json!("from a")),
                Item::new("y", 0.7),
            ],
            "a",
        );
        agg.merge(
            vec![Item::new("x", 0.9).with_content(serde_json::json!("from b"))],
            "b",
        );

        let items = agg.ordered_items();
        assert_eq!(items[0].id, "x");
        assert_eq!(items[0].content, serde_json::json!("from b"));
        assert_eq!(items[0].score, 0.9);
        assert_eq!(items[1].id, "y");
    }

    #[test]
    fn test_delta_excludes_identical_rewrite() {
        let mut agg = ResultAggregator::new(order(&[("a", 0)]));

        let delta = agg.merge(vec![Item::new("x", 0.5)], "a");
        assert_eq!(delta, vec!["x".to_string()]);

        let delta = agg.merge(vec![Item::new("x", 0.5)], "a");
        assert!(delta.is_empty());

        let delta = agg.merge(vec![Item::new("x", 0.6)], "a");
        assert_eq!(delta, vec!["x".to_string()]);
    }

    #[test]
    fn test_pinned_precede_unpinned() {
        let mut agg = ResultAggregator::new(order(&[("a", 0)]));
        let early = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let late = Utc.timestamp_opt(1_700_000_100, 0).unwrap();

        agg.merge(
            vec![
                Item::new("high", 99.0),
                Item::new("old-pin", 0.1).pinned_at(early),
                Item::new("new-pin", 0.2).pinned_at(late),
            ],
            "a",
        );

        let ids: Vec<_> = agg.ordered_items().into_iter().map(|i| i.id).collect();
        // Most recent pin first, unpinned after all pinned regardless of score
        assert_eq!(ids, vec!["new-pin", "old-pin", "high"]);
    }

    #[test]
    fn test_tie_break_provider_order_then_id() {
        let mut agg = ResultAggregator::new(order(&[("first", 0), ("second", 1)]));

        agg.merge(vec![Item::new("b", 0.5)], "second");
        agg.merge(vec![Item::new("c", 0.5), Item::new("a", 0.5)], "first");

        let ids: Vec<_> = agg.ordered_items().into_iter().map(|i| i.id).collect();
        // Equal scores: provider registration order, then lexical id
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_ordered_subset() {
        let mut agg = ResultAggregator::new(order(&[("a", 0)]));
        agg.merge(vec![Item::new("x", 0.1), Item::new("y", 0.9)], "a");

        let subset = agg.ordered_subset(&["x".to_string(), "y".to_string(), "gone".to_string()]);
        let ids: Vec<_> = subset.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["y", "x"]);
    }
}
