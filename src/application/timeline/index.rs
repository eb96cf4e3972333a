//! Ordered per-account index of timeline entries.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::application::pagination::{Order, Page};
use crate::application::prepare::PreparedStatus;

use super::entry::TimelineEntry;

#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub entry: TimelineEntry,
    pub prepared: Option<PreparedStatus>,
}

/// Entries keyed by status id. Iteration in reverse key order walks newest to oldest.
///
/// `covered_from` is the lowest id down to which the index mirrors storage without gaps: every
/// timeline status with an id at or above it is indexed, unless it was removed on purpose.
#[derive(Debug, Default)]
pub struct TimelineIndex {
    entries: BTreeMap<String, IndexedEntry>,
    covered_from: Option<String>,
}

impl TimelineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prepared_len(&self) -> usize {
        self.entries
            .values()
            .filter(|indexed| indexed.prepared.is_some())
            .count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&IndexedEntry> {
        self.entries.get(id)
    }

    pub fn oldest_id(&self) -> Option<&str> {
        self.entries.keys().next().map(String::as_str)
    }

    pub fn covered_from(&self) -> Option<&str> {
        self.covered_from.as_deref()
    }

    /// Lower the covered floor to `floor`. The caller guarantees nothing between `floor` and the
    /// current floor is missing.
    pub fn extend_coverage(&mut self, floor: &str) {
        if self.covered_from.as_deref().is_none_or(|current| floor < current) {
            self.covered_from = Some(floor.to_string());
        }
    }

    /// Whether inserting `entry` would duplicate an id, or repeat a boost whose original (or
    /// another boost of it) sits within the newest `boost_depth` entries.
    pub fn should_skip_insert(&self, entry: &TimelineEntry, boost_depth: usize) -> bool {
        if self.entries.contains_key(&entry.id) {
            return true;
        }
        let Some(boost_of_id) = entry.boost_of_id.as_deref() else {
            return false;
        };
        self.entries
            .values()
            .rev()
            .take(boost_depth)
            .any(|existing| existing.entry.concerns(boost_of_id))
    }

    /// Insert `entry` unless [`should_skip_insert`](Self::should_skip_insert) says otherwise.
    pub fn insert(
        &mut self,
        entry: TimelineEntry,
        prepared: Option<PreparedStatus>,
        boost_depth: usize,
    ) -> bool {
        if self.should_skip_insert(&entry, boost_depth) {
            return false;
        }
        // Live statuses arrive at the top, so the first one starts the covered range.
        if self.covered_from.is_none() {
            self.covered_from = Some(entry.id.clone());
        }
        self.entries
            .insert(entry.id.clone(), IndexedEntry { entry, prepared });
        true
    }

    /// Insert an entry backfilled from storage; only exact duplicates are skipped. Coverage is left
    /// to [`extend_coverage`](Self::extend_coverage).
    pub fn insert_loaded(&mut self, entry: TimelineEntry) -> bool {
        if self.entries.contains_key(&entry.id) {
            return false;
        }
        self.entries.insert(
            entry.id.clone(),
            IndexedEntry {
                entry,
                prepared: None,
            },
        );
        true
    }

    pub fn set_prepared(&mut self, id: &str, prepared: PreparedStatus) -> bool {
        match self.entries.get_mut(id) {
            Some(indexed) => {
                indexed.prepared = Some(prepared);
                true
            }
            None => false,
        }
    }

    /// Ids strictly inside the page window, in the page's walk order.
    pub fn ids_in(&self, page: &Page) -> Vec<String> {
        let (min, max) = (page.min_value(), page.max_value());
        if min >= max {
            return Vec::new();
        }
        let range = self
            .entries
            .range::<str, _>((Bound::Excluded(min), Bound::Excluded(max)))
            .map(|(id, _)| id.clone());
        match page.order() {
            Order::Descending => range.rev().collect(),
            Order::Ascending => range.collect(),
        }
    }

    /// Drop prepared views for `item_id` and boosts of it.
    pub fn unprepare(&mut self, item_id: &str) -> usize {
        self.unprepare_where(|entry| entry.concerns(item_id))
    }

    /// Drop prepared views of entries authored or boosted from `account_id`.
    pub fn unprepare_by_account(&mut self, account_id: &str) -> usize {
        self.unprepare_where(|entry| entry.by_or_boosting(account_id))
    }

    pub fn unprepare_all(&mut self) -> usize {
        self.unprepare_where(|_| true)
    }

    /// Remove `item_id` and every boost of it.
    pub fn remove(&mut self, item_id: &str) -> usize {
        self.remove_where(|entry| entry.concerns(item_id))
    }

    /// Remove entries authored by `account_id` or boosting its statuses.
    pub fn remove_all_by_or_boosting(&mut self, account_id: &str) -> usize {
        self.remove_where(|entry| entry.by_or_boosting(account_id))
    }

    /// Keep the newest `prepared_len` prepared views and the newest `indexed_len` entries.
    ///
    /// Returns the number of views dropped plus the number of entries removed.
    pub fn prune(&mut self, prepared_len: usize, indexed_len: usize) -> usize {
        let mut affected = 0;

        let excess_prepared: Vec<String> = self
            .entries
            .iter()
            .rev()
            .filter(|(_, indexed)| indexed.prepared.is_some())
            .skip(prepared_len)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &excess_prepared {
            if let Some(indexed) = self.entries.get_mut(id) {
                indexed.prepared = None;
                affected += 1;
            }
        }

        let excess = self.entries.len().saturating_sub(indexed_len);
        for _ in 0..excess {
            if self.entries.pop_first().is_some() {
                affected += 1;
            }
        }
        if excess > 0 {
            let oldest = self.oldest_id().map(str::to_string);
            self.covered_from = match (self.covered_from.take(), oldest) {
                (Some(floor), Some(oldest)) => Some(floor.max(oldest)),
                _ => None,
            };
        }

        affected
    }

    fn unprepare_where(&mut self, predicate: impl Fn(&TimelineEntry) -> bool) -> usize {
        let mut affected = 0;
        for indexed in self.entries.values_mut() {
            if indexed.prepared.is_some() && predicate(&indexed.entry) {
                indexed.prepared = None;
                affected += 1;
            }
        }
        affected
    }

    fn remove_where(&mut self, predicate: impl Fn(&TimelineEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, indexed| !predicate(&indexed.entry));
        before - self.entries.len()
    }
}
