//! Compute-once decision caches.
//!
//! Each key maps to a shared [`OnceCell`]. The first caller for a key runs the computation while
//! concurrent callers for the same key wait on that cell. Failed or indeterminate computations leave
//! the cell empty, so the next caller retries.

use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use metrics::counter;
use tokio::sync::OnceCell;
use tracing::debug;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::decision";
const METRIC_DECISION_HIT: &str = "feedline_decision_cache_hit_total";
const METRIC_DECISION_MISS: &str = "feedline_decision_cache_miss_total";

/// Requester id used for unauthenticated lookups.
pub const NO_AUTH: &str = "noauth";

/// Cache key: decision kind, requester (or [`NO_AUTH`]) and item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    pub kind: &'static str,
    pub requester: String,
    pub item: String,
}

impl DecisionKey {
    pub fn new(kind: &'static str, requester: Option<&str>, item: impl Into<String>) -> Self {
        Self {
            kind,
            requester: requester.unwrap_or(NO_AUTH).to_string(),
            item: item.into(),
        }
    }
}

/// Result of one computation handed to [`DecisionCache::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Computed<V> {
    /// Final value, stored for later callers.
    Ready(V),
    /// No decision possible yet; not stored.
    Indeterminate,
}

enum LoadFailure<E> {
    Indeterminate,
    Failed(E),
}

pub struct DecisionCache<V> {
    name: &'static str,
    entries: Mutex<LruCache<DecisionKey, Arc<OnceCell<V>>>>,
}

impl<V> DecisionCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, capacity: std::num::NonZeroUsize) -> Self {
        Self {
            name,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cell(&self, key: &DecisionKey) -> Arc<OnceCell<V>> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "cell");
        if let Some(cell) = entries.get(key) {
            return Arc::clone(cell);
        }
        let cell = Arc::new(OnceCell::new());
        entries.put(key.clone(), Arc::clone(&cell));
        cell
    }

    /// Return the cached value for `key`, computing it at most once across concurrent callers.
    ///
    /// `Ok(None)` means the computation was indeterminate; the caller picks the safe default.
    pub async fn load<F, Fut, E>(&self, key: DecisionKey, compute: F) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed<V>, E>>,
    {
        let cell = self.cell(&key);
        if let Some(value) = cell.get() {
            counter!(METRIC_DECISION_HIT, "cache" => self.name).increment(1);
            return Ok(Some(value.clone()));
        }
        counter!(METRIC_DECISION_MISS, "cache" => self.name).increment(1);

        let result = cell
            .get_or_try_init(|| async {
                match compute().await {
                    Ok(Computed::Ready(value)) => Ok(value),
                    Ok(Computed::Indeterminate) => Err(LoadFailure::Indeterminate),
                    Err(err) => Err(LoadFailure::Failed(err)),
                }
            })
            .await;

        match result {
            Ok(value) => Ok(Some(value.clone())),
            Err(LoadFailure::Indeterminate) => {
                debug!(
                    cache = self.name,
                    kind = key.kind,
                    requester = %key.requester,
                    item = %key.item,
                    "Decision indeterminate; not cached"
                );
                Ok(None)
            }
            Err(LoadFailure::Failed(err)) => Err(err),
        }
    }

    /// Cached value without computing.
    pub fn peek(&self, key: &DecisionKey) -> Option<V> {
        mutex_lock(&self.entries, SOURCE, "peek")
            .peek(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Drop every decision about `item_id`; returns how many were dropped.
    pub fn invalidate_item(&self, item_id: &str) -> usize {
        self.invalidate_where("invalidate_item", |key| key.item == item_id)
    }

    /// Drop every decision made for `requester_id`.
    pub fn invalidate_requester(&self, requester_id: &str) -> usize {
        self.invalidate_where("invalidate_requester", |key| key.requester == requester_id)
    }

    pub fn clear(&self) {
        mutex_lock(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn invalidate_where(&self, op: &'static str, predicate: impl Fn(&DecisionKey) -> bool) -> usize {
        let mut entries = mutex_lock(&self.entries, SOURCE, op);
        let stale: Vec<DecisionKey> = entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }
}
