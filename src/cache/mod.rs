//! Feedline decision caches.
//!
//! Visibility, filter and mute decisions are memoised per (kind, requester, item) in bounded LRU
//! caches with compute-once semantics. Capacities are set via `feedline.toml`:
//!
//! ```toml
//! [cache]
//! visibility_limit = 20000
//! filter_limit = 10000
//! mute_limit = 10000
//! ```

mod config;
mod decision;
mod lock;

pub use config::{
    CacheConfig, DEFAULT_FILTER_LIMIT, DEFAULT_MUTE_LIMIT, DEFAULT_VISIBILITY_LIMIT,
};
pub use decision::{Computed, DecisionCache, DecisionKey, NO_AUTH};
pub(crate) use lock::{mutex_lock, rw_read, rw_write};
