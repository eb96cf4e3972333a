//! Visibility resolver: who may see a post, and which feeds it belongs in.
//!
//! Every public check is memoised in a [`DecisionCache`] keyed by decision kind, requester and
//! post. Internally decisions are tri-state; [`Decision::Indeterminate`] covers posts whose reply
//! chain is not fully fetched yet and is reported to callers as "not visible" without being cached.

mod home;
mod public;
mod relevant;
mod status;

use std::sync::Arc;

use thiserror::Error;

use crate::application::context::Interrupted;
use crate::application::repos::{AccountsRepo, RelationshipsRepo, RepoError, StatusesRepo};
use crate::cache::{CacheConfig, Computed, DecisionCache};

pub use relevant::RelevantAccounts;

pub(crate) const KIND_STATUS_VISIBLE: &str = "status_visible";
pub(crate) const KIND_HOME_TIMELINEABLE: &str = "home_timelineable";
pub(crate) const KIND_PUBLIC_TIMELINEABLE: &str = "public_timelineable";

/// Default cap on reply-chain walks.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 256;

#[derive(Debug, Error)]
pub enum VisibilityError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Visible,
    NotVisible,
    /// A dependency (usually a reply parent) is not resolved yet.
    Indeterminate,
}

impl Decision {
    pub fn from_bool(visible: bool) -> Self {
        if visible {
            Decision::Visible
        } else {
            Decision::NotVisible
        }
    }

    fn into_computed(self) -> Computed<bool> {
        match self {
            Decision::Visible => Computed::Ready(true),
            Decision::NotVisible => Computed::Ready(false),
            Decision::Indeterminate => Computed::Indeterminate,
        }
    }
}

pub struct VisibilityFilter {
    statuses: Arc<dyn StatusesRepo>,
    accounts: Arc<dyn AccountsRepo>,
    relationships: Arc<dyn RelationshipsRepo>,
    cache: DecisionCache<bool>,
    max_chain_depth: usize,
}

impl VisibilityFilter {
    pub fn new(
        statuses: Arc<dyn StatusesRepo>,
        accounts: Arc<dyn AccountsRepo>,
        relationships: Arc<dyn RelationshipsRepo>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            statuses,
            accounts,
            relationships,
            cache: DecisionCache::new("visibility", config.visibility_limit_non_zero()),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.max(1);
        self
    }

    /// Forget cached decisions about `status_id`, e.g. after an edit or delete.
    pub fn invalidate_status(&self, status_id: &str) -> usize {
        self.cache.invalidate_item(status_id)
    }

    /// Forget cached decisions made for `account_id`, e.g. after a follow or block change.
    pub fn invalidate_requester(&self, account_id: &str) -> usize {
        self.cache.invalidate_requester(account_id)
    }

    pub fn cached_decisions(&self) -> usize {
        self.cache.len()
    }
}
