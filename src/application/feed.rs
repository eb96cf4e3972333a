//! Wiring of the read-side services every feed depends on.

use std::sync::Arc;

use crate::application::mutes::MuteFilter;
use crate::application::prepare::StatusPreparer;
use crate::application::repos::{
    AccountsRepo, FiltersRepo, MutesRepo, RelationshipsRepo, StatusesRepo,
};
use crate::application::status_filter::StatusFilter;
use crate::application::visibility::VisibilityFilter;
use crate::cache::CacheConfig;

/// A storage collaborator implementing every repository the feeds read from.
pub trait FeedStore:
    StatusesRepo + AccountsRepo + RelationshipsRepo + FiltersRepo + MutesRepo
{
}

impl<T> FeedStore for T where
    T: StatusesRepo + AccountsRepo + RelationshipsRepo + FiltersRepo + MutesRepo
{
}

/// Shared handles to storage, the decision services and the preparer.
#[derive(Clone)]
pub struct FeedServices {
    pub statuses: Arc<dyn StatusesRepo>,
    pub accounts: Arc<dyn AccountsRepo>,
    pub visibility: Arc<VisibilityFilter>,
    pub mutes: Arc<MuteFilter>,
    pub filters: Arc<StatusFilter>,
    pub preparer: StatusPreparer,
}

impl FeedServices {
    pub fn new<S>(store: Arc<S>, cache: &CacheConfig, max_chain_depth: usize) -> Self
    where
        S: FeedStore + 'static,
    {
        let statuses: Arc<dyn StatusesRepo> = store.clone();
        let accounts: Arc<dyn AccountsRepo> = store.clone();
        let relationships: Arc<dyn RelationshipsRepo> = store.clone();
        let filters: Arc<dyn FiltersRepo> = store.clone();
        let mutes: Arc<dyn MutesRepo> = store;

        let visibility = VisibilityFilter::new(
            statuses.clone(),
            accounts.clone(),
            relationships,
            cache,
        )
        .with_max_chain_depth(max_chain_depth);
        let mute_filter =
            MuteFilter::new(statuses.clone(), mutes, cache).with_max_chain_depth(max_chain_depth);
        let status_filter = StatusFilter::new(statuses.clone(), filters, cache);

        Self {
            preparer: StatusPreparer::new(statuses.clone(), accounts.clone()),
            statuses,
            accounts,
            visibility: Arc::new(visibility),
            mutes: Arc::new(mute_filter),
            filters: Arc::new(status_filter),
        }
    }

    /// Forget every cached decision about `status_id`.
    pub fn invalidate_status(&self, status_id: &str) -> usize {
        self.visibility.invalidate_status(status_id)
            + self.mutes.invalidate_status(status_id)
            + self.filters.invalidate_status(status_id)
    }

    /// Forget every cached decision made for `account_id`.
    pub fn invalidate_requester(&self, account_id: &str) -> usize {
        self.visibility.invalidate_requester(account_id)
            + self.mutes.invalidate_requester(account_id)
            + self.filters.invalidate_requester(account_id)
    }
}
