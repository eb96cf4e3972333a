//! In-memory storage collaborator.
//!
//! Implements every repository trait over plain collections. Used by the CLI (loaded from a
//! [`Fixture`]) and by tests, which can also mutate it and simulate outages.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::application::pagination::{Order, Page};
use crate::application::repos::{
    AccountsRepo, FiltersRepo, MutesRepo, RelationshipsRepo, RepoError, StatusesRepo,
};
use crate::cache::{rw_read, rw_write};
use crate::domain::entities::{
    AccountRecord, BlockRecord, FilterRecord, FollowRecord, StatusRecord, UserMuteRecord,
};
use crate::domain::types::Visibility;

use super::fixture::Fixture;

const SOURCE: &str = "infra::memory";

#[derive(Debug, Default)]
struct StoreState {
    accounts: HashMap<String, AccountRecord>,
    statuses: BTreeMap<String, StatusRecord>,
    follows: Vec<FollowRecord>,
    blocks: Vec<BlockRecord>,
    mutes: Vec<UserMuteRecord>,
    filters: Vec<FilterRecord>,
    blocked_domains: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    offline: AtomicBool,
    page_loads: AtomicUsize,
    status_fetches: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();
        {
            let mut state = rw_write(&store.state, SOURCE, "from_fixture");
            state.accounts = fixture
                .accounts
                .into_iter()
                .map(|account| (account.id.clone(), account))
                .collect();
            state.statuses = fixture
                .statuses
                .into_iter()
                .map(|status| (status.id.clone(), status))
                .collect();
            state.follows = fixture.follows;
            state.blocks = fixture.blocks;
            state.mutes = fixture.mutes;
            state.filters = fixture.filters;
            state.blocked_domains = fixture.blocked_domains.into_iter().collect();
        }
        store
    }

    pub fn insert_account(&self, account: AccountRecord) {
        rw_write(&self.state, SOURCE, "insert_account")
            .accounts
            .insert(account.id.clone(), account);
    }

    pub fn insert_status(&self, status: StatusRecord) {
        rw_write(&self.state, SOURCE, "insert_status")
            .statuses
            .insert(status.id.clone(), status);
    }

    pub fn delete_status(&self, id: &str) -> Option<StatusRecord> {
        rw_write(&self.state, SOURCE, "delete_status")
            .statuses
            .remove(id)
    }

    pub fn insert_follow(&self, follow: FollowRecord) {
        rw_write(&self.state, SOURCE, "insert_follow")
            .follows
            .push(follow);
    }

    pub fn insert_block(&self, block: BlockRecord) {
        rw_write(&self.state, SOURCE, "insert_block").blocks.push(block);
    }

    pub fn insert_mute(&self, mute: UserMuteRecord) {
        rw_write(&self.state, SOURCE, "insert_mute").mutes.push(mute);
    }

    pub fn insert_filter(&self, filter: FilterRecord) {
        rw_write(&self.state, SOURCE, "insert_filter")
            .filters
            .push(filter);
    }

    pub fn block_domain(&self, domain: impl Into<String>) {
        rw_write(&self.state, SOURCE, "block_domain")
            .blocked_domains
            .insert(domain.into());
    }

    /// While offline every read fails with a persistence error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of page loads served so far.
    pub fn page_loads(&self) -> usize {
        self.page_loads.load(Ordering::SeqCst)
    }

    /// Number of single or batched status fetches served so far.
    pub fn status_fetches(&self) -> usize {
        self.status_fetches.load(Ordering::SeqCst)
    }

    pub fn account_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = rw_read(&self.state, SOURCE, "account_ids")
            .accounts
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    fn ensure_online(&self) -> Result<(), RepoError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("store offline"));
        }
        Ok(())
    }

    fn page_of<'a>(
        statuses: impl DoubleEndedIterator<Item = &'a StatusRecord>,
        page: &Page,
        keep: impl Fn(&StatusRecord) -> bool,
    ) -> Vec<StatusRecord> {
        let in_range = |status: &&StatusRecord| page.contains(&status.id) && keep(status);
        match page.order() {
            Order::Descending => statuses
                .rev()
                .filter(in_range)
                .take(page.limit)
                .cloned()
                .collect(),
            Order::Ascending => statuses
                .filter(in_range)
                .take(page.limit)
                .cloned()
                .collect(),
        }
    }
}

impl StoreState {
    fn follows(&self, account_id: &str, target_account_id: &str) -> Option<&FollowRecord> {
        self.follows.iter().find(|follow| {
            follow.account_id == account_id && follow.target_account_id == target_account_id
        })
    }
}

#[async_trait]
impl StatusesRepo for InMemoryStore {
    async fn load_home_page(
        &self,
        account_id: &str,
        page: &Page,
    ) -> Result<Vec<StatusRecord>, RepoError> {
        self.ensure_online()?;
        self.page_loads.fetch_add(1, Ordering::SeqCst);
        let state = rw_read(&self.state, SOURCE, "load_home_page");
        let followed: HashSet<&str> = state
            .follows
            .iter()
            .filter(|follow| follow.account_id == account_id)
            .map(|follow| follow.target_account_id.as_str())
            .collect();
        Ok(Self::page_of(state.statuses.values(), page, |status| {
            status.account_id == account_id
                || followed.contains(status.account_id.as_str())
                || status.mentions_account(account_id)
        }))
    }

    async fn load_public_page(
        &self,
        page: &Page,
        local_only: bool,
    ) -> Result<Vec<StatusRecord>, RepoError> {
        self.ensure_online()?;
        self.page_loads.fetch_add(1, Ordering::SeqCst);
        let state = rw_read(&self.state, SOURCE, "load_public_page");
        Ok(Self::page_of(state.statuses.values(), page, |status| {
            status.visibility == Visibility::Public && (!local_only || status.local)
        }))
    }

    async fn get_status(&self, id: &str) -> Result<StatusRecord, RepoError> {
        self.ensure_online()?;
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        rw_read(&self.state, SOURCE, "get_status")
            .statuses
            .get(id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn get_statuses_by_ids(&self, ids: &[String]) -> Result<Vec<StatusRecord>, RepoError> {
        self.ensure_online()?;
        self.status_fetches.fetch_add(1, Ordering::SeqCst);
        let state = rw_read(&self.state, SOURCE, "get_statuses_by_ids");
        Ok(ids
            .iter()
            .filter_map(|id| state.statuses.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl AccountsRepo for InMemoryStore {
    async fn get_account(&self, id: &str) -> Result<AccountRecord, RepoError> {
        self.ensure_online()?;
        rw_read(&self.state, SOURCE, "get_account")
            .accounts
            .get(id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl RelationshipsRepo for InMemoryStore {
    async fn get_follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<FollowRecord, RepoError> {
        self.ensure_online()?;
        rw_read(&self.state, SOURCE, "get_follow")
            .follows(account_id, target_account_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn is_following(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, RepoError> {
        self.ensure_online()?;
        Ok(rw_read(&self.state, SOURCE, "is_following")
            .follows(account_id, target_account_id)
            .is_some())
    }

    async fn is_mutual(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, RepoError> {
        self.ensure_online()?;
        let state = rw_read(&self.state, SOURCE, "is_mutual");
        Ok(state.follows(account_id, target_account_id).is_some()
            && state.follows(target_account_id, account_id).is_some())
    }

    async fn is_blocked(
        &self,
        account_id: &str,
        other_account_id: &str,
    ) -> Result<bool, RepoError> {
        self.ensure_online()?;
        Ok(rw_read(&self.state, SOURCE, "is_blocked")
            .blocks
            .iter()
            .any(|block| {
                (block.account_id == account_id && block.target_account_id == other_account_id)
                    || (block.account_id == other_account_id
                        && block.target_account_id == account_id)
            }))
    }

    async fn are_domains_blocked(&self, domains: &[String]) -> Result<bool, RepoError> {
        self.ensure_online()?;
        let state = rw_read(&self.state, SOURCE, "are_domains_blocked");
        Ok(domains.iter().any(|domain| {
            state.blocked_domains.iter().any(|blocked| {
                domain == blocked || domain.ends_with(&format!(".{blocked}"))
            })
        }))
    }
}

#[async_trait]
impl FiltersRepo for InMemoryStore {
    async fn filters_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<FilterRecord>, RepoError> {
        self.ensure_online()?;
        Ok(rw_read(&self.state, SOURCE, "filters_for_account")
            .filters
            .iter()
            .filter(|filter| filter.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MutesRepo for InMemoryStore {
    async fn mutes_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<UserMuteRecord>, RepoError> {
        self.ensure_online()?;
        Ok(rw_read(&self.state, SOURCE, "mutes_for_account")
            .mutes
            .iter()
            .filter(|mute| mute.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn status(id: &str, author: &str) -> StatusRecord {
        StatusRecord {
            id: id.to_string(),
            account_id: author.to_string(),
            local: true,
            created_at: datetime!(2024-01-01 00:00 UTC),
            visibility: Visibility::Public,
            content_warning: String::new(),
            content: String::new(),
            in_reply_to_id: None,
            in_reply_to_uri: None,
            in_reply_to_account_id: None,
            boost_of_id: None,
            boost_of_account_id: None,
            mentions: Vec::new(),
            attachments: Vec::new(),
            poll: None,
            pending_approval: false,
        }
    }

    #[tokio::test]
    async fn home_page_respects_bounds_and_order() {
        let store = InMemoryStore::new();
        for id in ["01", "02", "03", "04", "05"] {
            store.insert_status(status(id, "a"));
        }

        let down = store
            .load_home_page("a", &Page::older_than("05", 2))
            .await
            .expect("page");
        let ids: Vec<&str> = down.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["04", "03"]);

        let up = store
            .load_home_page("a", &Page::newer_than("02", 2))
            .await
            .expect("page");
        let ids: Vec<&str> = up.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["03", "04"]);
    }

    #[tokio::test]
    async fn offline_store_reports_persistence_errors() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let err = store.get_status("01").await.expect_err("offline");
        assert!(matches!(err, RepoError::Persistence(_)));
    }

    #[tokio::test]
    async fn blocks_are_symmetric() {
        let store = InMemoryStore::new();
        store.insert_block(BlockRecord {
            account_id: "a".to_string(),
            target_account_id: "b".to_string(),
        });
        assert!(store.is_blocked("a", "b").await.expect("query"));
        assert!(store.is_blocked("b", "a").await.expect("query"));
        assert!(!store.is_blocked("a", "c").await.expect("query"));
    }

    #[tokio::test]
    async fn subdomains_of_blocked_domains_are_blocked() {
        let store = InMemoryStore::new();
        store.block_domain("spam.example");
        let blocked = store
            .are_domains_blocked(&["eu.spam.example".to_string()])
            .await
            .expect("query");
        assert!(blocked);
    }
}
