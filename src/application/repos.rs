//! Repository traits describing the storage collaborator.
//!
//! Every method is a side-effect-free read. A missing row is reported as [`RepoError::NotFound`],
//! which callers treat as "skip this item"; everything else is an internal failure.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    AccountRecord, FilterRecord, FollowRecord, StatusRecord, UserMuteRecord,
};

use super::pagination::Page;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("storage timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Collapse `NotFound` into `None`, keeping other failures.
pub fn optional<T>(result: Result<T, RepoError>) -> Result<Option<T>, RepoError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RepoError::NotFound) => Ok(None),
        Err(err) => Err(err),
    }
}

#[async_trait]
pub trait StatusesRepo: Send + Sync {
    /// Statuses for `account_id`'s home feed within `page`, in the page's order.
    async fn load_home_page(
        &self,
        account_id: &str,
        page: &Page,
    ) -> Result<Vec<StatusRecord>, RepoError>;

    /// Statuses for the public feed within `page`, in the page's order.
    async fn load_public_page(
        &self,
        page: &Page,
        local_only: bool,
    ) -> Result<Vec<StatusRecord>, RepoError>;

    async fn get_status(&self, id: &str) -> Result<StatusRecord, RepoError>;

    /// Statuses for the given ids; unknown ids are left out rather than failing the batch.
    async fn get_statuses_by_ids(&self, ids: &[String]) -> Result<Vec<StatusRecord>, RepoError>;
}

#[async_trait]
pub trait AccountsRepo: Send + Sync {
    async fn get_account(&self, id: &str) -> Result<AccountRecord, RepoError>;
}

#[async_trait]
pub trait RelationshipsRepo: Send + Sync {
    async fn get_follow(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<FollowRecord, RepoError>;

    async fn is_following(
        &self,
        account_id: &str,
        target_account_id: &str,
    ) -> Result<bool, RepoError>;

    async fn is_mutual(&self, account_id: &str, target_account_id: &str)
    -> Result<bool, RepoError>;

    /// True when either account blocks the other.
    async fn is_blocked(&self, account_id: &str, other_account_id: &str)
    -> Result<bool, RepoError>;

    /// True when any of `domains` is blocked by this instance.
    async fn are_domains_blocked(&self, domains: &[String]) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait FiltersRepo: Send + Sync {
    async fn filters_for_account(&self, account_id: &str)
    -> Result<Vec<FilterRecord>, RepoError>;
}

#[async_trait]
pub trait MutesRepo: Send + Sync {
    /// User mutes created by `account_id`.
    async fn mutes_for_account(&self, account_id: &str)
    -> Result<Vec<UserMuteRecord>, RepoError>;
}
