//! User-mute evaluation for statuses.
//!
//! A status is muted for a viewer when the viewer mutes its author, anyone it mentions, the booster
//! of a boost, or any such account further up its reply chain. Details are cached per
//! (viewer, status) and expiries are checked on every read.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::application::context::{FeedContext, Interrupted};
use crate::application::repos::{MutesRepo, RepoError, StatusesRepo, optional};
use crate::cache::{CacheConfig, Computed, DecisionCache, DecisionKey};
use crate::domain::entities::{AccountRecord, StatusRecord, UserMuteRecord};

const KIND_STATUS_MUTE: &str = "status_mute";

#[derive(Debug, Error)]
pub enum MuteError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

/// Expiry of a mute flag: `Never` for an indefinite mute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuteExpiry {
    Never,
    At(OffsetDateTime),
}

impl MuteExpiry {
    fn of(mute: &UserMuteRecord) -> Self {
        match mute.expires_at {
            Some(at) => MuteExpiry::At(at),
            None => MuteExpiry::Never,
        }
    }

    /// The later of two expiries.
    fn latest(self, other: MuteExpiry) -> MuteExpiry {
        match (self, other) {
            (MuteExpiry::Never, _) | (_, MuteExpiry::Never) => MuteExpiry::Never,
            (MuteExpiry::At(a), MuteExpiry::At(b)) => MuteExpiry::At(a.max(b)),
        }
    }

    pub fn is_expired(self, now: OffsetDateTime) -> bool {
        match self {
            MuteExpiry::Never => false,
            MuteExpiry::At(at) => at <= now,
        }
    }
}

/// Which mute flags apply to a status, with the latest expiry of each.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuteDetails {
    pub mute: Option<MuteExpiry>,
    pub notifications: Option<MuteExpiry>,
}

impl MuteDetails {
    pub fn muted(&self, now: OffsetDateTime) -> bool {
        self.mute.is_some_and(|expiry| !expiry.is_expired(now))
    }

    pub fn notifications_muted(&self, now: OffsetDateTime) -> bool {
        self.notifications
            .is_some_and(|expiry| !expiry.is_expired(now))
    }

    fn absorb(&mut self, mute: &UserMuteRecord) {
        let expiry = MuteExpiry::of(mute);
        self.mute = Some(self.mute.map_or(expiry, |current| current.latest(expiry)));
        if mute.notifications {
            self.notifications = Some(
                self.notifications
                    .map_or(expiry, |current| current.latest(expiry)),
            );
        }
    }
}

pub struct MuteFilter {
    statuses: Arc<dyn StatusesRepo>,
    mutes: Arc<dyn MutesRepo>,
    cache: DecisionCache<MuteDetails>,
    max_chain_depth: usize,
}

impl MuteFilter {
    pub fn new(
        statuses: Arc<dyn StatusesRepo>,
        mutes: Arc<dyn MutesRepo>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            statuses,
            mutes,
            cache: DecisionCache::new("mutes", config.mute_limit_non_zero()),
            max_chain_depth: crate::application::visibility::DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    pub fn with_max_chain_depth(mut self, depth: usize) -> Self {
        self.max_chain_depth = depth.max(1);
        self
    }

    /// Whether `status` is muted for `requester` in timelines.
    pub async fn status_muted(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<bool, MuteError> {
        let details = self.status_mute_details(ctx, requester, status).await?;
        Ok(details.muted(OffsetDateTime::now_utc()))
    }

    /// Whether notifications about `status` are muted for `requester`.
    pub async fn status_notifications_muted(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<bool, MuteError> {
        let details = self.status_mute_details(ctx, requester, status).await?;
        Ok(details.notifications_muted(OffsetDateTime::now_utc()))
    }

    #[instrument(skip_all, fields(status_id = %status.id))]
    pub async fn status_mute_details(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<MuteDetails, MuteError> {
        let Some(requester) = requester else {
            return Ok(MuteDetails::default());
        };

        let key = DecisionKey::new(KIND_STATUS_MUTE, Some(&requester.id), status.id.clone());
        let details = self
            .cache
            .load(key, || async {
                self.compute_details(ctx, requester, status).await
            })
            .await?;
        Ok(details.unwrap_or_default())
    }

    async fn compute_details(
        &self,
        ctx: &FeedContext,
        requester: &AccountRecord,
        status: &StatusRecord,
    ) -> Result<Computed<MuteDetails>, MuteError> {
        let mutes: HashMap<String, UserMuteRecord> = self
            .mutes
            .mutes_for_account(&requester.id)
            .await?
            .into_iter()
            .map(|mute| (mute.target_account_id.clone(), mute))
            .collect();

        let mut details = MuteDetails::default();
        if mutes.is_empty() {
            return Ok(Computed::Ready(details));
        }

        let mut seen = HashSet::from([status.id.clone()]);
        let mut next = status.clone();
        loop {
            ctx.check()?;

            match self.related_mutes(requester, &next, &mutes).await? {
                Some(related) => {
                    for mute in related {
                        details.absorb(mute);
                    }
                }
                None => return Ok(Computed::Indeterminate),
            }

            if !next.is_reply() {
                break;
            }
            let Some(parent_id) = next.in_reply_to_id.clone() else {
                debug!(status_id = %next.id, "reply parent not yet fetched");
                return Ok(Computed::Indeterminate);
            };
            if seen.len() > self.max_chain_depth || !seen.insert(parent_id.clone()) {
                break;
            }
            next = match optional(self.statuses.get_status(&parent_id).await)? {
                Some(parent) => parent,
                None => return Ok(Computed::Indeterminate),
            };
        }

        Ok(Computed::Ready(details))
    }

    /// Mutes held against the accounts related to `status`; `None` when a boosted status is
    /// not stored yet.
    async fn related_mutes<'m>(
        &self,
        requester: &AccountRecord,
        status: &StatusRecord,
        mutes: &'m HashMap<String, UserMuteRecord>,
    ) -> Result<Option<Vec<&'m UserMuteRecord>>, MuteError> {
        if status.account_id == requester.id {
            return Ok(Some(Vec::new()));
        }

        let mut related = Vec::new();
        let boosted;
        let target = match status.boost_of_id.as_deref() {
            Some(boost_of_id) => {
                related.extend(mutes.get(&status.account_id));
                match optional(self.statuses.get_status(boost_of_id).await)? {
                    Some(original) => {
                        boosted = original;
                        &boosted
                    }
                    None => return Ok(None),
                }
            }
            None => status,
        };

        related.extend(mutes.get(&target.account_id));
        related.extend(
            target
                .mentions
                .iter()
                .filter(|mentioned| **mentioned != requester.id)
                .filter_map(|mentioned| mutes.get(mentioned)),
        );
        Ok(Some(related))
    }

    pub fn invalidate_status(&self, status_id: &str) -> usize {
        self.cache.invalidate_item(status_id)
    }

    /// Forget cached details for `account_id`, e.g. after it mutes or unmutes someone.
    pub fn invalidate_requester(&self, account_id: &str) -> usize {
        self.cache.invalidate_requester(account_id)
    }
}
