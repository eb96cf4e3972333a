use std::collections::HashSet;

use time::{Duration, OffsetDateTime};
use tracing::{debug, instrument, trace, warn};

use crate::application::context::FeedContext;
use crate::application::repos::optional;
use crate::cache::DecisionKey;
use crate::domain::entities::{AccountRecord, StatusRecord};

use super::{Decision, KIND_HOME_TIMELINEABLE, VisibilityError, VisibilityFilter};

/// Posts dated further ahead than this are never timelined.
pub(crate) const MAX_FUTURE_SKEW: Duration = Duration::hours(24);

pub(crate) fn is_too_far_in_future(status: &StatusRecord) -> bool {
    status.created_at > OffsetDateTime::now_utc() + MAX_FUTURE_SKEW
}

/// Outcome of checking one post of a reply chain against the timeline owner.
struct Conversation {
    visible: bool,
    not_visible: bool,
}

impl VisibilityFilter {
    /// Whether `status` belongs in `owner`'s home timeline.
    #[instrument(skip_all, fields(owner_id = %owner.id, status_id = %status.id))]
    pub async fn status_home_timelineable(
        &self,
        ctx: &FeedContext,
        owner: &AccountRecord,
        status: &StatusRecord,
    ) -> Result<bool, VisibilityError> {
        let key = DecisionKey::new(
            KIND_HOME_TIMELINEABLE,
            Some(owner.id.as_str()),
            status.id.clone(),
        );
        let timelineable = self
            .cache
            .load(key, || async {
                self.decide_home_timelineable(ctx, owner, status)
                    .await
                    .map(Decision::into_computed)
            })
            .await?;
        Ok(timelineable.unwrap_or(false))
    }

    pub(super) async fn decide_home_timelineable(
        &self,
        ctx: &FeedContext,
        owner: &AccountRecord,
        status: &StatusRecord,
    ) -> Result<Decision, VisibilityError> {
        if is_too_far_in_future(status) {
            warn!(status_id = %status.id, created_at = %status.created_at, "status more than 24h in the future");
            return Ok(Decision::NotVisible);
        }

        if !self.status_visible(ctx, Some(owner), status).await? {
            trace!("status not visible to timeline owner");
            return Ok(Decision::NotVisible);
        }

        if status.account_id == owner.id || status.mentions_account(&owner.id) {
            return Ok(Decision::Visible);
        }

        let mut next = status.clone();
        let mut one_author = true;
        let mut visible = false;
        let mut seen = HashSet::from([status.id.clone()]);

        loop {
            ctx.check()?;

            if next.account_id == owner.id || next.mentions_account(&owner.id) {
                visible = true;
                break;
            }

            let conversation = self.visible_conversation(ctx, owner, &next).await?;
            if conversation.not_visible {
                trace!(status_id = %next.id, "conversation not visible to timeline owner");
                return Ok(Decision::NotVisible);
            }
            if conversation.visible {
                visible = true;
                break;
            }

            if one_author {
                one_author = next.account_id == status.account_id;
            }

            if !next.is_reply() {
                break;
            }

            let Some(parent_id) = next.in_reply_to_id.clone() else {
                debug!(status_id = %next.id, "reply parent not yet fetched");
                return Ok(Decision::Indeterminate);
            };

            if seen.len() > self.max_chain_depth || !seen.insert(parent_id.clone()) {
                warn!(
                    status_id = %status.id,
                    parent_id = %parent_id,
                    depth = seen.len(),
                    "reply chain too deep or cyclic"
                );
                return Ok(Decision::NotVisible);
            }

            next = match optional(self.statuses.get_status(&parent_id).await)? {
                Some(parent) => parent,
                None => {
                    debug!(parent_id = %parent_id, "reply parent not stored yet");
                    return Ok(Decision::Indeterminate);
                }
            };
        }

        if next.id != status.id && !one_author && !visible {
            trace!("ignoring visible reply in conversation irrelevant to owner");
            return Ok(Decision::NotVisible);
        }

        let Some(follow) = optional(
            self.relationships
                .get_follow(&owner.id, &status.account_id)
                .await,
        )?
        else {
            trace!("ignoring status from unfollowed author");
            return Ok(Decision::NotVisible);
        };

        if status.is_boost() && !follow.show_reblogs {
            return Ok(Decision::NotVisible);
        }

        Ok(Decision::Visible)
    }

    async fn visible_conversation(
        &self,
        ctx: &FeedContext,
        owner: &AccountRecord,
        status: &StatusRecord,
    ) -> Result<Conversation, VisibilityError> {
        if !self.status_visible(ctx, Some(owner), status).await? {
            return Ok(Conversation {
                visible: false,
                not_visible: true,
            });
        }

        if status.visibility.is_open()
            && !self
                .relationships
                .is_following(&owner.id, &status.account_id)
                .await?
        {
            return Ok(Conversation {
                visible: false,
                not_visible: false,
            });
        }

        let mut follows_mention = false;
        for mention in &status.mentions {
            if self.relationships.is_blocked(&owner.id, mention).await? {
                return Ok(Conversation {
                    visible: false,
                    not_visible: true,
                });
            }
            if !follows_mention {
                follows_mention = self.relationships.is_following(&owner.id, mention).await?;
            }
        }

        Ok(Conversation {
            visible: follows_mention,
            not_visible: false,
        })
    }
}
