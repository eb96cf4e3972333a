use std::collections::HashSet;

use tracing::{debug, instrument, trace};

use crate::application::context::FeedContext;
use crate::application::repos::optional;
use crate::cache::DecisionKey;
use crate::domain::entities::{AccountRecord, StatusRecord};
use crate::domain::types::Visibility;

use super::home::is_too_far_in_future;
use super::{Decision, KIND_PUBLIC_TIMELINEABLE, VisibilityError, VisibilityFilter};

impl VisibilityFilter {
    /// Whether `status` belongs in the public timeline as seen by `requester`.
    #[instrument(skip_all, fields(status_id = %status.id))]
    pub async fn status_public_timelineable(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<bool, VisibilityError> {
        let key = DecisionKey::new(
            KIND_PUBLIC_TIMELINEABLE,
            requester.map(|account| account.id.as_str()),
            status.id.clone(),
        );
        let timelineable = self
            .cache
            .load(key, || async {
                self.decide_public_timelineable(ctx, requester, status)
                    .await
                    .map(Decision::into_computed)
            })
            .await?;
        Ok(timelineable.unwrap_or(false))
    }

    pub(super) async fn decide_public_timelineable(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<Decision, VisibilityError> {
        if is_too_far_in_future(status) || status.is_boost() {
            return Ok(Decision::NotVisible);
        }

        if status.visibility != Visibility::Public {
            return Ok(Decision::NotVisible);
        }

        if status.is_reply() {
            match self.single_author_thread(ctx, status).await? {
                Decision::Visible => {}
                other => return Ok(other),
            }
        }

        let visible = self.status_visible(ctx, requester, status).await?;
        Ok(Decision::from_bool(visible))
    }

    /// Visible when every ancestor of `status` shares its author.
    async fn single_author_thread(
        &self,
        ctx: &FeedContext,
        status: &StatusRecord,
    ) -> Result<Decision, VisibilityError> {
        if status
            .in_reply_to_account_id
            .as_deref()
            .is_some_and(|parent_author| parent_author != status.account_id)
        {
            trace!("reply to another account");
            return Ok(Decision::NotVisible);
        }

        let mut seen = HashSet::from([status.id.clone()]);
        let mut next = status.clone();
        while next.is_reply() {
            ctx.check()?;

            let Some(parent_id) = next.in_reply_to_id.clone() else {
                debug!(status_id = %next.id, "reply parent not yet fetched");
                return Ok(Decision::Indeterminate);
            };
            if seen.len() > self.max_chain_depth || !seen.insert(parent_id.clone()) {
                return Ok(Decision::NotVisible);
            }

            let Some(parent) = optional(self.statuses.get_status(&parent_id).await)? else {
                return Ok(Decision::Indeterminate);
            };
            if parent.account_id != status.account_id {
                return Ok(Decision::NotVisible);
            }
            next = parent;
        }

        Ok(Decision::Visible)
    }
}
