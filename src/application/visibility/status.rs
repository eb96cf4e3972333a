use std::collections::BTreeSet;

use tracing::{instrument, trace};

use crate::application::context::FeedContext;
use crate::application::repos::optional;
use crate::cache::DecisionKey;
use crate::domain::entities::{AccountRecord, StatusRecord};
use crate::domain::types::Visibility;

use super::{Decision, KIND_STATUS_VISIBLE, RelevantAccounts, VisibilityError, VisibilityFilter};

impl VisibilityFilter {
    /// Whether `status` may be shown to `requester` (`None` for unauthenticated viewers).
    #[instrument(skip_all, fields(status_id = %status.id))]
    pub async fn status_visible(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<bool, VisibilityError> {
        let key = DecisionKey::new(
            KIND_STATUS_VISIBLE,
            requester.map(|account| account.id.as_str()),
            status.id.clone(),
        );
        let visible = self
            .cache
            .load(key, || async {
                self.decide_status_visible(ctx, requester, status)
                    .await
                    .map(Decision::into_computed)
            })
            .await?;
        Ok(visible.unwrap_or(false))
    }

    pub(super) async fn decide_status_visible(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<Decision, VisibilityError> {
        let (decision, boosted) = self.decide_one(ctx, requester, status).await?;
        match (decision, boosted) {
            (Decision::Visible, Some(boosted)) => {
                let (decision, _) = self.decide_one(ctx, requester, &boosted).await?;
                Ok(decision)
            }
            (decision, _) => Ok(decision),
        }
    }

    /// Decide for one post; a boost is returned alongside the post it boosts so the caller can
    /// check that post too.
    async fn decide_one(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<(Decision, Option<StatusRecord>), VisibilityError> {
        ctx.check()?;

        let boosted = match status.boost_of_id.as_deref() {
            Some(boost_of_id) => match optional(self.statuses.get_status(boost_of_id).await)? {
                Some(boosted) if !boosted.is_boost() => Some(boosted),
                _ => {
                    trace!(boost_of_id, "boosted status unavailable");
                    return Ok((Decision::NotVisible, None));
                }
            },
            None => None,
        };
        let relevant = RelevantAccounts::collect(status, boosted.as_ref());

        let Some(author) = optional(self.accounts.get_account(&status.account_id).await)? else {
            trace!(account_id = %status.account_id, "status author missing");
            return Ok((Decision::NotVisible, None));
        };

        if !author.is_usable() {
            trace!(account_id = %author.id, "status author suspended or not activated");
            return Ok((Decision::NotVisible, None));
        }

        if self.any_domain_blocked(&relevant, &author).await? {
            trace!("status involves a blocked domain");
            return Ok((Decision::NotVisible, None));
        }

        if status.pending_approval && !may_see_pending(requester, status) {
            return Ok((Decision::NotVisible, None));
        }

        match requester {
            None => {
                let permitted = if status.local {
                    author.web_visibility.permits(status.visibility)
                } else {
                    status.visibility == Visibility::Public
                };
                if !permitted {
                    return Ok((Decision::NotVisible, None));
                }
            }
            Some(requester) => {
                if requester.id == author.id {
                    return Ok((Decision::Visible, None));
                }

                if !requester.is_usable() {
                    return Ok((Decision::NotVisible, None));
                }

                for account_id in relevant.ids() {
                    if account_id == requester.id {
                        continue;
                    }
                    if self
                        .relationships
                        .is_blocked(&requester.id, account_id)
                        .await?
                    {
                        trace!(account_id, "block between requester and related account");
                        return Ok((Decision::NotVisible, None));
                    }
                }

                if relevant.mentions_account(&requester.id) {
                    return Ok((Decision::Visible, None));
                }

                let permitted = match status.visibility {
                    Visibility::Public | Visibility::Unlocked => true,
                    Visibility::FollowersOnly => {
                        self.relationships
                            .is_following(&requester.id, &author.id)
                            .await?
                    }
                    Visibility::MutualsOnly => {
                        self.relationships
                            .is_mutual(&requester.id, &author.id)
                            .await?
                    }
                    Visibility::Direct => false,
                };
                if !permitted {
                    return Ok((Decision::NotVisible, None));
                }
            }
        }

        Ok((Decision::Visible, boosted))
    }

    async fn any_domain_blocked(
        &self,
        relevant: &RelevantAccounts,
        author: &AccountRecord,
    ) -> Result<bool, VisibilityError> {
        let mut domains = BTreeSet::new();
        for account_id in relevant.ids() {
            let domain = if account_id == author.id {
                author.domain.clone()
            } else {
                optional(self.accounts.get_account(account_id).await)?
                    .and_then(|account| account.domain)
            };
            if let Some(domain) = domain {
                domains.insert(domain);
            }
        }

        if domains.is_empty() {
            return Ok(false);
        }

        let domains: Vec<String> = domains.into_iter().collect();
        Ok(self.relationships.are_domains_blocked(&domains).await?)
    }
}

/// Pending posts are only shown to the accounts that can approve them and their author.
fn may_see_pending(requester: Option<&AccountRecord>, status: &StatusRecord) -> bool {
    let Some(requester) = requester else {
        return false;
    };
    requester.id == status.account_id
        || status.in_reply_to_account_id.as_deref() == Some(requester.id.as_str())
        || status.boost_of_account_id.as_deref() == Some(requester.id.as_str())
}
