//! Status filter engine: per-viewer keyword and status filters with hide and warn actions.
//!
//! Results for a (viewer, status) pair are computed once across all five filter contexts and
//! cached. Expiry is checked again on every read, so a cached result set stays correct as filters
//! lapse.

mod fields;
mod keyword;
mod result;

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, instrument, trace};

use crate::application::context::{FeedContext, Interrupted};
use crate::application::repos::{FiltersRepo, RepoError, StatusesRepo, optional};
use crate::cache::{CacheConfig, Computed, DecisionCache, DecisionKey};
use crate::domain::entities::{AccountRecord, FilterRecord, StatusRecord};
use crate::domain::types::{FilterAction, FilterContext};

pub use fields::filterable_fields;
pub use keyword::compile_keyword;
pub use result::{FilterMatch, FilterResult, FilterResults, FilterSummary};

use keyword::{CompiledKeyword, compile_filter};

const KIND_STATUS_FILTER: &str = "status_filter";

#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

pub struct StatusFilter {
    statuses: Arc<dyn StatusesRepo>,
    filters: Arc<dyn FiltersRepo>,
    cache: DecisionCache<Arc<FilterResults>>,
}

impl StatusFilter {
    pub fn new(
        statuses: Arc<dyn StatusesRepo>,
        filters: Arc<dyn FiltersRepo>,
        config: &CacheConfig,
    ) -> Self {
        Self {
            statuses,
            filters,
            cache: DecisionCache::new("status_filter", config.filter_limit_non_zero()),
        }
    }

    /// Unexpired warn results for `context`, or `hidden = true` when a hide filter applies.
    pub async fn results_in_context(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
        context: FilterContext,
    ) -> Result<(Vec<FilterResult>, bool), FilterError> {
        let all = self.status_filter_results(ctx, requester, status).await?;
        let now = OffsetDateTime::now_utc();

        let mut results = Vec::new();
        for record in all.in_context(context) {
            if record.is_expired(now) {
                continue;
            }
            match &record.result {
                None => return Ok((Vec::new(), true)),
                Some(result) => results.push(result.clone()),
            }
        }
        Ok((results, false))
    }

    /// Cached results for `status` as seen by `requester`, across every context.
    #[instrument(skip_all, fields(status_id = %status.id))]
    pub async fn status_filter_results(
        &self,
        ctx: &FeedContext,
        requester: Option<&AccountRecord>,
        status: &StatusRecord,
    ) -> Result<Arc<FilterResults>, FilterError> {
        let Some(requester) = requester else {
            return Ok(Arc::default());
        };

        let key = DecisionKey::new(KIND_STATUS_FILTER, Some(&requester.id), status.id.clone());
        let results = self
            .cache
            .load(key, || async {
                self.compute_results(ctx, requester, status).await
            })
            .await?;
        Ok(results.unwrap_or_default())
    }

    async fn compute_results(
        &self,
        ctx: &FeedContext,
        requester: &AccountRecord,
        status: &StatusRecord,
    ) -> Result<Computed<Arc<FilterResults>>, FilterError> {
        ctx.check()?;

        let boosted;
        let target = match status.boost_of_id.as_deref() {
            Some(boost_of_id) => match optional(self.statuses.get_status(boost_of_id).await)? {
                Some(original) => {
                    boosted = original;
                    &boosted
                }
                None => {
                    debug!(boost_of_id, "boosted status not stored yet");
                    return Ok(Computed::Indeterminate);
                }
            },
            None => status,
        };

        let filters = self.filters.filters_for_account(&requester.id).await?;
        let results = evaluate(&filters, target, OffsetDateTime::now_utc());
        trace!(filters = filters.len(), empty = results.is_empty(), "filter results computed");
        Ok(Computed::Ready(Arc::new(results)))
    }

    /// Forget cached results about `status_id`.
    pub fn invalidate_status(&self, status_id: &str) -> usize {
        self.cache.invalidate_item(status_id)
    }

    /// Forget cached results for `account_id`, e.g. after its filters change.
    pub fn invalidate_requester(&self, account_id: &str) -> usize {
        self.cache.invalidate_requester(account_id)
    }
}

/// Evaluate `filters` against `status` at `now`. Hide filters stop at their first match; warn
/// filters collect every keyword and status match.
pub fn evaluate(filters: &[FilterRecord], status: &StatusRecord, now: OffsetDateTime) -> FilterResults {
    let fields = filterable_fields(status);
    let mut results = FilterResults::default();

    for filter in filters {
        if filter.is_expired(now) {
            continue;
        }

        let keywords = compile_filter(filter);
        let result = match filter.action {
            FilterAction::Warn => {
                let keyword_matches: Vec<String> = keywords
                    .iter()
                    .filter(|keyword| keyword.matches_any(&fields))
                    .map(|keyword| keyword.keyword.clone())
                    .collect();
                let status_matches: Vec<String> = filter
                    .statuses
                    .iter()
                    .filter(|entry| entry.status_id == status.id)
                    .map(|entry| entry.status_id.clone())
                    .collect();
                if keyword_matches.is_empty() && status_matches.is_empty() {
                    continue;
                }
                Some(FilterResult {
                    filter: FilterSummary::from(filter),
                    keyword_matches,
                    status_matches,
                })
            }
            FilterAction::Hide => {
                if !hide_matches(filter, &keywords, &status.id, &fields) {
                    continue;
                }
                None
            }
        };

        let record = FilterMatch {
            expires_at: filter.expires_at,
            result,
        };
        for context in filter.contexts.iter() {
            results.push(context, record.clone());
        }
    }

    results.sort();
    results
}

fn hide_matches(
    filter: &FilterRecord,
    keywords: &[CompiledKeyword],
    status_id: &str,
    fields: &[String],
) -> bool {
    filter
        .statuses
        .iter()
        .any(|entry| entry.status_id == status_id)
        || keywords.iter().any(|keyword| keyword.matches_any(fields))
}
