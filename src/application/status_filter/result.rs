use std::cmp::Ordering;

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::entities::FilterRecord;
use crate::domain::types::{FilterAction, FilterContext};

/// Filter metadata attached to a warn match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    pub id: String,
    pub title: String,
    pub context: Vec<FilterContext>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub filter_action: FilterAction,
}

impl From<&FilterRecord> for FilterSummary {
    fn from(filter: &FilterRecord) -> Self {
        Self {
            id: filter.id.clone(),
            title: filter.title.clone(),
            context: filter.contexts.iter().collect(),
            expires_at: filter.expires_at,
            filter_action: filter.action,
        }
    }
}

/// One warn filter's matches against a status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    pub filter: FilterSummary,
    pub keyword_matches: Vec<String>,
    pub status_matches: Vec<String>,
}

/// A cached match record; `result` is `None` for hide filters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMatch {
    pub expires_at: Option<OffsetDateTime>,
    pub result: Option<FilterResult>,
}

impl FilterMatch {
    pub fn is_hide(&self) -> bool {
        self.result.is_none()
    }

    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Soonest expiry first, records without expiry last.
pub(super) fn by_expiry(a: &FilterMatch, b: &FilterMatch) -> Ordering {
    match (a.expires_at, b.expires_at) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

/// Match records for one (viewer, status) pair across every filter context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterResults {
    home: Vec<FilterMatch>,
    notifications: Vec<FilterMatch>,
    public: Vec<FilterMatch>,
    thread: Vec<FilterMatch>,
    account: Vec<FilterMatch>,
}

impl FilterResults {
    pub fn in_context(&self, context: FilterContext) -> &[FilterMatch] {
        match context {
            FilterContext::Home => &self.home,
            FilterContext::Notifications => &self.notifications,
            FilterContext::Public => &self.public,
            FilterContext::Thread => &self.thread,
            FilterContext::Account => &self.account,
        }
    }

    pub(super) fn push(&mut self, context: FilterContext, record: FilterMatch) {
        self.slot(context).push(record);
    }

    pub(super) fn sort(&mut self) {
        for context in FilterContext::ALL {
            self.slot(context).sort_by(by_expiry);
        }
    }

    pub fn is_empty(&self) -> bool {
        FilterContext::ALL
            .into_iter()
            .all(|context| self.in_context(context).is_empty())
    }

    fn slot(&mut self, context: FilterContext) -> &mut Vec<FilterMatch> {
        match context {
            FilterContext::Home => &mut self.home,
            FilterContext::Notifications => &mut self.notifications,
            FilterContext::Public => &mut self.public,
            FilterContext::Thread => &mut self.thread,
            FilterContext::Account => &mut self.account,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn hide(expires_at: Option<OffsetDateTime>) -> FilterMatch {
        FilterMatch {
            expires_at,
            result: None,
        }
    }

    #[test]
    fn unset_expiry_sorts_last() {
        let mut results = FilterResults::default();
        results.push(FilterContext::Home, hide(None));
        results.push(FilterContext::Home, hide(Some(datetime!(2030-06-01 00:00 UTC))));
        results.push(FilterContext::Home, hide(Some(datetime!(2030-01-01 00:00 UTC))));
        results.sort();

        let expiries: Vec<_> = results
            .in_context(FilterContext::Home)
            .iter()
            .map(|record| record.expires_at)
            .collect();
        assert_eq!(
            expiries,
            vec![
                Some(datetime!(2030-01-01 00:00 UTC)),
                Some(datetime!(2030-06-01 00:00 UTC)),
                None
            ]
        );
    }
}
