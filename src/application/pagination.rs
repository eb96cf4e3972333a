//! Identifier-bounded pagination shared by timeline reads.
//!
//! A [`Page`] is a window between two exclusive [`Boundary`] values. Callers page "down" with
//! `max_id`, "up" with `min_id` (ascending, reversed before return) and refresh with `since_id`
//! (descending from the top, stopping at the boundary).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::domain::ids::{MAX_ID, MIN_ID, within_exclusive};

pub const MIN_ID_KEY: &str = "min_id";
pub const SINCE_ID_KEY: &str = "since_id";
pub const MAX_ID_KEY: &str = "max_id";
pub const LIMIT_KEY: &str = "limit";

pub const DEFAULT_LIMIT: usize = 20;
pub const MIN_LIMIT: usize = 2;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Order {
    Ascending,
    Descending,
}

/// One edge of a page window: the query key it came from, its value and the walk direction it
/// implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub name: String,
    pub value: String,
    pub order: Order,
}

impl Boundary {
    pub fn min_id(value: impl Into<String>) -> Self {
        Self {
            name: MIN_ID_KEY.to_string(),
            value: value.into(),
            order: Order::Ascending,
        }
    }

    pub fn since_id(value: impl Into<String>) -> Self {
        Self {
            name: SINCE_ID_KEY.to_string(),
            value: value.into(),
            order: Order::Descending,
        }
    }

    pub fn max_id(value: impl Into<String>) -> Self {
        Self {
            name: MAX_ID_KEY.to_string(),
            value: value.into(),
            order: Order::Descending,
        }
    }

    /// Same key name with a new value, walking the way that key walks when parsed from a query.
    fn renewed(&self, value: impl Into<String>) -> Self {
        let order = match self.name.as_str() {
            MIN_ID_KEY => Order::Ascending,
            _ => Order::Descending,
        };
        Self {
            name: self.name.clone(),
            value: value.into(),
            order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub min: Option<Boundary>,
    pub max: Option<Boundary>,
    pub limit: usize,
}

impl Page {
    /// First page from the top of a timeline.
    pub fn top(limit: usize) -> Self {
        Self {
            min: None,
            max: None,
            limit,
        }
    }

    pub fn older_than(max_id: impl Into<String>, limit: usize) -> Self {
        Self {
            min: None,
            max: Some(Boundary::max_id(max_id)),
            limit,
        }
    }

    pub fn newer_than(min_id: impl Into<String>, limit: usize) -> Self {
        Self {
            min: Some(Boundary::min_id(min_id)),
            max: None,
            limit,
        }
    }

    pub fn since(since_id: impl Into<String>, limit: usize) -> Self {
        Self {
            min: Some(Boundary::since_id(since_id)),
            max: None,
            limit,
        }
    }

    /// Parse `min_id`, `since_id`, `max_id` and `limit` from query pairs.
    ///
    /// `since_id` wins over `min_id` when both are given. Empty values count as absent. The limit
    /// defaults to [`DEFAULT_LIMIT`] and is clamped into `MIN_LIMIT..=MAX_LIMIT`.
    pub fn from_query<'a, I>(pairs: I) -> Result<Self, PaginationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut min_id = None;
        let mut since_id = None;
        let mut max_id = None;
        let mut limit = DEFAULT_LIMIT;

        for (key, value) in pairs {
            let value = value.trim();
            match key {
                MIN_ID_KEY if !value.is_empty() => min_id = Some(value.to_string()),
                SINCE_ID_KEY if !value.is_empty() => since_id = Some(value.to_string()),
                MAX_ID_KEY if !value.is_empty() => max_id = Some(value.to_string()),
                LIMIT_KEY if !value.is_empty() => {
                    limit = value
                        .parse::<usize>()
                        .map_err(|err| PaginationError::InvalidLimit(format!("{value}: {err}")))?;
                }
                _ => {}
            }
        }

        let min = match (since_id, min_id) {
            (Some(since), _) => Some(Boundary::since_id(since)),
            (None, Some(min)) => Some(Boundary::min_id(min)),
            (None, None) => None,
        };

        Ok(Self {
            min,
            max: max_id.map(Boundary::max_id),
            limit: limit.clamp(MIN_LIMIT, MAX_LIMIT),
        })
    }

    /// Walk direction: the minimum boundary's order if set, else the maximum's, else descending.
    pub fn order(&self) -> Order {
        if let Some(min) = &self.min {
            return min.order;
        }
        if let Some(max) = &self.max {
            return max.order;
        }
        Order::Descending
    }

    pub fn min_value(&self) -> &str {
        self.min.as_ref().map_or(MIN_ID, |min| min.value.as_str())
    }

    pub fn max_value(&self) -> &str {
        self.max.as_ref().map_or(MAX_ID, |max| max.value.as_str())
    }

    /// Fill the implicit boundary for the walk direction so "no cursor" starts from the right end.
    pub fn normalized(mut self) -> Self {
        match self.order() {
            Order::Ascending if self.min.is_none() => {
                self.min = Some(Boundary::min_id(MIN_ID));
            }
            Order::Descending if self.max.is_none() => {
                self.max = Some(Boundary::max_id(MAX_ID));
            }
            _ => {}
        }
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        within_exclusive(id, self.min_value(), self.max_value())
    }

    /// Page of older items, starting below `lo`.
    pub fn next(&self, lo: &str, hi: &str) -> Option<Page> {
        if lo.is_empty() || hi.is_empty() {
            return None;
        }
        let max = self
            .max
            .as_ref()
            .map_or_else(|| Boundary::max_id(lo), |max| max.renewed(lo));
        Some(Page {
            min: None,
            max: Some(max),
            limit: self.limit,
        })
    }

    /// Page of newer items, starting above `hi`.
    pub fn prev(&self, lo: &str, hi: &str) -> Option<Page> {
        if lo.is_empty() || hi.is_empty() {
            return None;
        }
        let min = self
            .min
            .as_ref()
            .map_or_else(|| Boundary::min_id(hi), |min| min.renewed(hi));
        Some(Page {
            min: Some(min),
            max: None,
            limit: self.limit,
        })
    }

    /// Build a link for this page from `base`, keeping any non-paging query parameters of `base`.
    pub fn to_link_url(&self, base: &Url) -> Url {
        let extra: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(key, _)| {
                !matches!(
                    key.as_ref(),
                    MIN_ID_KEY | SINCE_ID_KEY | MAX_ID_KEY | LIMIT_KEY
                )
            })
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = base.clone();
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in &extra {
                query.append_pair(key, value);
            }
            for boundary in [&self.min, &self.max].into_iter().flatten() {
                if !boundary.value.is_empty() {
                    query.append_pair(&boundary.name, &boundary.value);
                }
            }
            query.append_pair(LIMIT_KEY, &self.limit.to_string());
        }
        url
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) limit={}",
            self.min_value(),
            self.max_value(),
            self.limit
        )
    }
}

/// Format a `Link` header value from optional next/prev pages.
pub fn link_header(base: &Url, next: Option<&Page>, prev: Option<&Page>) -> Option<String> {
    let mut parts = Vec::with_capacity(2);
    if let Some(next) = next {
        parts.push(format!("<{}>; rel=\"next\"", next.to_link_url(base)));
    }
    if let Some(prev) = prev {
        parts.push(format!("<{}>; rel=\"prev\"", prev.to_link_url(base)));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}
