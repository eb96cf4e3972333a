use serde::Serialize;
use url::Url;

use crate::application::pagination::{Page, link_header};
use crate::application::prepare::StatusView;

/// One page of a timeline, newest first, with cursors for the neighbouring pages.
#[derive(Debug, Clone, Serialize)]
pub struct TimelinePage {
    pub items: Vec<StatusView>,
    pub lo: Option<String>,
    pub hi: Option<String>,
    #[serde(skip)]
    pub next: Option<Page>,
    #[serde(skip)]
    pub prev: Option<Page>,
}

impl TimelinePage {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            lo: None,
            hi: None,
            next: None,
            prev: None,
        }
    }

    /// Build a page from descending `items` requested with `page`.
    pub(super) fn from_items(items: Vec<StatusView>, page: &Page) -> Self {
        let (Some(hi), Some(lo)) = (
            items.first().map(|item| item.id.clone()),
            items.last().map(|item| item.id.clone()),
        ) else {
            return Self::empty();
        };
        Self {
            next: page.next(&lo, &hi),
            prev: page.prev(&lo, &hi),
            items,
            lo: Some(lo),
            hi: Some(hi),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.id.as_str()).collect()
    }

    /// `Link` header value pointing at the next and previous pages.
    pub fn link_header(&self, base: &Url) -> Option<String> {
        link_header(base, self.next.as_ref(), self.prev.as_ref())
    }
}
