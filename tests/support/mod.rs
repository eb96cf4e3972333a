#![allow(dead_code)]

use std::sync::Arc;

use feedline::application::context::FeedContext;
use feedline::application::feed::FeedServices;
use feedline::application::pagination::Page;
use feedline::application::timeline::{
    PublicTimeline, TimelineConfig, TimelineManager, TimelinePage,
};
use feedline::application::visibility::DEFAULT_MAX_CHAIN_DEPTH;
use feedline::cache::CacheConfig;
use feedline::domain::entities::{
    AccountRecord, BlockRecord, FilterKeywordRecord, FilterRecord, FollowRecord, StatusRecord,
    UserMuteRecord,
};
use feedline::domain::types::{
    FilterAction, FilterContext, FilterContexts, Visibility, WebVisibility,
};
use feedline::infra::memory::InMemoryStore;
use time::{Duration, OffsetDateTime};

pub fn status_id(n: usize) -> String {
    format!("01HS{n:022}")
}

pub fn account(id: &str) -> AccountRecord {
    AccountRecord {
        id: id.to_string(),
        username: id.to_lowercase(),
        domain: None,
        display_name: id.to_string(),
        locked: false,
        suspended: false,
        disabled: false,
        approved: true,
        confirmed: true,
        web_visibility: WebVisibility::Public,
    }
}

pub fn remote_account(id: &str, domain: &str) -> AccountRecord {
    AccountRecord {
        domain: Some(domain.to_string()),
        ..account(id)
    }
}

pub fn post(n: usize, author: &str) -> StatusRecord {
    post_with(n, author, Visibility::Public)
}

pub fn post_with(n: usize, author: &str, visibility: Visibility) -> StatusRecord {
    StatusRecord {
        id: status_id(n),
        account_id: author.to_string(),
        local: true,
        created_at: OffsetDateTime::now_utc() - Duration::hours(1),
        visibility,
        content_warning: String::new(),
        content: format!("<p>post {n} by {author}</p>"),
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

pub fn reply(n: usize, author: &str, parent: &StatusRecord, visibility: Visibility) -> StatusRecord {
    StatusRecord {
        in_reply_to_id: Some(parent.id.clone()),
        in_reply_to_uri: Some(format!("https://example.test/statuses/{}", parent.id)),
        in_reply_to_account_id: Some(parent.account_id.clone()),
        mentions: if parent.account_id == author {
            Vec::new()
        } else {
            vec![parent.account_id.clone()]
        },
        ..post_with(n, author, visibility)
    }
}

pub fn boost(n: usize, booster: &str, original: &StatusRecord) -> StatusRecord {
    StatusRecord {
        boost_of_id: Some(original.id.clone()),
        boost_of_account_id: Some(original.account_id.clone()),
        content: String::new(),
        ..post(n, booster)
    }
}

pub fn follow(from: &str, to: &str) -> FollowRecord {
    FollowRecord {
        account_id: from.to_string(),
        target_account_id: to.to_string(),
        show_reblogs: true,
    }
}

pub fn block(from: &str, to: &str) -> BlockRecord {
    BlockRecord {
        account_id: from.to_string(),
        target_account_id: to.to_string(),
    }
}

pub fn mute(from: &str, to: &str, expires_at: Option<OffsetDateTime>) -> UserMuteRecord {
    UserMuteRecord {
        account_id: from.to_string(),
        target_account_id: to.to_string(),
        notifications: false,
        expires_at,
    }
}

pub fn keyword_filter(
    id: &str,
    owner: &str,
    action: FilterAction,
    contexts: &[FilterContext],
    keywords: &[&str],
) -> FilterRecord {
    FilterRecord {
        id: id.to_string(),
        account_id: owner.to_string(),
        title: format!("filter {id}"),
        action,
        contexts: contexts.iter().copied().collect::<FilterContexts>(),
        expires_at: None,
        keywords: keywords
            .iter()
            .enumerate()
            .map(|(index, keyword)| FilterKeywordRecord {
                id: format!("{id}-{index}"),
                keyword: keyword.to_string(),
                whole_word: true,
                regex: false,
            })
            .collect(),
        statuses: Vec::new(),
    }
}

/// In-memory store plus the services and timelines built on it.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub services: FeedServices,
    pub timelines: Arc<TimelineManager>,
    pub public: PublicTimeline,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(TimelineConfig::default())
    }

    pub fn with_config(config: TimelineConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let services = FeedServices::new(
            store.clone(),
            &CacheConfig::default(),
            DEFAULT_MAX_CHAIN_DEPTH,
        );
        Self {
            timelines: Arc::new(TimelineManager::new(services.clone(), config)),
            public: PublicTimeline::new(services.clone(), &config),
            services,
            store,
        }
    }

    pub fn accounts(&self, ids: &[&str]) {
        for id in ids {
            self.store.insert_account(account(id));
        }
    }

    pub fn statuses(&self, statuses: impl IntoIterator<Item = StatusRecord>) {
        for status in statuses {
            self.store.insert_status(status);
        }
    }

    pub async fn home(&self, account_id: &str, page: Page) -> TimelinePage {
        self.timelines
            .get(&FeedContext::new(), account_id, page)
            .await
            .expect("home timeline should load")
    }

    pub async fn public(&self, viewer: Option<&str>, page: Page, local_only: bool) -> TimelinePage {
        let viewer = viewer.map(account);
        self.public
            .get(&FeedContext::new(), viewer.as_ref(), page, local_only)
            .await
            .expect("public timeline should load")
    }
}

pub fn ids(page: &TimelinePage) -> Vec<String> {
    page.items.iter().map(|item| item.id.clone()).collect()
}

pub fn assert_strictly_descending(page: &TimelinePage) {
    let ids = ids(page);
    assert!(
        ids.windows(2).all(|pair| pair[0] > pair[1]),
        "ids not strictly descending: {ids:?}"
    );
}
