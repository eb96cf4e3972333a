//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{FilterAction, FilterContexts, Visibility, WebVisibility};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub username: String,
    /// Remote host of the account; `None` for local accounts.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub suspended: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_true")]
    pub approved: bool,
    #[serde(default = "default_true")]
    pub confirmed: bool,
    #[serde(default)]
    pub web_visibility: WebVisibility,
}

impl AccountRecord {
    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    /// `username` for local accounts, `username@domain` for remote ones.
    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{domain}", self.username),
            None => self.username.clone(),
        }
    }

    /// Local accounts must be usable before their posts or requests count.
    pub fn is_usable(&self) -> bool {
        if self.suspended {
            return false;
        }
        if self.is_local() {
            return !self.disabled && self.approved && self.confirmed;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollRecord {
    pub options: Vec<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub closes_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub id: String,
    pub account_id: String,
    #[serde(default = "default_true")]
    pub local: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub visibility: Visibility,
    #[serde(default)]
    pub content_warning: String,
    /// HTML body.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    /// Set whenever the post is a reply, even before the parent has been fetched.
    #[serde(default)]
    pub in_reply_to_uri: Option<String>,
    #[serde(default)]
    pub in_reply_to_account_id: Option<String>,
    #[serde(default)]
    pub boost_of_id: Option<String>,
    #[serde(default)]
    pub boost_of_account_id: Option<String>,
    /// Ids of mentioned accounts.
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
    #[serde(default)]
    pub poll: Option<PollRecord>,
    #[serde(default)]
    pub pending_approval: bool,
}

impl StatusRecord {
    pub fn is_boost(&self) -> bool {
        self.boost_of_id.is_some()
    }

    pub fn is_reply(&self) -> bool {
        self.in_reply_to_uri.is_some() || self.in_reply_to_id.is_some()
    }

    pub fn mentions_account(&self, account_id: &str) -> bool {
        self.mentions.iter().any(|id| id == account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowRecord {
    pub account_id: String,
    pub target_account_id: String,
    #[serde(default = "default_true")]
    pub show_reblogs: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub account_id: String,
    pub target_account_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMuteRecord {
    pub account_id: String,
    pub target_account_id: String,
    /// Also silence notifications about the target.
    #[serde(default)]
    pub notifications: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl UserMuteRecord {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterKeywordRecord {
    pub id: String,
    pub keyword: String,
    #[serde(default)]
    pub whole_word: bool,
    /// Treat `keyword` as a regular expression instead of a literal.
    #[serde(default)]
    pub regex: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStatusRecord {
    pub id: String,
    pub status_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRecord {
    pub id: String,
    pub account_id: String,
    pub title: String,
    pub action: FilterAction,
    pub contexts: FilterContexts,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub keywords: Vec<FilterKeywordRecord>,
    #[serde(default)]
    pub statuses: Vec<FilterStatusRecord>,
}

impl FilterRecord {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

fn default_true() -> bool {
    true
}
