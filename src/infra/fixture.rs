//! TOML fixtures describing a small social graph.
//!
//! ```toml
//! blocked_domains = ["spam.example"]
//!
//! [[accounts]]
//! id = "01HACCOUNTALICE00000000000"
//! username = "alice"
//!
//! [[statuses]]
//! id = "01HSTATUS00000000000000001"
//! account_id = "01HACCOUNTALICE00000000000"
//! created_at = "2024-05-01T10:00:00Z"
//! visibility = "public"
//! content = "<p>hello</p>"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::domain::entities::{
    AccountRecord, BlockRecord, FilterRecord, FollowRecord, StatusRecord, UserMuteRecord,
};

use super::error::InfraError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub accounts: Vec<AccountRecord>,
    pub statuses: Vec<StatusRecord>,
    pub follows: Vec<FollowRecord>,
    pub blocks: Vec<BlockRecord>,
    pub mutes: Vec<UserMuteRecord>,
    pub filters: Vec<FilterRecord>,
    pub blocked_domains: Vec<String>,
}

impl Fixture {
    pub fn from_toml_str(source: &str) -> Result<Self, InfraError> {
        toml::from_str(source).map_err(|err| InfraError::fixture(err.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, InfraError> {
        let source = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&source)
            .map_err(|err| InfraError::fixture(format!("{}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FilterAction, FilterContext, Visibility};

    #[test]
    fn parses_full_fixture() {
        let fixture = Fixture::from_toml_str(
            r#"
blocked_domains = ["spam.example"]

[[accounts]]
id = "A1"
username = "alice"

[[accounts]]
id = "B1"
username = "bob"
domain = "remote.example"
locked = true

[[statuses]]
id = "S1"
account_id = "A1"
created_at = "2024-05-01T10:00:00Z"
visibility = "followers_only"
content = "<p>hi</p>"
mentions = ["B1"]

[[follows]]
account_id = "B1"
target_account_id = "A1"

[[filters]]
id = "F1"
account_id = "B1"
title = "spoilers"
action = "hide"
contexts = ["home", "public"]
expires_at = "2030-01-01T00:00:00Z"

[[filters.keywords]]
id = "K1"
keyword = "finale"
whole_word = true
"#,
        )
        .expect("fixture parses");

        assert_eq!(fixture.accounts.len(), 2);
        assert!(fixture.accounts[0].is_local());
        assert!(fixture.accounts[0].approved);
        assert_eq!(fixture.accounts[1].acct(), "bob@remote.example");
        assert_eq!(fixture.statuses[0].visibility, Visibility::FollowersOnly);
        assert!(fixture.follows[0].show_reblogs);
        let filter = &fixture.filters[0];
        assert_eq!(filter.action, FilterAction::Hide);
        assert!(filter.contexts.contains(FilterContext::Public));
        assert!(!filter.contexts.contains(FilterContext::Thread));
        assert_eq!(filter.keywords[0].keyword, "finale");
        assert_eq!(fixture.blocked_domains, vec!["spam.example".to_string()]);
    }

    #[test]
    fn rejects_unknown_visibility() {
        let err = Fixture::from_toml_str(
            r#"
[[statuses]]
id = "S1"
account_id = "A1"
created_at = "2024-05-01T10:00:00Z"
visibility = "friends"
"#,
        )
        .expect_err("invalid fixture");
        assert!(matches!(err, InfraError::Fixture { .. }));
    }
}
