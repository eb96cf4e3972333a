//! Shared domain enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Audience a post was addressed to, from widest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Unlocked,
    FollowersOnly,
    MutualsOnly,
    Direct,
}

impl Visibility {
    /// Public and unlocked posts are readable by any authenticated account.
    pub fn is_open(self) -> bool {
        matches!(self, Visibility::Public | Visibility::Unlocked)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlocked => "unlocked",
            Visibility::FollowersOnly => "followers_only",
            Visibility::MutualsOnly => "mutuals_only",
            Visibility::Direct => "direct",
        }
    }
}

/// Which of a local account's posts may be shown to unauthenticated viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebVisibility {
    None,
    #[default]
    Public,
    Unlocked,
}

impl WebVisibility {
    pub fn permits(self, visibility: Visibility) -> bool {
        match self {
            WebVisibility::None => false,
            WebVisibility::Public => visibility == Visibility::Public,
            WebVisibility::Unlocked => visibility.is_open(),
        }
    }
}

/// Enforcement level of a user filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    Warn,
    Hide,
}

/// Feed type a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterContext {
    Home,
    Notifications,
    Public,
    Thread,
    /// An account's profile page; `profile` is accepted as an alias.
    #[serde(alias = "profile")]
    Account,
}

impl FilterContext {
    pub const ALL: [FilterContext; 5] = [
        FilterContext::Home,
        FilterContext::Notifications,
        FilterContext::Public,
        FilterContext::Thread,
        FilterContext::Account,
    ];

    fn bit(self) -> u8 {
        match self {
            FilterContext::Home => 1 << 1,
            FilterContext::Notifications => 1 << 2,
            FilterContext::Public => 1 << 3,
            FilterContext::Thread => 1 << 4,
            FilterContext::Account => 1 << 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterContext::Home => "home",
            FilterContext::Notifications => "notifications",
            FilterContext::Public => "public",
            FilterContext::Thread => "thread",
            FilterContext::Account => "account",
        }
    }
}

impl FromStr for FilterContext {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let name = value.trim();
        if name.eq_ignore_ascii_case("profile") {
            return Ok(FilterContext::Account);
        }
        FilterContext::ALL
            .into_iter()
            .find(|context| context.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| DomainError::malformed(format!("unknown filter context `{value}`")))
    }
}

impl fmt::Display for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of filter contexts, stored as a bit field and serialized as a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<FilterContext>", into = "Vec<FilterContext>")]
pub struct FilterContexts(u8);

impl FilterContexts {
    pub fn contains(self, context: FilterContext) -> bool {
        self.0 & context.bit() != 0
    }

    pub fn insert(&mut self, context: FilterContext) {
        self.0 |= context.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = FilterContext> {
        FilterContext::ALL
            .into_iter()
            .filter(move |context| self.contains(*context))
    }
}

impl FromIterator<FilterContext> for FilterContexts {
    fn from_iter<I: IntoIterator<Item = FilterContext>>(iter: I) -> Self {
        let mut contexts = FilterContexts::default();
        for context in iter {
            contexts.insert(context);
        }
        contexts
    }
}

impl From<Vec<FilterContext>> for FilterContexts {
    fn from(value: Vec<FilterContext>) -> Self {
        value.into_iter().collect()
    }
}

impl From<FilterContexts> for Vec<FilterContext> {
    fn from(value: FilterContexts) -> Self {
        value.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_parse_case_insensitively() {
        assert_eq!("Home".parse::<FilterContext>().ok(), Some(FilterContext::Home));
        assert_eq!(" thread ".parse::<FilterContext>().ok(), Some(FilterContext::Thread));
        assert!("timeline".parse::<FilterContext>().is_err());
    }

    #[test]
    fn profile_names_the_account_context() {
        assert_eq!("profile".parse::<FilterContext>().ok(), Some(FilterContext::Account));
        assert_eq!("Account".parse::<FilterContext>().ok(), Some(FilterContext::Account));

        let contexts: FilterContexts =
            serde_json::from_str(r#"["profile","home"]"#).expect("deserialize contexts");
        assert!(contexts.contains(FilterContext::Account));
        assert!(contexts.contains(FilterContext::Home));
    }

    #[test]
    fn contexts_round_trip_through_list() {
        let contexts: FilterContexts = [FilterContext::Home, FilterContext::Thread]
            .into_iter()
            .collect();
        assert!(contexts.contains(FilterContext::Home));
        assert!(contexts.contains(FilterContext::Thread));
        assert!(!contexts.contains(FilterContext::Public));

        let json = serde_json::to_string(&contexts).expect("serialize contexts");
        assert_eq!(json, r#"["home","thread"]"#);
    }

    #[test]
    fn web_visibility_gates_by_level() {
        assert!(WebVisibility::Public.permits(Visibility::Public));
        assert!(!WebVisibility::Public.permits(Visibility::Unlocked));
        assert!(WebVisibility::Unlocked.permits(Visibility::Unlocked));
        assert!(!WebVisibility::None.permits(Visibility::Public));
    }
}
