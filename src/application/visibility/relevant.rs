use std::collections::BTreeSet;

use crate::domain::entities::StatusRecord;

/// Accounts structurally connected to a post, used for block and domain-block checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevantAccounts {
    pub author: String,
    pub in_reply_to: Option<String>,
    pub mentions: Vec<String>,
    pub boost_of: Option<String>,
    pub boost_of_in_reply_to: Option<String>,
    pub boost_of_mentions: Vec<String>,
}

impl RelevantAccounts {
    pub fn collect(status: &StatusRecord, boosted: Option<&StatusRecord>) -> Self {
        let mut relevant = Self {
            author: status.account_id.clone(),
            in_reply_to: status.in_reply_to_account_id.clone(),
            mentions: status.mentions.clone(),
            boost_of: status.boost_of_account_id.clone(),
            ..Default::default()
        };

        if let Some(boosted) = boosted {
            relevant.boost_of = Some(boosted.account_id.clone());
            relevant.boost_of_in_reply_to = boosted.in_reply_to_account_id.clone();
            relevant.boost_of_mentions = boosted.mentions.clone();
        }

        relevant
    }

    /// Distinct account ids, author first.
    pub fn ids(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();
        let candidates = std::iter::once(self.author.as_str())
            .chain(self.in_reply_to.as_deref())
            .chain(self.mentions.iter().map(String::as_str))
            .chain(self.boost_of.as_deref())
            .chain(self.boost_of_in_reply_to.as_deref())
            .chain(self.boost_of_mentions.iter().map(String::as_str));
        for id in candidates {
            if seen.insert(id) {
                ids.push(id);
            }
        }
        ids
    }

    /// True when `account_id` is mentioned by the post or by the post it boosts.
    pub fn mentions_account(&self, account_id: &str) -> bool {
        self.mentions
            .iter()
            .chain(self.boost_of_mentions.iter())
            .any(|id| id == account_id)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::Visibility;

    fn status(id: &str, author: &str) -> StatusRecord {
        StatusRecord {
            id: id.to_string(),
            account_id: author.to_string(),
            local: true,
            created_at: datetime!(2024-01-01 00:00 UTC),
            visibility: Visibility::Public,
            content_warning: String::new(),
            content: String::new(),
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

    #[test]
    fn ids_are_distinct_and_author_first() {
        let mut boost = status("02", "booster");
        boost.boost_of_id = Some("01".to_string());
        boost.boost_of_account_id = Some("author".to_string());

        let mut original = status("01", "author");
        original.in_reply_to_account_id = Some("parent".to_string());
        original.mentions = vec!["friend".to_string(), "booster".to_string()];

        let relevant = RelevantAccounts::collect(&boost, Some(&original));
        assert_eq!(
            relevant.ids(),
            vec!["booster", "author", "parent", "friend"]
        );
        assert!(relevant.mentions_account("friend"));
        assert!(!relevant.mentions_account("parent"));
    }
}
