use crate::domain::entities::StatusRecord;

/// Minimal reference to a status held in a timeline index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub id: String,
    pub account_id: String,
    pub boost_of_id: Option<String>,
    pub boost_of_account_id: Option<String>,
}

impl TimelineEntry {
    pub fn is_boost(&self) -> bool {
        self.boost_of_id.is_some()
    }

    /// Authored by `account_id`, or a boost of one of its statuses.
    pub fn by_or_boosting(&self, account_id: &str) -> bool {
        self.account_id == account_id || self.boost_of_account_id.as_deref() == Some(account_id)
    }

    /// The status itself is `item_id`, or boosts it.
    pub fn concerns(&self, item_id: &str) -> bool {
        self.id == item_id || self.boost_of_id.as_deref() == Some(item_id)
    }
}

impl From<&StatusRecord> for TimelineEntry {
    fn from(status: &StatusRecord) -> Self {
        Self {
            id: status.id.clone(),
            account_id: status.account_id.clone(),
            boost_of_id: status.boost_of_id.clone(),
            boost_of_account_id: status.boost_of_account_id.clone(),
        }
    }
}
