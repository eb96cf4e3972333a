//! Conversion of stored statuses into ready-to-serve views.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::repos::{AccountsRepo, RepoError, StatusesRepo, optional};
use crate::application::status_filter::FilterResult;
use crate::domain::entities::{AccountRecord, AttachmentRecord, PollRecord, StatusRecord};
use crate::domain::error::DomainError;
use crate::domain::types::Visibility;

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub acct: String,
    pub display_name: String,
    pub locked: bool,
}

impl From<&AccountRecord> for AccountView {
    fn from(account: &AccountRecord) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            acct: account.acct(),
            display_name: account.display_name.clone(),
            locked: account.locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentView {
    pub id: String,
    pub url: String,
    pub description: Option<String>,
}

impl From<&AttachmentRecord> for AttachmentView {
    fn from(attachment: &AttachmentRecord) -> Self {
        Self {
            id: attachment.id.clone(),
            url: attachment.url.clone(),
            description: attachment.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollView {
    pub options: Vec<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closes_at: Option<OffsetDateTime>,
}

impl From<&PollRecord> for PollView {
    fn from(poll: &PollRecord) -> Self {
        Self {
            options: poll.options.clone(),
            closes_at: poll.closes_at,
        }
    }
}

/// Client-facing representation of a status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub account: AccountView,
    pub visibility: Visibility,
    pub spoiler_text: String,
    pub content: String,
    pub in_reply_to_id: Option<String>,
    pub in_reply_to_account_id: Option<String>,
    pub mentions: Vec<String>,
    pub media_attachments: Vec<AttachmentView>,
    pub poll: Option<PollView>,
    pub reblog: Option<Box<StatusView>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filtered: Vec<FilterResult>,
}

/// A status ready to serve, plus the records the visibility and filter checks need.
#[derive(Debug, Clone)]
pub struct PreparedStatus {
    pub view: StatusView,
    pub status: StatusRecord,
    pub boosted: Option<StatusRecord>,
}

impl PreparedStatus {
    pub fn id(&self) -> &str {
        &self.status.id
    }
}

/// Builds [`PreparedStatus`] values from stored records.
#[derive(Clone)]
pub struct StatusPreparer {
    statuses: Arc<dyn StatusesRepo>,
    accounts: Arc<dyn AccountsRepo>,
}

impl StatusPreparer {
    pub fn new(statuses: Arc<dyn StatusesRepo>, accounts: Arc<dyn AccountsRepo>) -> Self {
        Self { statuses, accounts }
    }

    /// Prepare one status. A missing boosted status or author is reported as malformed.
    pub async fn prepare(&self, status: StatusRecord) -> Result<PreparedStatus, PrepareError> {
        let mut authors = HashMap::new();
        self.prepare_with(status, &mut authors).await
    }

    /// Fetch `ids` in one batch and prepare each found status.
    ///
    /// Ids the store does not know are absent from the result; per-item conversion failures are
    /// returned alongside so the caller decides whether to skip them. Storage failures abort.
    pub async fn prepare_batch(
        &self,
        ids: &[String],
    ) -> Result<Vec<(String, Result<PreparedStatus, PrepareError>)>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.statuses.get_statuses_by_ids(ids).await?;
        self.prepare_records(records).await
    }

    /// Prepare records already loaded from storage, keeping their order.
    pub async fn prepare_records(
        &self,
        records: Vec<StatusRecord>,
    ) -> Result<Vec<(String, Result<PreparedStatus, PrepareError>)>, RepoError> {
        let mut authors = HashMap::new();
        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            let result = match self.prepare_with(record, &mut authors).await {
                Err(PrepareError::Repo(err)) => return Err(err),
                other => other,
            };
            prepared.push((id, result));
        }
        Ok(prepared)
    }

    async fn prepare_with(
        &self,
        status: StatusRecord,
        authors: &mut HashMap<String, AccountRecord>,
    ) -> Result<PreparedStatus, PrepareError> {
        let boosted = match status.boost_of_id.as_deref() {
            Some(boost_of_id) => {
                let Some(boosted) = optional(self.statuses.get_status(boost_of_id).await)? else {
                    return Err(DomainError::malformed(format!(
                        "boost {} references missing status {boost_of_id}",
                        status.id
                    ))
                    .into());
                };
                if boosted.is_boost() {
                    return Err(DomainError::malformed(format!(
                        "boost {} references another boost",
                        status.id
                    ))
                    .into());
                }
                Some(boosted)
            }
            None => None,
        };

        let reblog = match &boosted {
            Some(boosted) => {
                let author = self.author(&boosted.account_id, authors).await?;
                Some(Box::new(build_view(boosted, &author, None)))
            }
            None => None,
        };
        let author = self.author(&status.account_id, authors).await?;
        let view = build_view(&status, &author, reblog);

        Ok(PreparedStatus {
            view,
            status,
            boosted,
        })
    }

    async fn author(
        &self,
        account_id: &str,
        authors: &mut HashMap<String, AccountRecord>,
    ) -> Result<AccountRecord, PrepareError> {
        if let Some(account) = authors.get(account_id) {
            return Ok(account.clone());
        }
        let Some(account) = optional(self.accounts.get_account(account_id).await)? else {
            return Err(DomainError::malformed(format!("author {account_id} not stored")).into());
        };
        authors.insert(account_id.to_string(), account.clone());
        Ok(account)
    }
}

fn build_view(
    status: &StatusRecord,
    author: &AccountRecord,
    reblog: Option<Box<StatusView>>,
) -> StatusView {
    StatusView {
        id: status.id.clone(),
        created_at: status.created_at,
        account: AccountView::from(author),
        visibility: status.visibility,
        spoiler_text: status.content_warning.clone(),
        content: status.content.clone(),
        in_reply_to_id: status.in_reply_to_id.clone(),
        in_reply_to_account_id: status.in_reply_to_account_id.clone(),
        mentions: status.mentions.clone(),
        media_attachments: status.attachments.iter().map(AttachmentView::from).collect(),
        poll: status.poll.as_ref().map(PollView::from),
        reblog,
        filtered: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::infra::memory::InMemoryStore;

    fn account(id: &str) -> AccountRecord {
        AccountRecord {
            id: id.to_string(),
            username: id.to_lowercase(),
            domain: None,
            display_name: String::new(),
            locked: false,
            suspended: false,
            disabled: false,
            approved: true,
            confirmed: true,
            web_visibility: Default::default(),
        }
    }

    fn status(id: &str, author: &str, boost_of: Option<&str>) -> StatusRecord {
        StatusRecord {
            id: id.to_string(),
            account_id: author.to_string(),
            local: true,
            created_at: datetime!(2024-01-01 00:00 UTC),
            visibility: Visibility::Public,
            content_warning: String::new(),
            content: format!("<p>{id}</p>"),
            in_reply_to_id: None,
            in_reply_to_uri: None,
            in_reply_to_account_id: None,
            boost_of_id: boost_of.map(str::to_string),
            boost_of_account_id: None,
            mentions: Vec::new(),
            attachments: Vec::new(),
            poll: None,
            pending_approval: false,
        }
    }

    fn preparer(store: &Arc<InMemoryStore>) -> StatusPreparer {
        StatusPreparer::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn boosts_expand_the_original() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_account(account("A"));
        store.insert_account(account("B"));
        store.insert_status(status("S1", "A", None));

        let prepared = preparer(&store)
            .prepare(status("S2", "B", Some("S1")))
            .await
            .expect("prepared");
        let reblog = prepared.view.reblog.expect("reblog");
        assert_eq!(reblog.id, "S1");
        assert_eq!(reblog.account.id, "A");
        assert_eq!(prepared.view.account.id, "B");
        assert_eq!(prepared.boosted.map(|s| s.id), Some("S1".to_string()));
    }

    #[tokio::test]
    async fn missing_author_is_malformed() {
        let store = Arc::new(InMemoryStore::new());
        let err = preparer(&store)
            .prepare(status("S1", "ghost", None))
            .await
            .expect_err("malformed");
        assert!(matches!(err, PrepareError::Domain(DomainError::Malformed { .. })));
    }

    #[tokio::test]
    async fn batch_leaves_out_unknown_ids() {
        let store = Arc::new(InMemoryStore::new());
        store.insert_account(account("A"));
        store.insert_status(status("S1", "A", None));

        let prepared = preparer(&store)
            .prepare_batch(&["S1".to_string(), "S9".to_string()])
            .await
            .expect("batch");
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].0, "S1");
        assert!(prepared[0].1.is_ok());
    }
}
