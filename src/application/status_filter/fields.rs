use crate::domain::entities::StatusRecord;
use crate::domain::text::html_to_plaintext;

/// Text fields of `status` that keywords are matched against, each kept separate so a keyword
/// never matches across two fields.
pub fn filterable_fields(status: &StatusRecord) -> Vec<String> {
    let mut fields = Vec::with_capacity(2 + status.attachments.len());

    if !status.content_warning.is_empty() {
        fields.push(status.content_warning.clone());
    }

    let text = html_to_plaintext(&status.content);
    if !text.is_empty() {
        fields.push(text);
    }

    fields.extend(
        status
            .attachments
            .iter()
            .filter_map(|attachment| attachment.description.as_deref())
            .filter(|description| !description.is_empty())
            .map(str::to_string),
    );

    if let Some(poll) = &status.poll {
        fields.extend(
            poll.options
                .iter()
                .filter(|option| !option.is_empty())
                .cloned(),
        );
    }

    fields
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::domain::entities::{AttachmentRecord, PollRecord};
    use crate::domain::types::Visibility;

    #[test]
    fn collects_every_non_empty_field() {
        let status = StatusRecord {
            id: "S1".to_string(),
            account_id: "A1".to_string(),
            local: true,
            created_at: datetime!(2024-01-01 00:00 UTC),
            visibility: Visibility::Public,
            content_warning: "cw".to_string(),
            content: "<p>body</p>".to_string(),
            in_reply_to_id: None,
            in_reply_to_uri: None,
            in_reply_to_account_id: None,
            boost_of_id: None,
            boost_of_account_id: None,
            mentions: Vec::new(),
            attachments: vec![
                AttachmentRecord {
                    id: "M1".to_string(),
                    url: String::new(),
                    description: Some("a photo".to_string()),
                },
                AttachmentRecord {
                    id: "M2".to_string(),
                    url: String::new(),
                    description: Some(String::new()),
                },
            ],
            poll: Some(PollRecord {
                options: vec!["yes".to_string(), String::new()],
                closes_at: None,
            }),
            pending_approval: false,
        };

        assert_eq!(
            filterable_fields(&status),
            vec!["cw", "body", "a photo", "yes"]
        );
    }
}
