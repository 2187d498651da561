//! Recipient notification entity definitions.
//!
//! Maps to the recipient_notifications table: one outbound message to one
//! recipient, with bounded retry bookkeeping. Rows created before the
//! aggregate schema have `tournament_id` NULL and carry their linkage
//! through `assignment_id`.

use chrono::{DateTime, Utc};
use domain::models::{NotificationStatus, RecipientType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for the recipient_notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct RecipientNotificationEntity {
    pub id: Uuid,
    pub tournament_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub recipient_type: RecipientType,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub attachments: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl RecipientNotificationEntity {
    /// Attachment references stored on the row.
    pub fn attachment_refs(&self) -> Vec<String> {
        serde_json::from_value(self.attachments.clone()).unwrap_or_default()
    }
}

/// One duplicate (tournament, email, type) group found during analysis.
#[derive(Debug, Clone, FromRow)]
pub struct DuplicateGroupEntity {
    pub tournament_id: i64,
    pub recipient_email: String,
    pub recipient_type: RecipientType,
    pub row_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(attachments: serde_json::Value) -> RecipientNotificationEntity {
        RecipientNotificationEntity {
            id: Uuid::new_v4(),
            tournament_id: Some(1),
            assignment_id: None,
            recipient_type: RecipientType::Referee,
            recipient_email: "r@golf.example".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
            status: NotificationStatus::Pending,
            sent_at: None,
            error_message: None,
            retry_count: 0,
            attachments,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_attachment_refs_parsed() {
        let e = entity(serde_json::json!(["convocation.pdf", "summary.pdf"]));
        assert_eq!(e.attachment_refs(), vec!["convocation.pdf", "summary.pdf"]);
    }

    #[test]
    fn test_attachment_refs_tolerate_malformed_column() {
        let e = entity(serde_json::json!({"not": "a list"}));
        assert!(e.attachment_refs().is_empty());
    }
}
