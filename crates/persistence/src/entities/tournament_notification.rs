//! Tournament notification aggregate entity.
//!
//! One row per (tournament, send-event). Resends create a new row; the old
//! one is kept for audit. Only repair operations touch an existing row, and
//! only to recompute `total_recipients` from the linked recipient rows.

use chrono::{DateTime, Utc};
use domain::models::{AggregateStatus, NotificationDetails};
use sqlx::FromRow;
use uuid::Uuid;

/// Template marker stored on aggregates synthesized from legacy rows.
pub const MIGRATED_TEMPLATE_MARKER: &str = "migrated_from_legacy";

/// Database entity for the tournament_notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct TournamentNotificationEntity {
    pub id: Uuid,
    pub tournament_id: i64,
    pub status: AggregateStatus,
    pub total_recipients: i32,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_by: Option<String>,
    pub details: serde_json::Value,
    pub templates_used: serde_json::Value,
    pub error_message: Option<String>,
    pub attachments: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TournamentNotificationEntity {
    /// Parses the per-category counters out of the `details` column.
    pub fn details(&self) -> Option<NotificationDetails> {
        serde_json::from_value(self.details.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::CategoryCounts;

    #[test]
    fn test_details_parse() {
        let entity = TournamentNotificationEntity {
            id: Uuid::new_v4(),
            tournament_id: 9,
            status: AggregateStatus::Partial,
            total_recipients: 3,
            sent_at: Some(Utc::now()),
            sent_by: None,
            details: serde_json::json!({
                "club": {"sent": 1, "failed": 0},
                "referees": {"sent": 1, "failed": 1},
                "institutional": {"sent": 0, "failed": 0}
            }),
            templates_used: serde_json::Value::Null,
            error_message: None,
            attachments: serde_json::json!([]),
            created_at: Utc::now(),
        };

        let details = entity.details().unwrap();
        assert_eq!(details.referees, CategoryCounts { sent: 1, failed: 1 });
        assert_eq!(details.total(), entity.total_recipients);
    }

    #[test]
    fn test_migrated_marker() {
        assert_eq!(MIGRATED_TEMPLATE_MARKER, "migrated_from_legacy");
    }
}
