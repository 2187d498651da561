//! Institutional contact entity definitions.
//!
//! Institutional addresses (federation offices, zone committees) subscribe
//! to notification types; a NULL zone means the contact receives notices
//! for every zone.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity for the institutional_contacts table.
#[derive(Debug, Clone, FromRow)]
pub struct InstitutionalContactEntity {
    pub id: i64,
    pub zone_id: Option<i64>,
    pub email: String,
    pub subscribed_types: serde_json::Value,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl InstitutionalContactEntity {
    /// Whether the contact subscribes to the given notification type.
    pub fn subscribes_to(&self, notification_type: &str) -> bool {
        self.subscribed_types
            .as_array()
            .map(|types| types.iter().any(|t| t.as_str() == Some(notification_type)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribes_to() {
        let contact = InstitutionalContactEntity {
            id: 1,
            zone_id: None,
            email: "office@federation.example".to_string(),
            subscribed_types: serde_json::json!(["tournament_convocation", "yearly_report"]),
            active: true,
            created_at: Utc::now(),
        };
        assert!(contact.subscribes_to("tournament_convocation"));
        assert!(!contact.subscribes_to("weekly_digest"));
    }
}
