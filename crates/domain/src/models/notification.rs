//! Notification state machine: recipient categories, per-row and aggregate
//! statuses, and the per-category counters an aggregate record is built from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of delivery attempts for a single recipient notification.
pub const MAX_RETRY_ATTEMPTS: i32 = 3;

/// Window in days within which failed notifications are eligible for
/// automatic retry. Older failures are considered stale and left alone.
pub const RETRY_WINDOW_DAYS: i64 = 7;

/// Default retention in days before terminal notifications are cleaned up.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Cooldown in minutes before a successfully sent aggregate may be resent.
pub const RESEND_COOLDOWN_MINUTES: i64 = 60;

/// Category of notification recipient. Each category has its own letter
/// template and its own counters in the aggregate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipient_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Club,
    Referee,
    Institutional,
}

impl std::fmt::Display for RecipientType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Club => write!(f, "club"),
            Self::Referee => write!(f, "referee"),
            Self::Institutional => write!(f, "institutional"),
        }
    }
}

/// Lifecycle status of a single recipient notification.
///
/// `Pending → Sent` on delivery, `Pending → Failed` on error. Failed rows
/// below [`MAX_RETRY_ATTEMPTS`] may be retried; exhausted rows resolve to
/// `Cancelled` and never re-enter the pending pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sent | Self::Cancelled)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Overall status of a tournament notification aggregate, derived from the
/// per-category counters via [`NotificationDetails::derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "aggregate_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AggregateStatus {
    Pending,
    Sent,
    Partial,
    Failed,
}

impl std::fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sent => write!(f, "sent"),
            Self::Partial => write!(f, "partial"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Sent/failed counters for one recipient category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub sent: i32,
    pub failed: i32,
}

impl CategoryCounts {
    pub fn total(&self) -> i32 {
        self.sent + self.failed
    }
}

/// Per-category breakdown persisted in the aggregate record's `details`
/// column. `total_recipients` on the aggregate must equal [`Self::total`]
/// at creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDetails {
    pub club: CategoryCounts,
    pub referees: CategoryCounts,
    pub institutional: CategoryCounts,
}

impl NotificationDetails {
    /// Records one dispatch outcome in the matching category counter.
    pub fn record(&mut self, recipient_type: RecipientType, sent: bool) {
        let counts = match recipient_type {
            RecipientType::Club => &mut self.club,
            RecipientType::Referee => &mut self.referees,
            RecipientType::Institutional => &mut self.institutional,
        };
        if sent {
            counts.sent += 1;
        } else {
            counts.failed += 1;
        }
    }

    pub fn total(&self) -> i32 {
        self.club.total() + self.referees.total() + self.institutional.total()
    }

    pub fn total_sent(&self) -> i32 {
        self.club.sent + self.referees.sent + self.institutional.sent
    }

    pub fn total_failed(&self) -> i32 {
        self.club.failed + self.referees.failed + self.institutional.failed
    }

    /// Derives the aggregate status: failed when nothing was sent, partial
    /// when sends and failures mix, sent otherwise.
    pub fn derive_status(&self) -> AggregateStatus {
        if self.total_sent() == 0 {
            AggregateStatus::Failed
        } else if self.total_failed() > 0 {
            AggregateStatus::Partial
        } else {
            AggregateStatus::Sent
        }
    }
}

/// Outcome of a single recipient dispatch. Transport and render errors are
/// values, not `Err`: one recipient's failure must not abort the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed { error: String },
}

impl DispatchOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }
}

/// Summary returned by a tournament send or resend operation.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationSummary {
    pub aggregate_id: Uuid,
    pub tournament_id: i64,
    pub status: AggregateStatus,
    pub total_sent: i32,
    pub total_failed: i32,
    pub details: NotificationDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(counts: [(i32, i32); 3]) -> NotificationDetails {
        NotificationDetails {
            club: CategoryCounts { sent: counts[0].0, failed: counts[0].1 },
            referees: CategoryCounts { sent: counts[1].0, failed: counts[1].1 },
            institutional: CategoryCounts { sent: counts[2].0, failed: counts[2].1 },
        }
    }

    #[test]
    fn test_retry_bound() {
        assert_eq!(MAX_RETRY_ATTEMPTS, 3);
    }

    #[test]
    fn test_status_all_sent() {
        // Scenario: 1 club contact, 2 referees, 3 institutional, all delivered.
        let d = details([(1, 0), (2, 0), (3, 0)]);
        assert_eq!(d.total(), 6);
        assert_eq!(d.total_sent(), 6);
        assert_eq!(d.total_failed(), 0);
        assert_eq!(d.derive_status(), AggregateStatus::Sent);
    }

    #[test]
    fn test_status_one_failure_is_partial() {
        let d = details([(1, 0), (1, 1), (3, 0)]);
        assert_eq!(d.total_sent(), 5);
        assert_eq!(d.total_failed(), 1);
        assert_eq!(d.derive_status(), AggregateStatus::Partial);
    }

    #[test]
    fn test_status_nothing_sent_is_failed() {
        let d = details([(0, 1), (0, 2), (0, 0)]);
        assert_eq!(d.derive_status(), AggregateStatus::Failed);

        let empty = NotificationDetails::default();
        assert_eq!(empty.derive_status(), AggregateStatus::Failed);
    }

    #[test]
    fn test_record_routes_to_category() {
        let mut d = NotificationDetails::default();
        d.record(RecipientType::Club, true);
        d.record(RecipientType::Referee, false);
        d.record(RecipientType::Referee, true);
        d.record(RecipientType::Institutional, false);

        assert_eq!(d.club, CategoryCounts { sent: 1, failed: 0 });
        assert_eq!(d.referees, CategoryCounts { sent: 1, failed: 1 });
        assert_eq!(d.institutional, CategoryCounts { sent: 0, failed: 1 });
        assert_eq!(d.total(), d.total_sent() + d.total_failed());
    }

    #[test]
    fn test_terminal_states() {
        assert!(NotificationStatus::Sent.is_terminal());
        assert!(NotificationStatus::Cancelled.is_terminal());
        assert!(!NotificationStatus::Pending.is_terminal());
        assert!(!NotificationStatus::Failed.is_terminal());
    }

    #[test]
    fn test_details_round_trips_through_json() {
        let d = details([(1, 0), (2, 1), (0, 3)]);
        let value = serde_json::to_value(d).unwrap();
        let back: NotificationDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_dispatch_outcome() {
        assert!(DispatchOutcome::Sent.is_sent());
        let failed = DispatchOutcome::failed("smtp timeout");
        assert!(!failed.is_sent());
    }
}
