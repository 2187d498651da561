//! Availability entity definitions.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity for the availabilities table: a referee's declared
/// availability for a tournament.
#[derive(Debug, Clone, FromRow)]
pub struct AvailabilityEntity {
    pub id: i64,
    pub tournament_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}
