//! Assignment entity definitions.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity for the assignments table: one referee on one tournament.
#[derive(Debug, Clone, FromRow)]
pub struct AssignmentEntity {
    pub id: i64,
    pub tournament_id: i64,
    pub user_id: i64,
    pub role: String,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// Assignment joined with the referee's contact data, as consumed by the
/// notification aggregator.
#[derive(Debug, Clone, FromRow)]
pub struct AssignedRefereeEntity {
    pub assignment_id: i64,
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}
