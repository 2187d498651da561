//! Club entity definitions.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity for the clubs table.
#[derive(Debug, Clone, FromRow)]
pub struct ClubEntity {
    pub id: i64,
    pub zone_id: Option<i64>,
    pub code: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}
