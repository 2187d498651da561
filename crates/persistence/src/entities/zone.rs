//! Zone entity definitions.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity for the zones table.
#[derive(Debug, Clone, FromRow)]
pub struct ZoneEntity {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
