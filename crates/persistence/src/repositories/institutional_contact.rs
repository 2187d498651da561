//! Institutional contact repository.

use sqlx::PgPool;

use crate::entities::InstitutionalContactEntity;

/// Repository for institutional contact lookups.
#[derive(Debug, Clone)]
pub struct InstitutionalContactRepository {
    pool: PgPool,
}

impl InstitutionalContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active contacts eligible for a notification: subscribed to the type
    /// and scoped to the tournament's zone (or to every zone).
    pub async fn find_eligible(
        &self,
        zone_id: i64,
        notification_type: &str,
    ) -> Result<Vec<InstitutionalContactEntity>, sqlx::Error> {
        sqlx::query_as::<_, InstitutionalContactEntity>(
            r#"
            SELECT id, zone_id, email, subscribed_types, active, created_at
            FROM institutional_contacts
            WHERE active
              AND (zone_id IS NULL OR zone_id = $1)
              AND subscribed_types ? $2
            ORDER BY id ASC
            "#,
        )
        .bind(zone_id)
        .bind(notification_type)
        .fetch_all(&self.pool)
        .await
    }
}
