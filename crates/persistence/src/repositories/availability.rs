//! Availability repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Input for inserting an availability migrated from the legacy source.
#[derive(Debug, Clone)]
pub struct NewAvailability {
    pub id: i64,
    pub tournament_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository for availability operations.
#[derive(Debug, Clone)]
pub struct AvailabilityRepository {
    pool: PgPool,
}

impl AvailabilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a migrated availability, preserving its legacy id.
    pub async fn insert_migrated(&self, input: &NewAvailability) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO availabilities (id, tournament_id, user_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(input.id)
        .bind(input.tournament_id)
        .bind(input.user_id)
        .bind(input.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM availabilities"#)
            .fetch_one(&self.pool)
            .await
    }
}
