//! Club repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::ClubEntity;

/// Input for inserting a club migrated from the legacy source.
#[derive(Debug, Clone)]
pub struct NewClub {
    pub id: i64,
    pub zone_id: Option<i64>,
    pub code: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for club operations.
#[derive(Debug, Clone)]
pub struct ClubRepository {
    pool: PgPool,
}

impl ClubRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self) -> Result<Vec<ClubEntity>, sqlx::Error> {
        sqlx::query_as::<_, ClubEntity>(
            r#"SELECT id, zone_id, code, name, email, phone, created_at
               FROM clubs ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Inserts a migrated club, preserving its legacy id.
    pub async fn insert_migrated(&self, input: &NewClub) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO clubs (id, zone_id, code, name, email, phone, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(input.id)
        .bind(input.zone_id)
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM clubs"#)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_with_zone(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM clubs WHERE zone_id IS NOT NULL"#)
            .fetch_one(&self.pool)
            .await
    }
}
