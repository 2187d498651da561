//! Assignment repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Input for inserting an assignment migrated from the legacy source.
#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub id: i64,
    pub tournament_id: i64,
    pub user_id: i64,
    pub role: String,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository for assignment operations.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: PgPool,
}

impl AssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The assignment → tournament linkage map, used to resolve legacy
    /// notification rows.
    pub async fn linkage_map(&self) -> Result<Vec<(i64, i64)>, sqlx::Error> {
        sqlx::query_as(r#"SELECT id, tournament_id FROM assignments"#)
            .fetch_all(&self.pool)
            .await
    }

    /// Inserts a migrated assignment, preserving its legacy id.
    pub async fn insert_migrated(&self, input: &NewAssignment) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO assignments (id, tournament_id, user_id, role, is_confirmed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(input.id)
        .bind(input.tournament_id)
        .bind(input.user_id)
        .bind(&input.role)
        .bind(input.is_confirmed)
        .bind(input.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM assignments"#)
            .fetch_one(&self.pool)
            .await
    }
}
