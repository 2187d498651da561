//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::UserRoleDb;

/// Input for inserting a user migrated from the legacy source.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRoleDb,
    pub zone_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Repository for user operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All user emails, for collision detection during migration. Empty
    /// emails are excluded: they never collide.
    pub async fn find_all_emails(&self) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT email FROM users WHERE email <> ''"#)
            .fetch_all(&self.pool)
            .await
    }

    /// Inserts a migrated user, preserving its legacy id.
    pub async fn insert_migrated(&self, input: &NewUser) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, role, zone_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(input.id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.role)
        .bind(input.zone_id)
        .bind(input.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_all_ids(&self) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT id FROM users"#)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_with_zone(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE zone_id IS NOT NULL"#)
            .fetch_one(&self.pool)
            .await
    }
}
