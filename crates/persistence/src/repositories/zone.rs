//! Zone repository.

use sqlx::PgPool;

use crate::entities::ZoneEntity;

/// Repository for zone lookups. Zones are seeded out of band; the data
/// migration only reads them to resolve legacy zone references.
#[derive(Debug, Clone)]
pub struct ZoneRepository {
    pool: PgPool,
}

impl ZoneRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM zones"#)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_all(&self) -> Result<Vec<ZoneEntity>, sqlx::Error> {
        sqlx::query_as::<_, ZoneEntity>(
            r#"SELECT id, code, name, created_at FROM zones ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
