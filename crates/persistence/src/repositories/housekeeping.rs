//! Housekeeping repository: whole-table operations used by backups and the
//! data migration (snapshot dumps, identity sequence resets).
//!
//! Table names are interpolated into SQL, so every operation is restricted
//! to the fixed allowlist of managed tables.

use sqlx::PgPool;
use thiserror::Error;

/// Tables these operations may touch.
pub const MANAGED_TABLES: [&str; 7] = [
    "zones",
    "clubs",
    "users",
    "tournaments",
    "assignments",
    "availabilities",
    "tournament_types",
];

#[derive(Debug, Error)]
pub enum HousekeepingError {
    #[error("Table '{0}' is not a managed table")]
    UnknownTable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Repository for table-level housekeeping.
#[derive(Debug, Clone)]
pub struct HousekeepingRepository {
    pool: PgPool,
}

impl HousekeepingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn check_table(table: &str) -> Result<(), HousekeepingError> {
        if MANAGED_TABLES.contains(&table) {
            Ok(())
        } else {
            Err(HousekeepingError::UnknownTable(table.to_string()))
        }
    }

    /// Serializes every row of a managed table for a backup snapshot.
    pub async fn fetch_table_json(
        &self,
        table: &str,
    ) -> Result<Vec<serde_json::Value>, HousekeepingError> {
        Self::check_table(table)?;
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(&format!(
            "SELECT row_to_json(t) FROM {} t ORDER BY t.id ASC",
            table
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    /// Resets a managed table's identity sequence to max(id)+1, so rows
    /// inserted after a migration never collide with preserved legacy ids.
    pub async fn reset_identity_sequence(&self, table: &str) -> Result<(), HousekeepingError> {
        Self::check_table(table)?;
        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)",
            table = table
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_table_rejected() {
        let err = HousekeepingRepository::check_table("recipient_notifications; DROP TABLE zones")
            .unwrap_err();
        assert!(matches!(err, HousekeepingError::UnknownTable(_)));
    }

    #[test]
    fn test_managed_tables_accepted() {
        for table in MANAGED_TABLES {
            assert!(HousekeepingRepository::check_table(table).is_ok());
        }
    }
}
