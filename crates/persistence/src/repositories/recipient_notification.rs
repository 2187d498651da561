//! Recipient notification repository.
//!
//! Data access for per-recipient delivery rows: lifecycle transitions,
//! retry selection, cleanup, statistics, and the legacy-schema queries used
//! by the notification migrator (orphan and duplicate detection, linkage
//! backfill, rollback).

use chrono::{Duration, Utc};
use domain::models::{NotificationStatus, RecipientType};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{DuplicateGroupEntity, RecipientNotificationEntity};

/// Input for creating a recipient notification row.
#[derive(Debug, Clone)]
pub struct CreateRecipientNotificationInput {
    pub tournament_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub recipient_type: RecipientType,
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<String>,
}

/// Repository for recipient notification operations.
#[derive(Debug, Clone)]
pub struct RecipientNotificationRepository {
    pool: PgPool,
}

impl RecipientNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new pending row.
    pub async fn create(
        &self,
        input: CreateRecipientNotificationInput,
    ) -> Result<RecipientNotificationEntity, sqlx::Error> {
        let entity = sqlx::query_as::<_, RecipientNotificationEntity>(
            r#"
            INSERT INTO recipient_notifications
                (tournament_id, assignment_id, recipient_type, recipient_email,
                 subject, body, status, retry_count, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', 0, $7)
            RETURNING id, tournament_id, assignment_id, recipient_type, recipient_email,
                      subject, body, status, sent_at, error_message, retry_count,
                      attachments, created_at
            "#,
        )
        .bind(input.tournament_id)
        .bind(input.assignment_id)
        .bind(input.recipient_type)
        .bind(&input.recipient_email)
        .bind(&input.subject)
        .bind(&input.body)
        .bind(serde_json::json!(input.attachments))
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    /// Marks a row delivered. Sent is terminal.
    pub async fn mark_sent(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE recipient_notifications
            SET status = 'sent', sent_at = NOW(), error_message = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks a row failed and increments its retry counter.
    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE recipient_notifications
            SET status = 'failed', error_message = $2, retry_count = retry_count + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Puts a failed row back into pending before a retry attempt.
    pub async fn reset_for_retry(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE recipient_notifications
            SET status = 'pending'
            WHERE id = $1 AND status = 'failed'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Failed rows still eligible for automatic retry: below the retry
    /// bound and created within the retry window. Older failures are stale
    /// and stay untouched.
    pub async fn find_failed_retryable(
        &self,
        window_days: i64,
        max_retry: i32,
        limit: i64,
    ) -> Result<Vec<RecipientNotificationEntity>, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(window_days);
        sqlx::query_as::<_, RecipientNotificationEntity>(
            r#"
            SELECT id, tournament_id, assignment_id, recipient_type, recipient_email,
                   subject, body, status, sent_at, error_message, retry_count,
                   attachments, created_at
            FROM recipient_notifications
            WHERE status = 'failed' AND retry_count < $1 AND created_at >= $2
            ORDER BY created_at ASC
            LIMIT $3
            "#,
        )
        .bind(max_retry)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Transitions exhausted failures (retry_count at the bound) to
    /// cancelled. Returns the number of rows resolved.
    pub async fn reset_exhausted(&self, max_retry: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE recipient_notifications
            SET status = 'cancelled'
            WHERE status = 'failed' AND retry_count >= $1
            "#,
        )
        .bind(max_retry)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Rows eligible for cleanup: terminal status, older than the cutoff.
    /// Cancelled rows never got a sent_at, so their age falls back to
    /// created_at.
    pub async fn count_cleanup_candidates(&self, retention_days: i64) -> Result<i64, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM recipient_notifications
            WHERE status IN ('sent', 'cancelled')
              AND COALESCE(sent_at, created_at) < $1
            "#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
    }

    /// Deletes cleanup candidates. Safe to run repeatedly: the second run
    /// finds nothing left to delete.
    pub async fn delete_cleanup_candidates(&self, retention_days: i64) -> Result<u64, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let result = sqlx::query(
            r#"
            DELETE FROM recipient_notifications
            WHERE status IN ('sent', 'cancelled')
              AND COALESCE(sent_at, created_at) < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Row counts grouped by status over a trailing window.
    pub async fn count_by_status(
        &self,
        window_days: i64,
    ) -> Result<Vec<(NotificationStatus, i64)>, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(window_days);
        sqlx::query_as(
            r#"
            SELECT status, COUNT(*) FROM recipient_notifications
            WHERE created_at >= $1
            GROUP BY status
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// Row counts grouped by recipient type over a trailing window.
    pub async fn count_by_recipient_type(
        &self,
        window_days: i64,
    ) -> Result<Vec<(RecipientType, i64)>, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(window_days);
        sqlx::query_as(
            r#"
            SELECT recipient_type, COUNT(*) FROM recipient_notifications
            WHERE created_at >= $1
            GROUP BY recipient_type
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
    }

    /// Failures recorded in the last 24 hours.
    pub async fn count_recent_failures(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM recipient_notifications
            WHERE status = 'failed' AND created_at > NOW() - INTERVAL '24 hours'
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Current pending backlog.
    pub async fn count_pending(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM recipient_notifications WHERE status = 'pending'"#,
        )
        .fetch_one(&self.pool)
        .await
    }

    // Legacy-schema queries below: rows written before the aggregate schema
    // carry no tournament link and are reconciled by the migrator.

    /// Rows still on the legacy schema (no tournament link).
    pub async fn count_legacy(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM recipient_notifications WHERE tournament_id IS NULL"#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// One chunk of legacy rows, ordered stably for chunked processing.
    pub async fn find_legacy_chunk(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RecipientNotificationEntity>, sqlx::Error> {
        sqlx::query_as::<_, RecipientNotificationEntity>(
            r#"
            SELECT id, tournament_id, assignment_id, recipient_type, recipient_email,
                   subject, body, status, sent_at, error_message, retry_count,
                   attachments, created_at
            FROM recipient_notifications
            WHERE tournament_id IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Legacy rows serialized for the backup snapshot.
    pub async fn fetch_legacy_for_backup(&self) -> Result<Vec<serde_json::Value>, sqlx::Error> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT row_to_json(rn) FROM recipient_notifications rn
            WHERE rn.tournament_id IS NULL
            ORDER BY rn.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    /// All rows linked to one tournament.
    pub async fn find_by_tournament(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<RecipientNotificationEntity>, sqlx::Error> {
        sqlx::query_as::<_, RecipientNotificationEntity>(
            r#"
            SELECT id, tournament_id, assignment_id, recipient_type, recipient_email,
                   subject, body, status, sent_at, error_message, retry_count,
                   attachments, created_at
            FROM recipient_notifications
            WHERE tournament_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_by_tournament(&self, tournament_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM recipient_notifications WHERE tournament_id = $1"#,
        )
        .bind(tournament_id)
        .fetch_one(&self.pool)
        .await
    }

    /// Links one row to a tournament.
    pub async fn link_tournament(&self, id: Uuid, tournament_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE recipient_notifications SET tournament_id = $2 WHERE id = $1"#,
        )
        .bind(id)
        .bind(tournament_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Repair: backfills missing tournament links by following the
    /// assignment linkage. Idempotent.
    pub async fn backfill_links_from_assignments(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE recipient_notifications rn
            SET tournament_id = a.tournament_id
            FROM assignments a
            WHERE rn.assignment_id = a.id AND rn.tournament_id IS NULL
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Rollback: clears every tournament link, returning the subsystem to
    /// its legacy-only state.
    pub async fn clear_all_links(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE recipient_notifications
            SET tournament_id = NULL
            WHERE tournament_id IS NOT NULL
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Rows currently linked to a tournament.
    pub async fn count_linked(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM recipient_notifications WHERE tournament_id IS NOT NULL"#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Orphans: a dangling tournament link, or a legacy row whose
    /// assignment linkage cannot resolve a tournament either.
    pub async fn count_orphans(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM recipient_notifications rn {}",
            ORPHAN_PREDICATE
        ))
        .fetch_one(&self.pool)
        .await
    }

    /// Deletes orphaned rows. Idempotent.
    pub async fn delete_orphans(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM recipient_notifications rn {}",
            ORPHAN_PREDICATE
        ))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Duplicate (tournament, email, type) groups among linked rows.
    pub async fn find_duplicate_groups(&self) -> Result<Vec<DuplicateGroupEntity>, sqlx::Error> {
        sqlx::query_as::<_, DuplicateGroupEntity>(
            r#"
            SELECT tournament_id, recipient_email, recipient_type, COUNT(*) AS row_count
            FROM recipient_notifications
            WHERE tournament_id IS NOT NULL
            GROUP BY tournament_id, recipient_email, recipient_type
            HAVING COUNT(*) > 1
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Rows that duplicate removal would delete (every row of a duplicate
    /// group except the most recently created one).
    pub async fn count_duplicate_rows(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM recipient_notifications rn
            WHERE rn.tournament_id IS NOT NULL AND EXISTS (
                SELECT 1 FROM recipient_notifications newer
                WHERE newer.tournament_id = rn.tournament_id
                  AND newer.recipient_email = rn.recipient_email
                  AND newer.recipient_type = rn.recipient_type
                  AND (newer.created_at, newer.id) > (rn.created_at, rn.id)
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Removes duplicates, keeping the most recently created row of each
    /// (tournament, email, type) group. Creation order ties break on id.
    pub async fn delete_duplicate_rows(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM recipient_notifications rn
            WHERE rn.tournament_id IS NOT NULL AND EXISTS (
                SELECT 1 FROM recipient_notifications newer
                WHERE newer.tournament_id = rn.tournament_id
                  AND newer.recipient_email = rn.recipient_email
                  AND newer.recipient_type = rn.recipient_type
                  AND (newer.created_at, newer.id) > (rn.created_at, rn.id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Shared predicate for orphan detection: dangling tournament link, or a
/// legacy row with no resolvable assignment.
const ORPHAN_PREDICATE: &str = r#"
    WHERE (rn.tournament_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM tournaments t WHERE t.id = rn.tournament_id))
       OR (rn.tournament_id IS NULL
           AND (rn.assignment_id IS NULL
                OR NOT EXISTS (SELECT 1 FROM assignments a WHERE a.id = rn.assignment_id)))
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphan_predicate_covers_both_shapes() {
        assert!(ORPHAN_PREDICATE.contains("tournament_id IS NOT NULL"));
        assert!(ORPHAN_PREDICATE.contains("tournament_id IS NULL"));
        assert!(ORPHAN_PREDICATE.contains("assignments"));
    }
}
