//! Tournament notification aggregate repository.
//!
//! Aggregates are append-only: a resend creates a new row and the previous
//! one stays for audit. The only in-place updates are the repair routines
//! (recomputed totals, backfilled template markers).

use chrono::{DateTime, Duration, Utc};
use domain::models::AggregateStatus;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::TournamentNotificationEntity;

/// Input for creating an aggregate row.
#[derive(Debug, Clone)]
pub struct CreateTournamentNotificationInput {
    pub tournament_id: i64,
    pub status: AggregateStatus,
    pub total_recipients: i32,
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_by: Option<String>,
    pub details: serde_json::Value,
    pub templates_used: serde_json::Value,
    pub error_message: Option<String>,
    pub attachments: Vec<String>,
}

/// Repository for tournament notification aggregates.
#[derive(Debug, Clone)]
pub struct TournamentNotificationRepository {
    pool: PgPool,
}

impl TournamentNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        input: CreateTournamentNotificationInput,
    ) -> Result<TournamentNotificationEntity, sqlx::Error> {
        sqlx::query_as::<_, TournamentNotificationEntity>(
            r#"
            INSERT INTO tournament_notifications
                (tournament_id, status, total_recipients, sent_at, sent_by,
                 details, templates_used, error_message, attachments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, tournament_id, status, total_recipients, sent_at, sent_by,
                      details, templates_used, error_message, attachments, created_at
            "#,
        )
        .bind(input.tournament_id)
        .bind(input.status)
        .bind(input.total_recipients)
        .bind(input.sent_at)
        .bind(&input.sent_by)
        .bind(&input.details)
        .bind(&input.templates_used)
        .bind(&input.error_message)
        .bind(serde_json::json!(input.attachments))
        .fetch_one(&self.pool)
        .await
    }

    pub async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<TournamentNotificationEntity>, sqlx::Error> {
        sqlx::query_as::<_, TournamentNotificationEntity>(
            r#"
            SELECT id, tournament_id, status, total_recipients, sent_at, sent_by,
                   details, templates_used, error_message, attachments, created_at
            FROM tournament_notifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// The most recent aggregate for a tournament, if any.
    pub async fn find_latest_for_tournament(
        &self,
        tournament_id: i64,
    ) -> Result<Option<TournamentNotificationEntity>, sqlx::Error> {
        sqlx::query_as::<_, TournamentNotificationEntity>(
            r#"
            SELECT id, tournament_id, status, total_recipients, sent_at, sent_by,
                   details, templates_used, error_message, attachments, created_at
            FROM tournament_notifications
            WHERE tournament_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Whether the tournament has an unresolved (still pending) aggregate.
    pub async fn has_pending_for(&self, tournament_id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM tournament_notifications
                WHERE tournament_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(tournament_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_recent(
        &self,
        limit: i64,
    ) -> Result<Vec<TournamentNotificationEntity>, sqlx::Error> {
        sqlx::query_as::<_, TournamentNotificationEntity>(
            r#"
            SELECT id, tournament_id, status, total_recipients, sent_at, sent_by,
                   details, templates_used, error_message, attachments, created_at
            FROM tournament_notifications
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_all(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM tournament_notifications"#)
            .fetch_one(&self.pool)
            .await
    }

    /// Aggregate counts grouped by status.
    pub async fn count_by_status(&self) -> Result<Vec<(AggregateStatus, i64)>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT status, COUNT(*) FROM tournament_notifications GROUP BY status"#,
        )
        .fetch_all(&self.pool)
        .await
    }

    /// All aggregates serialized for the backup snapshot.
    pub async fn fetch_all_for_backup(&self) -> Result<Vec<serde_json::Value>, sqlx::Error> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            r#"
            SELECT row_to_json(tn) FROM tournament_notifications tn
            ORDER BY tn.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    pub async fn count_older_than(&self, retention_days: i64) -> Result<i64, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM tournament_notifications WHERE sent_at < $1"#,
        )
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete_older_than(&self, retention_days: i64) -> Result<u64, sqlx::Error> {
        let cutoff = Utc::now() - Duration::days(retention_days);
        let result = sqlx::query(
            r#"DELETE FROM tournament_notifications WHERE sent_at < $1"#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Aggregates whose tournament no longer exists.
    pub async fn count_orphaned(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tournament_notifications tn
            WHERE NOT EXISTS (SELECT 1 FROM tournaments t WHERE t.id = tn.tournament_id)
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Repair: deletes orphaned aggregates. Idempotent.
    pub async fn delete_orphaned(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM tournament_notifications tn
            WHERE NOT EXISTS (SELECT 1 FROM tournaments t WHERE t.id = tn.tournament_id)
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Aggregates whose stored total disagrees with the true linked count.
    pub async fn count_total_mismatches(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tournament_notifications tn
            WHERE tn.total_recipients <> (
                SELECT COUNT(*) FROM recipient_notifications rn
                WHERE rn.tournament_id = tn.tournament_id
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Repair: recomputes totals from the true count of linked recipient
    /// rows. Idempotent: a second run changes nothing.
    pub async fn recompute_totals(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tournament_notifications tn
            SET total_recipients = linked.cnt
            FROM (
                SELECT tn2.id, (
                    SELECT COUNT(*) FROM recipient_notifications rn
                    WHERE rn.tournament_id = tn2.tournament_id
                ) AS cnt
                FROM tournament_notifications tn2
            ) AS linked
            WHERE tn.id = linked.id AND tn.total_recipients <> linked.cnt
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Repair: stamps the migration marker on aggregates missing template
    /// bookkeeping. Idempotent.
    pub async fn backfill_templates(&self, marker: &str) -> Result<u64, sqlx::Error> {
        let templates = serde_json::json!({
            "club": marker,
            "referees": marker,
            "institutional": marker,
        });
        let result = sqlx::query(
            r#"
            UPDATE tournament_notifications
            SET templates_used = $1
            WHERE templates_used IS NULL
               OR templates_used = 'null'::jsonb
               OR templates_used = '{}'::jsonb
            "#,
        )
        .bind(templates)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Rollback: removes every aggregate row.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM tournament_notifications"#)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
