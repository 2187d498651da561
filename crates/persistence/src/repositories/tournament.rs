//! Tournament repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::entities::{
    AssignedRefereeEntity, ReadyTournamentEntity, TournamentOverviewEntity,
    TournamentWithContextEntity,
};

/// Input for inserting a tournament migrated from the legacy source. The
/// legacy numeric id is preserved as the primary key.
#[derive(Debug, Clone)]
pub struct NewTournament {
    pub id: i64,
    pub name: String,
    pub club_id: Option<i64>,
    pub zone_id: i64,
    pub tournament_type_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Repository for tournament queries.
#[derive(Debug, Clone)]
pub struct TournamentRepository {
    pool: PgPool,
}

impl TournamentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads a tournament together with its club contact and zone, the
    /// context the notification aggregator needs.
    pub async fn find_with_context(
        &self,
        id: i64,
    ) -> Result<Option<TournamentWithContextEntity>, sqlx::Error> {
        sqlx::query_as::<_, TournamentWithContextEntity>(
            r#"
            SELECT t.id, t.name, t.start_date, t.end_date, t.zone_id,
                   z.name AS zone_name,
                   c.name AS club_name, c.email AS club_email,
                   tt.name AS type_name
            FROM tournaments t
            JOIN zones z ON z.id = t.zone_id
            LEFT JOIN clubs c ON c.id = t.club_id
            LEFT JOIN tournament_types tt ON tt.id = t.tournament_type_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn count_assignments(&self, id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM assignments WHERE tournament_id = $1"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }

    /// Assigned referees with their contact data, ordered by assignment.
    pub async fn find_assigned_referees(
        &self,
        id: i64,
    ) -> Result<Vec<AssignedRefereeEntity>, sqlx::Error> {
        sqlx::query_as::<_, AssignedRefereeEntity>(
            r#"
            SELECT a.id AS assignment_id, u.id AS user_id, u.name, u.email, a.role
            FROM assignments a
            JOIN users u ON u.id = a.user_id
            WHERE a.tournament_id = $1
            ORDER BY a.id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
    }

    /// Tournaments with assignments but no aggregate notification yet.
    pub async fn find_ready_for_notification(
        &self,
    ) -> Result<Vec<ReadyTournamentEntity>, sqlx::Error> {
        sqlx::query_as::<_, ReadyTournamentEntity>(
            r#"
            SELECT t.id, t.name, COUNT(a.id) AS assignment_count
            FROM tournaments t
            JOIN assignments a ON a.tournament_id = t.id
            WHERE NOT EXISTS (
                SELECT 1 FROM tournament_notifications tn WHERE tn.tournament_id = t.id
            )
            GROUP BY t.id, t.name
            ORDER BY t.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_ready_for_notification(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tournaments t
            WHERE EXISTS (SELECT 1 FROM assignments a WHERE a.tournament_id = t.id)
              AND NOT EXISTS (
                  SELECT 1 FROM tournament_notifications tn WHERE tn.tournament_id = t.id
              )
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    /// Listing for the CLI: assignment count plus the latest aggregate.
    pub async fn list_overview(
        &self,
        limit: i64,
    ) -> Result<Vec<TournamentOverviewEntity>, sqlx::Error> {
        sqlx::query_as::<_, TournamentOverviewEntity>(
            r#"
            SELECT t.id, t.name, t.start_date,
                   (SELECT COUNT(*) FROM assignments a WHERE a.tournament_id = t.id)
                       AS assignment_count,
                   latest.status AS last_notification_status,
                   latest.sent_at AS last_notification_at
            FROM tournaments t
            LEFT JOIN LATERAL (
                SELECT tn.status, tn.sent_at
                FROM tournament_notifications tn
                WHERE tn.tournament_id = t.id
                ORDER BY tn.created_at DESC
                LIMIT 1
            ) latest ON TRUE
            ORDER BY t.start_date DESC, t.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Inserts a migrated tournament, preserving its legacy id. Returns the
    /// number of rows written (0 when the id already exists).
    pub async fn insert_migrated(&self, input: &NewTournament) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO tournaments
                (id, name, club_id, zone_id, tournament_type_id, start_date, end_date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(input.id)
        .bind(&input.name)
        .bind(input.club_id)
        .bind(input.zone_id)
        .bind(input.tournament_type_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM tournaments"#)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_with_club(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM tournaments WHERE club_id IS NOT NULL"#)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find_all_ids(&self) -> Result<Vec<i64>, sqlx::Error> {
        sqlx::query_scalar(r#"SELECT id FROM tournaments"#)
            .fetch_all(&self.pool)
            .await
    }

    /// All tournament types, for name-based resolution during migration.
    pub async fn find_all_types(&self) -> Result<Vec<crate::entities::TournamentTypeEntity>, sqlx::Error> {
        sqlx::query_as::<_, crate::entities::TournamentTypeEntity>(
            r#"SELECT id, name, min_referees, max_referees FROM tournament_types ORDER BY id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
