//! Tournament entity definitions.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::AggregateStatus;
use sqlx::FromRow;

/// Database entity for the tournaments table.
#[derive(Debug, Clone, FromRow)]
pub struct TournamentEntity {
    pub id: i64,
    pub name: String,
    pub club_id: Option<i64>,
    pub zone_id: i64,
    pub tournament_type_id: Option<i64>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Tournament type: referee staffing bounds are plain typed columns.
#[derive(Debug, Clone, FromRow)]
pub struct TournamentTypeEntity {
    pub id: i64,
    pub name: String,
    pub min_referees: i32,
    pub max_referees: i32,
}

/// Tournament joined with the context needed to build notification
/// recipients: club contact, zone, and type names.
#[derive(Debug, Clone, FromRow)]
pub struct TournamentWithContextEntity {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub zone_id: i64,
    pub zone_name: String,
    pub club_name: Option<String>,
    pub club_email: Option<String>,
    pub type_name: Option<String>,
}

/// A tournament with assignments but no aggregate notification yet.
#[derive(Debug, Clone, FromRow)]
pub struct ReadyTournamentEntity {
    pub id: i64,
    pub name: String,
    pub assignment_count: i64,
}

/// Listing row for the tournaments CLI: assignment count plus the latest
/// aggregate status, if any.
#[derive(Debug, Clone, FromRow)]
pub struct TournamentOverviewEntity {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub assignment_count: i64,
    pub last_notification_status: Option<AggregateStatus>,
    pub last_notification_at: Option<DateTime<Utc>>,
}
