//! Generic chunked data migration from a legacy source database.
//!
//! Source rows are streamed in fixed-size chunks as JSON, pushed through
//! the pure transform layer (scalar normalization, fuzzy zone resolution,
//! email collision handling), and written to the target schema with the
//! legacy numeric ids preserved. Every row is isolated: a bad row is
//! logged and counted, never aborts its chunk. Dry-run walks the same path
//! without a single write.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{DataValidationReport, MigrationRecord, MigrationReport};
use persistence::entities::UserRoleDb;
use persistence::metrics::record_migrated_rows;
use persistence::repositories::{
    AssignmentRepository, AvailabilityRepository, ClubRepository, HousekeepingError,
    HousekeepingRepository, NewAssignment, NewAvailability, NewClub, NewTournament, NewUser,
    TournamentRepository, UserRepository, ZoneRepository, MANAGED_TABLES,
};
use shared::normalize::{
    clean_string, normalize_email, normalize_key, parse_date_or, parse_datetime_or,
    resolve_email_collision, strip_phone,
};
use shared::validation::is_valid_email;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use super::backup::BackupWriter;
use super::mapping::{MappingConfig, MappingError, TableMapping};

/// Default number of source rows fetched per chunk.
pub const DEFAULT_CHUNK_SIZE: i64 = 100;

/// Options for a migration run.
#[derive(Debug, Clone)]
pub struct MigrationOptions {
    pub dry_run: bool,
    pub chunk_size: i64,
    pub backup: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            backup: false,
        }
    }
}

/// Structural errors that stop a run before or between tables. Per-row
/// problems never surface here; they are counted in the report.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Target schema has no zones; run base seeding first")]
    NotSeeded,

    #[error("Source table name '{0}' is not a valid identifier")]
    InvalidSourceTable(String),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    #[error("Housekeeping error: {0}")]
    Housekeeping(#[from] HousekeepingError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Per-row transform failures; isolated into the migration log.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("Missing or invalid id")]
    InvalidId,

    #[error("Unresolvable zone '{0}'")]
    UnresolvedZone(String),

    #[error("Unresolvable club reference {0}")]
    UnresolvedClub(i64),

    #[error("Unresolvable user reference {0}")]
    UnresolvedUser(i64),

    #[error("Unresolvable tournament reference {0}")]
    UnresolvedTournament(i64),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Unsupported target table '{0}'")]
    UnsupportedTarget(String),
}

/// A source row translated into its target shape.
#[derive(Debug, Clone)]
pub enum MigratedRow {
    User(NewUser),
    Club(NewClub),
    Tournament(NewTournament),
    Assignment(NewAssignment),
    Availability(NewAvailability),
}

impl MigratedRow {
    pub fn old_id(&self) -> i64 {
        match self {
            Self::User(r) => r.id,
            Self::Club(r) => r.id,
            Self::Tournament(r) => r.id,
            Self::Assignment(r) => r.id,
            Self::Availability(r) => r.id,
        }
    }

    pub fn target_table(&self) -> &'static str {
        match self {
            Self::User(_) => "users",
            Self::Club(_) => "clubs",
            Self::Tournament(_) => "tournaments",
            Self::Assignment(_) => "assignments",
            Self::Availability(_) => "availabilities",
        }
    }

    /// Snapshot of the translated data for the migration log.
    pub fn to_log_json(&self) -> serde_json::Value {
        match self {
            Self::User(r) => serde_json::json!({
                "id": r.id, "name": r.name, "email": r.email,
                "phone": r.phone, "zone_id": r.zone_id,
            }),
            Self::Club(r) => serde_json::json!({
                "id": r.id, "code": r.code, "name": r.name,
                "email": r.email, "zone_id": r.zone_id,
            }),
            Self::Tournament(r) => serde_json::json!({
                "id": r.id, "name": r.name, "club_id": r.club_id,
                "zone_id": r.zone_id, "start_date": r.start_date.to_string(),
            }),
            Self::Assignment(r) => serde_json::json!({
                "id": r.id, "tournament_id": r.tournament_id,
                "user_id": r.user_id, "is_confirmed": r.is_confirmed,
            }),
            Self::Availability(r) => serde_json::json!({
                "id": r.id, "tournament_id": r.tournament_id, "user_id": r.user_id,
            }),
        }
    }
}

/// Lookup tables the transform resolves foreign keys against. Loaded from
/// the target schema once per run and kept current as rows are accepted,
/// so dry-run resolves the same references a live run would.
#[derive(Debug)]
pub struct TransformContext {
    zones: HashMap<String, i64>,
    types: HashMap<String, i64>,
    club_ids: HashSet<i64>,
    user_ids: HashSet<i64>,
    tournament_ids: HashSet<i64>,
    taken_emails: HashSet<String>,
    now: DateTime<Utc>,
}

impl TransformContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            zones: HashMap::new(),
            types: HashMap::new(),
            club_ids: HashSet::new(),
            user_ids: HashSet::new(),
            tournament_ids: HashSet::new(),
            taken_emails: HashSet::new(),
            now,
        }
    }

    /// Registers a zone under a lookup key (name, code, or numeric id).
    pub fn add_zone(&mut self, key: &str, id: i64) {
        self.zones.insert(normalize_key(key), id);
    }

    pub fn add_type(&mut self, name: &str, id: i64) {
        self.types.insert(normalize_key(name), id);
    }

    pub fn add_existing_email(&mut self, email: &str) {
        self.taken_emails.insert(email.to_string());
    }

    /// Makes an accepted row visible to later foreign-key resolution.
    pub fn register(&mut self, row: &MigratedRow) {
        match row {
            MigratedRow::User(r) => {
                self.user_ids.insert(r.id);
                if !r.email.is_empty() {
                    self.taken_emails.insert(r.email.clone());
                }
            }
            MigratedRow::Club(r) => {
                self.club_ids.insert(r.id);
            }
            MigratedRow::Tournament(r) => {
                self.tournament_ids.insert(r.id);
            }
            MigratedRow::Assignment(_) | MigratedRow::Availability(_) => {}
        }
    }
}

/// Translates one source row according to the table mapping.
pub fn transform_row(
    mapping: &TableMapping,
    row: &serde_json::Value,
    ctx: &TransformContext,
) -> Result<MigratedRow, TransformError> {
    let mut slots = Slots::default();

    for (source_col, rule) in &mapping.columns {
        let raw = match value_as_string(row.get(source_col.as_str())) {
            Some(raw) => raw,
            None => continue,
        };

        match rule.as_str() {
            "email" => slots.email = Some(normalize_email(&raw)),
            "phone" => slots.phone = Some(strip_phone(&raw)),
            "zone_mapping" => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match ctx.zones.get(&normalize_key(trimmed)) {
                    Some(id) => slots.zone_id = Some(*id),
                    None => return Err(TransformError::UnresolvedZone(trimmed.to_string())),
                }
            }
            "club_mapping" => {
                if let Some(old) = parse_i64(&raw) {
                    if ctx.club_ids.contains(&old) {
                        slots.club_id = Some(old);
                    } else {
                        return Err(TransformError::UnresolvedClub(old));
                    }
                }
            }
            "user_mapping" => {
                if let Some(old) = parse_i64(&raw) {
                    if ctx.user_ids.contains(&old) {
                        slots.user_id = Some(old);
                    } else {
                        return Err(TransformError::UnresolvedUser(old));
                    }
                }
            }
            "tournament_mapping" => {
                if let Some(old) = parse_i64(&raw) {
                    if ctx.tournament_ids.contains(&old) {
                        slots.tournament_id = Some(old);
                    } else {
                        return Err(TransformError::UnresolvedTournament(old));
                    }
                }
            }
            // Unknown type names are tolerated: legacy data is full of
            // ad-hoc tournament types and the column is nullable.
            "type_mapping" => {
                slots.type_id = ctx.types.get(&normalize_key(&raw)).copied();
            }
            "status_mapping" => slots.confirmed = Some(parse_status(&raw)),
            "role_mapping" => {
                slots.role = Some(match normalize_key(&raw).as_str() {
                    "admin" | "administrator" => UserRoleDb::Admin,
                    _ => UserRoleDb::Referee,
                });
            }
            "id" => slots.id = parse_i64(&raw),
            "created_at" => slots.created_at = Some(parse_datetime_or(&raw, ctx.now)),
            "start_date" | "end_date" => {
                slots.dates.insert(rule.clone(), parse_date_or(&raw, ctx.now));
            }
            target_col => {
                slots.strings.insert(target_col.to_string(), clean_string(&raw));
            }
        }
    }

    finalize(&mapping.target, slots, ctx)
}

#[derive(Debug, Default)]
struct Slots {
    id: Option<i64>,
    strings: BTreeMap<String, String>,
    dates: BTreeMap<String, NaiveDate>,
    email: Option<String>,
    phone: Option<String>,
    zone_id: Option<i64>,
    club_id: Option<i64>,
    user_id: Option<i64>,
    tournament_id: Option<i64>,
    type_id: Option<i64>,
    confirmed: Option<bool>,
    role: Option<UserRoleDb>,
    created_at: Option<DateTime<Utc>>,
}

fn finalize(
    target: &str,
    slots: Slots,
    ctx: &TransformContext,
) -> Result<MigratedRow, TransformError> {
    let id = slots.id.ok_or(TransformError::InvalidId)?;
    let created_at = slots.created_at.unwrap_or(ctx.now);

    match target {
        "users" => {
            // Empty emails are tolerated as-is; only collisions between
            // real addresses get a numeric suffix.
            let email = resolve_email_collision(
                &slots.email.unwrap_or_default(),
                &ctx.taken_emails,
            );
            Ok(MigratedRow::User(NewUser {
                id,
                name: slots.strings.get("name").cloned().unwrap_or_default(),
                email,
                phone: slots.phone.unwrap_or_default(),
                role: slots.role.unwrap_or_default(),
                zone_id: slots.zone_id,
                created_at,
            }))
        }
        "clubs" => Ok(MigratedRow::Club(NewClub {
            id,
            zone_id: slots.zone_id,
            code: slots.strings.get("code").cloned().unwrap_or_default(),
            name: slots.strings.get("name").cloned().unwrap_or_default(),
            email: slots.email.unwrap_or_default(),
            phone: slots.phone.unwrap_or_default(),
            created_at,
        })),
        "tournaments" => {
            let start_date = slots
                .dates
                .get("start_date")
                .copied()
                .unwrap_or_else(|| ctx.now.date_naive());
            let end_date = slots.dates.get("end_date").copied().unwrap_or(start_date);
            Ok(MigratedRow::Tournament(NewTournament {
                id,
                name: slots.strings.get("name").cloned().unwrap_or_default(),
                club_id: slots.club_id,
                zone_id: slots.zone_id.ok_or(TransformError::MissingField("zone"))?,
                tournament_type_id: slots.type_id,
                start_date,
                end_date,
                created_at,
            }))
        }
        "assignments" => Ok(MigratedRow::Assignment(NewAssignment {
            id,
            tournament_id: slots
                .tournament_id
                .ok_or(TransformError::MissingField("tournament"))?,
            user_id: slots.user_id.ok_or(TransformError::MissingField("user"))?,
            role: slots
                .strings
                .get("role")
                .cloned()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "referee".to_string()),
            is_confirmed: slots.confirmed.unwrap_or(false),
            created_at,
        })),
        "availabilities" => Ok(MigratedRow::Availability(NewAvailability {
            id,
            tournament_id: slots
                .tournament_id
                .ok_or(TransformError::MissingField("tournament"))?,
            user_id: slots.user_id.ok_or(TransformError::MissingField("user"))?,
            created_at,
        })),
        other => Err(TransformError::UnsupportedTarget(other.to_string())),
    }
}

fn value_as_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn parse_i64(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

fn parse_status(raw: &str) -> bool {
    matches!(
        normalize_key(raw).as_str(),
        "1" | "true" | "yes" | "y" | "si" | "ok" | "confirmed"
    )
}

/// Runs the chunked migration against a source database.
pub struct DataMigrationHelper {
    target: PgPool,
    source: PgPool,
    backups: BackupWriter,
    reports: BackupWriter,
}

impl DataMigrationHelper {
    pub fn new(target: PgPool, source: PgPool, backups: BackupWriter, reports: BackupWriter) -> Self {
        Self {
            target,
            source,
            backups,
            reports,
        }
    }

    /// Migrates every mapped source table in dependency order. Returns the
    /// per-row report together with the informational validation counts.
    pub async fn migrate(
        &self,
        mapping: &MappingConfig,
        opts: &MigrationOptions,
    ) -> Result<(MigrationReport, DataValidationReport), MigrationError> {
        mapping.validate()?;

        let zones = ZoneRepository::new(self.target.clone());
        if zones.count().await? == 0 {
            return Err(MigrationError::NotSeeded);
        }

        if opts.backup {
            if opts.dry_run {
                info!("Dry-run: skipping target backup");
            } else {
                self.backup_target().await;
            }
        }

        let mut ctx = self.load_context(&zones).await?;
        let mut report = MigrationReport {
            dry_run: opts.dry_run,
            ..MigrationReport::default()
        };
        let mut touched_tables: Vec<String> = Vec::new();

        for source_table in mapping.ordered_sources() {
            let table_mapping = &mapping.tables[source_table];
            self.migrate_table(source_table, table_mapping, opts, &mut ctx, &mut report)
                .await?;
            if !touched_tables.contains(&table_mapping.target) {
                touched_tables.push(table_mapping.target.clone());
            }
        }

        if !opts.dry_run {
            self.reset_sequences(&touched_tables).await?;
        }

        let validation = self.validate_migrated_data().await?;

        // Dry-run must leave the file system untouched too; the log is
        // printed by the caller instead.
        if !opts.dry_run {
            match self.reports.write_report("migration_log", &report) {
                Ok(path) => info!(path = %path.display(), "Migration log written"),
                Err(e) => warn!(error = %e, "Failed to write migration log"),
            }
        }

        info!(
            total = report.total_records,
            migrated = report.migrated_records,
            skipped = report.skipped_records,
            errors = report.error_records,
            dry_run = report.dry_run,
            "Data migration finished"
        );

        Ok((report, validation))
    }

    async fn migrate_table(
        &self,
        source_table: &str,
        mapping: &TableMapping,
        opts: &MigrationOptions,
        ctx: &mut TransformContext,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        if !is_safe_identifier(source_table) {
            return Err(MigrationError::InvalidSourceTable(source_table.to_string()));
        }

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", source_table))
            .fetch_one(&self.source)
            .await?;

        info!(
            source_table,
            target_table = %mapping.target,
            rows = total,
            "Migrating table"
        );

        let mut offset: i64 = 0;
        loop {
            let chunk: Vec<(serde_json::Value,)> = sqlx::query_as(&format!(
                "SELECT row_to_json(t) FROM {} t ORDER BY t.id ASC LIMIT $1 OFFSET $2",
                source_table
            ))
            .bind(opts.chunk_size)
            .bind(offset)
            .fetch_all(&self.source)
            .await?;

            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as i64;

            for (row,) in &chunk {
                self.migrate_row(mapping, row, opts, ctx, report).await;
            }
        }

        Ok(())
    }

    /// One row, fully isolated: any failure is recorded and counted, and
    /// the chunk moves on.
    async fn migrate_row(
        &self,
        mapping: &TableMapping,
        row: &serde_json::Value,
        opts: &MigrationOptions,
        ctx: &mut TransformContext,
        report: &mut MigrationReport,
    ) {
        let old_id = row
            .get("id")
            .and_then(|v| v.as_i64())
            .unwrap_or_default();

        let migrated = match transform_row(mapping, row, ctx) {
            Ok(migrated) => migrated,
            Err(e) => {
                warn!(old_id, table = %mapping.target, error = %e, "Row translation failed");
                record_migrated_rows(&mapping.target, false, 1);
                report.record_error(MigrationRecord::failure(old_id, &mapping.target, e.to_string()));
                return;
            }
        };

        if opts.dry_run {
            ctx.register(&migrated);
            report.record_success(MigrationRecord::success(
                migrated.old_id(),
                migrated.target_table(),
                migrated.to_log_json(),
            ));
            return;
        }

        match self.write_row(&migrated).await {
            Ok(0) => {
                ctx.register(&migrated);
                report.record_skip(MigrationRecord::skipped(
                    migrated.old_id(),
                    migrated.target_table(),
                    "row already present; skipped",
                ));
            }
            Ok(_) => {
                ctx.register(&migrated);
                record_migrated_rows(migrated.target_table(), true, 1);
                report.record_success(MigrationRecord::success(
                    migrated.old_id(),
                    migrated.target_table(),
                    migrated.to_log_json(),
                ));
            }
            Err(e) => {
                warn!(
                    old_id = migrated.old_id(),
                    table = migrated.target_table(),
                    error = %e,
                    "Row write failed"
                );
                record_migrated_rows(migrated.target_table(), false, 1);
                report.record_error(MigrationRecord::failure(
                    migrated.old_id(),
                    migrated.target_table(),
                    e.to_string(),
                ));
            }
        }
    }

    async fn write_row(&self, row: &MigratedRow) -> Result<u64, sqlx::Error> {
        match row {
            MigratedRow::User(input) => {
                UserRepository::new(self.target.clone()).insert_migrated(input).await
            }
            MigratedRow::Club(input) => {
                ClubRepository::new(self.target.clone()).insert_migrated(input).await
            }
            MigratedRow::Tournament(input) => {
                TournamentRepository::new(self.target.clone())
                    .insert_migrated(input)
                    .await
            }
            MigratedRow::Assignment(input) => {
                AssignmentRepository::new(self.target.clone())
                    .insert_migrated(input)
                    .await
            }
            MigratedRow::Availability(input) => {
                AvailabilityRepository::new(self.target.clone())
                    .insert_migrated(input)
                    .await
            }
        }
    }

    async fn load_context(&self, zones: &ZoneRepository) -> Result<TransformContext, MigrationError> {
        let mut ctx = TransformContext::new(Utc::now());

        for zone in zones.find_all().await? {
            ctx.add_zone(&zone.code, zone.id);
            ctx.add_zone(&zone.name, zone.id);
            ctx.add_zone(&zone.id.to_string(), zone.id);
        }

        let tournaments = TournamentRepository::new(self.target.clone());
        for tournament_type in tournaments.find_all_types().await? {
            ctx.add_type(&tournament_type.name, tournament_type.id);
        }
        for id in tournaments.find_all_ids().await? {
            ctx.tournament_ids.insert(id);
        }

        for club in ClubRepository::new(self.target.clone()).find_all().await? {
            ctx.club_ids.insert(club.id);
        }

        let users = UserRepository::new(self.target.clone());
        for id in users.find_all_ids().await? {
            ctx.user_ids.insert(id);
        }
        for email in users.find_all_emails().await? {
            ctx.add_existing_email(&email);
        }

        Ok(ctx)
    }

    /// Dumps the managed target tables before writing. A failed backup is
    /// a warning, not a stop: dry-run remains the safety net.
    async fn backup_target(&self) {
        let housekeeping = HousekeepingRepository::new(self.target.clone());
        let mut sections = BTreeMap::new();
        for table in MANAGED_TABLES {
            match housekeeping.fetch_table_json(table).await {
                Ok(rows) => {
                    sections.insert(table.to_string(), rows);
                }
                Err(e) => {
                    warn!(table, error = %e, "Backup could not read table; continuing");
                    return;
                }
            }
        }
        if let Err(e) = self.backups.write_snapshot("target_before_migration", sections) {
            warn!(error = %e, "Backup snapshot failed; continuing");
        }
    }

    async fn reset_sequences(&self, tables: &[String]) -> Result<(), MigrationError> {
        let housekeeping = HousekeepingRepository::new(self.target.clone());
        for table in tables {
            housekeeping.reset_identity_sequence(table).await?;
        }
        Ok(())
    }

    /// Informational post-migration counts; weak rows are surfaced, not
    /// rejected.
    pub async fn validate_migrated_data(&self) -> Result<DataValidationReport, MigrationError> {
        let users = UserRepository::new(self.target.clone());
        let clubs = ClubRepository::new(self.target.clone());
        let tournaments = TournamentRepository::new(self.target.clone());

        let user_emails = users.find_all_emails().await?;
        let users_with_valid_email = user_emails
            .iter()
            .filter(|email| is_valid_email(email))
            .count() as i64;

        Ok(DataValidationReport {
            users_total: users.count().await?,
            users_with_valid_email,
            users_with_zone: users.count_with_zone().await?,
            clubs_total: clubs.count().await?,
            clubs_with_zone: clubs.count_with_zone().await?,
            tournaments_total: tournaments.count().await?,
            tournaments_with_club: tournaments.count_with_club().await?,
        })
    }
}

fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mapping::MappingConfig;

    fn context() -> TransformContext {
        let mut ctx = TransformContext::new(Utc::now());
        ctx.add_zone("Zone 1", 1);
        ctx.add_zone("Z1", 1);
        ctx.add_zone("1", 1);
        ctx.add_zone("Zone 2", 2);
        ctx.add_type("National Open", 7);
        ctx
    }

    fn mapping_for(table: &str) -> TableMapping {
        MappingConfig::default().tables[table].clone()
    }

    #[test]
    fn test_user_row_normalized() {
        let ctx = context();
        let row = serde_json::json!({
            "id": 12,
            "name": "  Mario Rossi ",
            "email": " Mario.Rossi@Golf.IT ",
            "phone": "+39 06 123-456",
            "zone": "ZONA... wrong", // resolved below
        });
        // Unresolvable zone must fail the row.
        assert!(matches!(
            transform_row(&mapping_for("old_users"), &row, &ctx),
            Err(TransformError::UnresolvedZone(_))
        ));

        let row = serde_json::json!({
            "id": 12,
            "name": "  Mario Rossi ",
            "email": " Mario.Rossi@Golf.IT ",
            "phone": "+39 06 123-456",
            "zone": "zone-1",
            "role": "referee"
        });
        match transform_row(&mapping_for("old_users"), &row, &ctx).unwrap() {
            MigratedRow::User(user) => {
                assert_eq!(user.id, 12);
                assert_eq!(user.name, "Mario Rossi");
                assert_eq!(user.email, "mario.rossi@golf.it");
                assert_eq!(user.phone, "+3906123456");
                assert_eq!(user.zone_id, Some(1));
                assert_eq!(user.role, UserRoleDb::Referee);
            }
            other => panic!("expected user, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_email_tolerated_not_an_error() {
        // Scenario: a source user without an email migrates with email=''.
        let ctx = context();
        let row = serde_json::json!({"id": 3, "name": "No Mail", "email": "", "zone": "Z1"});
        match transform_row(&mapping_for("old_users"), &row, &ctx).unwrap() {
            MigratedRow::User(user) => assert_eq!(user.email, ""),
            other => panic!("expected user, got {:?}", other),
        }
    }

    #[test]
    fn test_email_collision_gets_suffix() {
        let mut ctx = context();
        let row = serde_json::json!({"id": 1, "name": "A", "email": "a@b.com", "zone": "Z1"});
        let first = transform_row(&mapping_for("old_users"), &row, &ctx).unwrap();
        ctx.register(&first);

        let row = serde_json::json!({"id": 2, "name": "B", "email": "a@b.com", "zone": "Z1"});
        match transform_row(&mapping_for("old_users"), &row, &ctx).unwrap() {
            MigratedRow::User(user) => assert_eq!(user.email, "a1@b.com"),
            other => panic!("expected user, got {:?}", other),
        }
    }

    #[test]
    fn test_tournament_requires_zone_and_defaults_dates() {
        let ctx = context();
        let row = serde_json::json!({"id": 5, "name": "Open", "start_date": "not a date"});
        assert_eq!(
            transform_row(&mapping_for("old_tournaments"), &row, &ctx).unwrap_err(),
            TransformError::MissingField("zone")
        );

        let row = serde_json::json!({
            "id": 5, "name": "Open", "zone": "Zone 2",
            "type": "national open",
            "start_date": "2023-04-10", "end_date": "garbage"
        });
        match transform_row(&mapping_for("old_tournaments"), &row, &ctx).unwrap() {
            MigratedRow::Tournament(t) => {
                assert_eq!(t.zone_id, 2);
                assert_eq!(t.tournament_type_id, Some(7));
                assert_eq!(t.start_date, NaiveDate::from_ymd_opt(2023, 4, 10).unwrap());
                // Unparseable end date falls back to "now", defensively.
                assert_eq!(t.end_date, ctx.now.date_naive());
            }
            other => panic!("expected tournament, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_resolves_references() {
        let mut ctx = context();
        ctx.register(&MigratedRow::Tournament(NewTournament {
            id: 5,
            name: "Open".to_string(),
            club_id: None,
            zone_id: 1,
            tournament_type_id: None,
            start_date: ctx.now.date_naive(),
            end_date: ctx.now.date_naive(),
            created_at: ctx.now,
        }));
        ctx.register(&MigratedRow::User(NewUser {
            id: 12,
            name: "Mario".to_string(),
            email: String::new(),
            phone: String::new(),
            role: UserRoleDb::Referee,
            zone_id: None,
            created_at: ctx.now,
        }));

        let row = serde_json::json!({
            "id": 31, "tournament": 5, "user": 12,
            "role": "observer", "confirmed": "Yes"
        });
        match transform_row(&mapping_for("old_assignments"), &row, &ctx).unwrap() {
            MigratedRow::Assignment(a) => {
                assert_eq!(a.tournament_id, 5);
                assert_eq!(a.user_id, 12);
                assert_eq!(a.role, "observer");
                assert!(a.is_confirmed);
            }
            other => panic!("expected assignment, got {:?}", other),
        }

        // A dangling user reference is a per-row error.
        let row = serde_json::json!({"id": 32, "tournament": 5, "user": 99});
        assert_eq!(
            transform_row(&mapping_for("old_assignments"), &row, &ctx).unwrap_err(),
            TransformError::UnresolvedUser(99)
        );
    }

    #[test]
    fn test_status_mapping_variants() {
        assert!(parse_status("1"));
        assert!(parse_status("Yes"));
        assert!(parse_status("confirmed"));
        assert!(parse_status("SI"));
        assert!(!parse_status("0"));
        assert!(!parse_status("no"));
        assert!(!parse_status(""));
    }

    #[test]
    fn test_missing_id_is_invalid() {
        let ctx = context();
        let row = serde_json::json!({"name": "A", "zone": "Z1"});
        assert_eq!(
            transform_row(&mapping_for("old_users"), &row, &ctx).unwrap_err(),
            TransformError::InvalidId
        );
    }

    #[test]
    fn test_safe_identifier() {
        assert!(is_safe_identifier("old_users"));
        assert!(is_safe_identifier("_tmp"));
        assert!(!is_safe_identifier("1users"));
        assert!(!is_safe_identifier("users; DROP TABLE zones"));
        assert!(!is_safe_identifier(""));
    }
}
