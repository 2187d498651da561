//! Legacy-to-new notification migration.
//!
//! One-time reconciliation of recipient rows written before the aggregate
//! schema existed: analyze the damage, back everything up, link legacy
//! rows to their tournaments through the assignment linkage, synthesize
//! aggregate records from the linked rows, clean orphans and duplicates,
//! and validate the result. Rollback returns the subsystem to its
//! legacy-only state; repair re-runs the four idempotent fix-ups on their
//! own.
//!
//! The migrate step runs inside one outer transaction: row-level
//! resolution failures are logged and skipped before the write, while a
//! catastrophic failure rolls the whole step back.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use domain::models::{
    AggregateStatus, LegacyAnalysis, LegacyMigrationPhase, LegacyMigrationSummary,
    NotificationDetails, NotificationStatus, RecipientType, RepairReport, RollbackReport,
    ValidationReport,
};
use persistence::entities::tournament_notification::MIGRATED_TEMPLATE_MARKER;
use persistence::repositories::{
    AssignmentRepository, RecipientNotificationRepository, TournamentNotificationRepository,
    TournamentRepository,
};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use super::backup::{BackupError, BackupManifest, BackupWriter};

/// Rows processed per chunk while scanning legacy data.
const LEGACY_CHUNK_SIZE: i64 = 200;

#[derive(Debug, Error)]
pub enum LegacyMigrationError {
    #[error("Phase violation: cannot {action} while {phase}")]
    PhaseViolation {
        action: &'static str,
        phase: LegacyMigrationPhase,
    },

    #[error("Backup error: {0}")]
    Backup(#[from] BackupError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of the orphan/duplicate cleanup step.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct InconsistencyCleanup {
    pub orphans_deleted: u64,
    pub duplicates_deleted: u64,
    pub dry_run: bool,
}

/// Drives the legacy notification migration.
pub struct LegacyNotificationMigrator {
    pool: PgPool,
    recipients: RecipientNotificationRepository,
    aggregates: TournamentNotificationRepository,
    tournaments: TournamentRepository,
    assignments: AssignmentRepository,
    backups: BackupWriter,
    phase: LegacyMigrationPhase,
}

impl LegacyNotificationMigrator {
    pub fn new(pool: PgPool, backups: BackupWriter) -> Self {
        Self {
            recipients: RecipientNotificationRepository::new(pool.clone()),
            aggregates: TournamentNotificationRepository::new(pool.clone()),
            tournaments: TournamentRepository::new(pool.clone()),
            assignments: AssignmentRepository::new(pool.clone()),
            backups,
            pool,
            phase: LegacyMigrationPhase::NotAnalyzed,
        }
    }

    pub fn phase(&self) -> LegacyMigrationPhase {
        self.phase
    }

    /// Counts the current state of the subsystem without touching it.
    pub async fn analyze(&mut self) -> Result<LegacyAnalysis, LegacyMigrationError> {
        let analysis = LegacyAnalysis {
            legacy_rows: self.recipients.count_legacy().await?,
            aggregate_rows: self.aggregates.count_all().await?,
            ready_tournaments: self.tournaments.count_ready_for_notification().await?,
            orphaned_rows: self.recipients.count_orphans().await?,
            duplicate_groups: self.recipients.find_duplicate_groups().await?.len() as i64,
        };

        if self.phase == LegacyMigrationPhase::NotAnalyzed {
            self.phase = LegacyMigrationPhase::Analyzed;
        }

        info!(
            legacy_rows = analysis.legacy_rows,
            aggregate_rows = analysis.aggregate_rows,
            ready_tournaments = analysis.ready_tournaments,
            orphaned_rows = analysis.orphaned_rows,
            duplicate_groups = analysis.duplicate_groups,
            "Legacy notification analysis"
        );
        Ok(analysis)
    }

    /// Snapshots all legacy recipient rows and all aggregates. Mandatory
    /// before migrate; rollback without this file is unrecoverable.
    pub async fn backup(&mut self) -> Result<BackupManifest, LegacyMigrationError> {
        let mut sections = BTreeMap::new();
        sections.insert(
            "recipient_notifications_legacy".to_string(),
            self.recipients.fetch_legacy_for_backup().await?,
        );
        sections.insert(
            "tournament_notifications".to_string(),
            self.aggregates.fetch_all_for_backup().await?,
        );

        let manifest = self.backups.write_snapshot("legacy_notifications", sections)?;
        self.phase = LegacyMigrationPhase::BackedUp;
        Ok(manifest)
    }

    /// Links legacy rows and synthesizes aggregates, inside one
    /// transaction. Unresolvable rows are logged and skipped; they never
    /// abort the step.
    pub async fn migrate(&mut self, dry_run: bool) -> Result<LegacyMigrationSummary, LegacyMigrationError> {
        if dry_run {
            return self.simulate_migrate().await;
        }
        if !self.phase.can_migrate() {
            return Err(LegacyMigrationError::PhaseViolation {
                action: "migrate",
                phase: self.phase,
            });
        }

        self.phase = LegacyMigrationPhase::Migrating;
        let linkage: HashMap<i64, i64> =
            self.assignments.linkage_map().await?.into_iter().collect();

        let mut summary = LegacyMigrationSummary::default();
        let mut tx = self.pool.begin().await?;

        let mut offset = 0;
        loop {
            let chunk = self.recipients.find_legacy_chunk(LEGACY_CHUNK_SIZE, offset).await?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as i64;

            for row in &chunk {
                let resolved = row.assignment_id.and_then(|aid| linkage.get(&aid).copied());
                match resolved {
                    Some(tournament_id) => {
                        sqlx::query(
                            r#"UPDATE recipient_notifications SET tournament_id = $2 WHERE id = $1"#,
                        )
                        .bind(row.id)
                        .bind(tournament_id)
                        .execute(&mut *tx)
                        .await?;
                        summary.linked_rows += 1;
                    }
                    None => {
                        warn!(
                            id = %row.id,
                            assignment_id = ?row.assignment_id,
                            "Legacy row has no resolvable tournament; skipped"
                        );
                        summary.skipped_rows += 1;
                    }
                }
            }
        }

        // Synthesize an aggregate for every ready tournament that ended up
        // with linked rows.
        let ready = self.tournaments.find_ready_for_notification().await?;
        for tournament in &ready {
            let grouped: Vec<(RecipientType, NotificationStatus, i64)> = sqlx::query_as(
                r#"
                SELECT recipient_type, status, COUNT(*)
                FROM recipient_notifications
                WHERE tournament_id = $1
                GROUP BY recipient_type, status
                "#,
            )
            .bind(tournament.id)
            .fetch_all(&mut *tx)
            .await?;

            if grouped.is_empty() {
                continue;
            }

            let details = summarize_legacy_rows(&grouped);
            let status: AggregateStatus = details.derive_status();
            let last_sent: Option<DateTime<Utc>> = sqlx::query_scalar(
                r#"SELECT MAX(sent_at) FROM recipient_notifications WHERE tournament_id = $1"#,
            )
            .bind(tournament.id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO tournament_notifications
                    (tournament_id, status, total_recipients, sent_at, sent_by,
                     details, templates_used, error_message, attachments)
                VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, '[]'::jsonb)
                "#,
            )
            .bind(tournament.id)
            .bind(status)
            .bind(details.total())
            .bind(last_sent)
            .bind("legacy_migration")
            .bind(serde_json::to_value(details).unwrap_or_default())
            .bind(serde_json::json!({
                "club": MIGRATED_TEMPLATE_MARKER,
                "referees": MIGRATED_TEMPLATE_MARKER,
                "institutional": MIGRATED_TEMPLATE_MARKER,
            }))
            .execute(&mut *tx)
            .await?;
            summary.synthesized_aggregates += 1;
        }

        tx.commit().await?;
        self.phase = LegacyMigrationPhase::Validated;

        info!(
            linked = summary.linked_rows,
            skipped = summary.skipped_rows,
            synthesized = summary.synthesized_aggregates,
            "Legacy migration committed"
        );
        Ok(summary)
    }

    /// Dry-run migrate: computes the same summary without a single write.
    async fn simulate_migrate(&self) -> Result<LegacyMigrationSummary, LegacyMigrationError> {
        let linkage: HashMap<i64, i64> =
            self.assignments.linkage_map().await?.into_iter().collect();

        let mut summary = LegacyMigrationSummary {
            dry_run: true,
            ..LegacyMigrationSummary::default()
        };
        let mut resolved_tournaments: HashSet<i64> = HashSet::new();

        let mut offset = 0;
        loop {
            let chunk = self.recipients.find_legacy_chunk(LEGACY_CHUNK_SIZE, offset).await?;
            if chunk.is_empty() {
                break;
            }
            offset += chunk.len() as i64;

            for row in &chunk {
                match row.assignment_id.and_then(|aid| linkage.get(&aid).copied()) {
                    Some(tournament_id) => {
                        summary.linked_rows += 1;
                        resolved_tournaments.insert(tournament_id);
                    }
                    None => summary.skipped_rows += 1,
                }
            }
        }

        for tournament in self.tournaments.find_ready_for_notification().await? {
            if resolved_tournaments.contains(&tournament.id)
                || self.recipients.count_by_tournament(tournament.id).await? > 0
            {
                summary.synthesized_aggregates += 1;
            }
        }

        Ok(summary)
    }

    /// Deletes orphans; per duplicate group keeps the most recent row.
    pub async fn cleanup_inconsistent(
        &self,
        dry_run: bool,
    ) -> Result<InconsistencyCleanup, LegacyMigrationError> {
        let report = if dry_run {
            InconsistencyCleanup {
                orphans_deleted: self.recipients.count_orphans().await? as u64,
                duplicates_deleted: self.recipients.count_duplicate_rows().await? as u64,
                dry_run: true,
            }
        } else {
            InconsistencyCleanup {
                orphans_deleted: self.recipients.delete_orphans().await?,
                duplicates_deleted: self.recipients.delete_duplicate_rows().await?,
                dry_run: false,
            }
        };

        info!(
            orphans = report.orphans_deleted,
            duplicates = report.duplicates_deleted,
            dry_run = report.dry_run,
            "Inconsistent notification data cleanup"
        );
        Ok(report)
    }

    /// Reports remaining inconsistencies. Mismatches are warnings; the
    /// migration is not failed over them.
    pub async fn validate(&mut self) -> Result<ValidationReport, LegacyMigrationError> {
        let report = ValidationReport {
            unlinked_rows: self.recipients.count_legacy().await?,
            orphaned_aggregates: self.aggregates.count_orphaned().await?,
            total_mismatches: self.aggregates.count_total_mismatches().await?,
        };

        if report.is_consistent() {
            info!("Legacy migration validation: consistent");
        } else {
            warn!(
                unlinked_rows = report.unlinked_rows,
                orphaned_aggregates = report.orphaned_aggregates,
                total_mismatches = report.total_mismatches,
                "Legacy migration validation found inconsistencies"
            );
        }

        if self.phase == LegacyMigrationPhase::Validated {
            self.phase = LegacyMigrationPhase::Done;
        }
        Ok(report)
    }

    /// The four idempotent repairs, callable independently of the main
    /// flow: backfill links, drop orphaned aggregates, recompute totals,
    /// backfill template markers.
    pub async fn repair(&self) -> Result<RepairReport, LegacyMigrationError> {
        let report = RepairReport {
            links_backfilled: self.recipients.backfill_links_from_assignments().await?,
            orphaned_aggregates_deleted: self.aggregates.delete_orphaned().await?,
            totals_recomputed: self.aggregates.recompute_totals().await?,
            templates_backfilled: self.aggregates.backfill_templates(MIGRATED_TEMPLATE_MARKER).await?,
        };

        info!(
            links = report.links_backfilled,
            orphaned_aggregates = report.orphaned_aggregates_deleted,
            totals = report.totals_recomputed,
            templates = report.templates_backfilled,
            "Notification repair pass"
        );
        Ok(report)
    }

    /// Clears every tournament link and deletes every aggregate, returning
    /// the subsystem to its pre-migration state. Irreversible without the
    /// backup snapshot.
    pub async fn rollback(&mut self, dry_run: bool) -> Result<RollbackReport, LegacyMigrationError> {
        let report = if dry_run {
            RollbackReport {
                links_cleared: self.recipients.count_linked().await? as u64,
                aggregates_deleted: self.aggregates.count_all().await? as u64,
                dry_run: true,
            }
        } else {
            let report = RollbackReport {
                links_cleared: self.recipients.clear_all_links().await?,
                aggregates_deleted: self.aggregates.delete_all().await?,
                dry_run: false,
            };
            self.phase = LegacyMigrationPhase::RolledBack;
            report
        };

        info!(
            links_cleared = report.links_cleared,
            aggregates_deleted = report.aggregates_deleted,
            dry_run = report.dry_run,
            "Legacy migration rollback"
        );
        Ok(report)
    }
}

/// Folds grouped (type, status, count) rows into per-category counters.
/// A legacy row counts as sent only when its status is sent; everything
/// else (failed, pending, cancelled) counts against the category.
fn summarize_legacy_rows(
    grouped: &[(RecipientType, NotificationStatus, i64)],
) -> NotificationDetails {
    let mut details = NotificationDetails::default();
    for (recipient_type, status, count) in grouped {
        let counts = match recipient_type {
            RecipientType::Club => &mut details.club,
            RecipientType::Referee => &mut details.referees,
            RecipientType::Institutional => &mut details.institutional,
        };
        if *status == NotificationStatus::Sent {
            counts.sent += *count as i32;
        } else {
            counts.failed += *count as i32;
        }
    }
    details
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_legacy_rows() {
        let grouped = vec![
            (RecipientType::Club, NotificationStatus::Sent, 1),
            (RecipientType::Referee, NotificationStatus::Sent, 3),
            (RecipientType::Referee, NotificationStatus::Failed, 1),
            (RecipientType::Institutional, NotificationStatus::Cancelled, 2),
        ];
        let details = summarize_legacy_rows(&grouped);
        assert_eq!(details.club.sent, 1);
        assert_eq!(details.referees.sent, 3);
        assert_eq!(details.referees.failed, 1);
        // Cancelled legacy rows count against the category.
        assert_eq!(details.institutional.failed, 2);
        assert_eq!(details.total(), 7);
        assert_eq!(details.derive_status(), AggregateStatus::Partial);
    }

    #[test]
    fn test_summarize_all_sent() {
        let grouped = vec![
            (RecipientType::Club, NotificationStatus::Sent, 1),
            (RecipientType::Referee, NotificationStatus::Sent, 2),
        ];
        let details = summarize_legacy_rows(&grouped);
        assert_eq!(details.derive_status(), AggregateStatus::Sent);
        assert_eq!(details.total(), 3);
    }

    #[test]
    fn test_summarize_nothing_sent() {
        let grouped = vec![(RecipientType::Referee, NotificationStatus::Failed, 4)];
        let details = summarize_legacy_rows(&grouped);
        assert_eq!(details.derive_status(), AggregateStatus::Failed);
    }
}
