//! `refman notifications ...` — maintenance actions and the legacy
//! notification migration.

use clap::{Args, Subcommand};
use sqlx::PgPool;

use crate::config::Config;
use crate::services::{
    BackupWriter, EmailService, LegacyNotificationMigrator, MaintenanceService,
};

use super::confirm;

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    /// Maintenance operations over the notification tables
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceAction,
    },

    /// Reconcile legacy notification rows into the aggregate schema
    MigrateLegacy(MigrateLegacyArgs),
}

#[derive(Subcommand, Debug)]
pub enum MaintenanceAction {
    /// Delete terminal notifications older than the retention period
    Cleanup {
        /// Retention in days (defaults to the configured value)
        #[arg(long)]
        days: Option<i64>,

        /// Compute and report without deleting
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Retry recent failed notifications below the retry bound
    Retry {
        /// Rows per batch (defaults to the configured value)
        #[arg(long)]
        batch_size: Option<i64>,
    },

    /// Show notification statistics over a trailing window
    Stats {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Cancel failed notifications that exhausted their retries
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct MigrateLegacyArgs {
    /// Compute and report without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Only run the idempotent repair pass
    #[arg(long)]
    pub repair: bool,

    /// Undo the migration: unlink rows, delete aggregates
    #[arg(long)]
    pub rollback: bool,

    /// Skip confirmation prompts
    #[arg(long)]
    pub force: bool,
}

pub async fn run(
    command: NotificationsCommand,
    config: &Config,
    pool: PgPool,
) -> anyhow::Result<()> {
    match command {
        NotificationsCommand::Maintenance { action } => maintenance(action, config, pool).await,
        NotificationsCommand::MigrateLegacy(args) => migrate_legacy(args, config, pool).await,
    }
}

async fn maintenance(
    action: MaintenanceAction,
    config: &Config,
    pool: PgPool,
) -> anyhow::Result<()> {
    let service = MaintenanceService::new(pool);

    match action {
        MaintenanceAction::Cleanup { days, dry_run, force } => {
            let days = days.unwrap_or(config.notifications.cleanup_retention_days);
            shared::validation::validate_retention_days(days)
                .map_err(|e| anyhow::anyhow!("invalid --days: {}", e))?;

            if !dry_run
                && !confirm(
                    &format!("Delete terminal notifications older than {} days?", days),
                    force,
                )
            {
                println!("Aborted.");
                return Ok(());
            }

            let report = service.cleanup(days, dry_run).await?;
            if report.dry_run {
                println!("Dry-run: would delete {} recipient rows and {} aggregates", report.recipient_rows_deleted, report.aggregate_rows_deleted);
            } else {
                println!("Deleted {} recipient rows and {} aggregates", report.recipient_rows_deleted, report.aggregate_rows_deleted);
            }
        }

        MaintenanceAction::Retry { batch_size } => {
            let batch_size = batch_size.unwrap_or(config.notifications.retry_batch_size);
            let mailer = EmailService::new(config.email.clone());
            let report = service.retry_failed(&mailer, batch_size).await?;
            println!(
                "Retried {} notifications: {} succeeded, {} failed again",
                report.attempted, report.succeeded, report.failed
            );
        }

        MaintenanceAction::Stats { days } => {
            let stats = service.stats(days).await?;
            println!("Notification statistics (last {} days)", stats.window_days);
            println!("  by status:");
            for (status, count) in &stats.by_status {
                println!("    {:<10} {}", status, count);
            }
            println!("  by recipient type:");
            for (recipient_type, count) in &stats.by_recipient_type {
                println!("    {:<14} {}", recipient_type, count);
            }
            println!("  success rate: {:.1}%", stats.success_rate * 100.0);
            if stats.has_warnings() {
                println!(
                    "  attention: {} failures in the last 24h, {} pending",
                    stats.failures_last_24h, stats.pending_backlog
                );
            }
        }

        MaintenanceAction::Reset { force } => {
            if !confirm("Cancel all exhausted failed notifications?", force) {
                println!("Aborted.");
                return Ok(());
            }
            let resolved = service.reset_exhausted().await?;
            println!("Cancelled {} exhausted notifications", resolved);
        }
    }
    Ok(())
}

async fn migrate_legacy(
    args: MigrateLegacyArgs,
    config: &Config,
    pool: PgPool,
) -> anyhow::Result<()> {
    let backups = BackupWriter::new(config.storage.backup_dir.clone());
    let mut migrator = LegacyNotificationMigrator::new(pool, backups);

    if args.repair {
        let report = migrator.repair().await?;
        println!(
            "Repair: {} links backfilled, {} orphaned aggregates deleted, {} totals recomputed, {} template markers backfilled",
            report.links_backfilled,
            report.orphaned_aggregates_deleted,
            report.totals_recomputed,
            report.templates_backfilled
        );
        let validation = migrator.validate().await?;
        print_validation(&validation);
        return Ok(());
    }

    if args.rollback {
        let report = migrator.rollback(true).await?;
        println!(
            "Rollback would clear {} tournament links and delete {} aggregates",
            report.links_cleared, report.aggregates_deleted
        );
        if args.dry_run {
            return Ok(());
        }
        if !confirm(
            "Roll back the legacy migration? This is irreversible without the backup snapshot.",
            args.force,
        ) {
            println!("Aborted.");
            return Ok(());
        }
        let report = migrator.rollback(false).await?;
        println!(
            "Rolled back: {} links cleared, {} aggregates deleted",
            report.links_cleared, report.aggregates_deleted
        );
        return Ok(());
    }

    let analysis = migrator.analyze().await?;
    println!("Legacy notification analysis:");
    println!("  legacy rows (no tournament link): {}", analysis.legacy_rows);
    println!("  existing aggregates:              {}", analysis.aggregate_rows);
    println!("  tournaments ready for synthesis:  {}", analysis.ready_tournaments);
    println!("  orphaned rows:                    {}", analysis.orphaned_rows);
    println!("  duplicate groups:                 {}", analysis.duplicate_groups);

    if args.dry_run {
        let summary = migrator.migrate(true).await?;
        let cleanup = migrator.cleanup_inconsistent(true).await?;
        println!(
            "Dry-run: would link {} rows ({} unresolvable), synthesize {} aggregates, delete {} orphans and {} duplicates",
            summary.linked_rows,
            summary.skipped_rows,
            summary.synthesized_aggregates,
            cleanup.orphans_deleted,
            cleanup.duplicates_deleted
        );
        return Ok(());
    }

    if !confirm("Migrate legacy notifications now?", args.force) {
        println!("Aborted.");
        return Ok(());
    }

    let manifest = migrator.backup().await?;
    println!(
        "Backup written to {} ({} rows)",
        manifest.path.display(),
        manifest.total_rows()
    );

    let summary = migrator.migrate(false).await?;
    println!(
        "Migrated: {} rows linked, {} skipped, {} aggregates synthesized",
        summary.linked_rows, summary.skipped_rows, summary.synthesized_aggregates
    );

    let cleanup = migrator.cleanup_inconsistent(false).await?;
    println!(
        "Cleanup: {} orphans deleted, {} duplicates deleted",
        cleanup.orphans_deleted, cleanup.duplicates_deleted
    );

    let validation = migrator.validate().await?;
    print_validation(&validation);
    Ok(())
}

fn print_validation(validation: &domain::models::ValidationReport) {
    if validation.is_consistent() {
        println!("Validation: consistent");
    } else {
        println!(
            "Validation warnings: {} unlinked rows, {} orphaned aggregates, {} total mismatches",
            validation.unlinked_rows, validation.orphaned_aggregates, validation.total_mismatches
        );
    }
}
