//! `refman migrate-data` — chunked migration from a legacy source database.

use std::path::PathBuf;

use clap::Args;
use sqlx::PgPool;

use crate::config::Config;
use crate::services::data_migration::DEFAULT_CHUNK_SIZE;
use crate::services::{BackupWriter, DataMigrationHelper, MappingConfig, MigrationOptions};

use super::confirm;

#[derive(Args, Debug)]
pub struct MigrateDataArgs {
    /// Source database connection URL
    #[arg(long)]
    pub source: String,

    /// JSON field-mapping file (built-in defaults when omitted)
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Compute and report without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Dump the target tables to a snapshot before writing
    #[arg(long)]
    pub backup: bool,

    /// Source rows per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk: i64,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}

/// Number of error rows echoed to the console; the full list goes to the
/// report file.
const MAX_PRINTED_ERRORS: usize = 10;

pub async fn run(args: MigrateDataArgs, config: &Config, pool: PgPool) -> anyhow::Result<()> {
    let mapping = MappingConfig::load(args.mapping.as_deref())?;

    if !args.dry_run && !confirm("Migrate data from the source database?", args.force) {
        println!("Aborted.");
        return Ok(());
    }

    let source = persistence::db::connect_source(&args.source).await?;
    let helper = DataMigrationHelper::new(
        pool,
        source,
        BackupWriter::new(config.storage.backup_dir.clone()),
        BackupWriter::new(config.storage.report_dir.clone()),
    );

    let opts = MigrationOptions {
        dry_run: args.dry_run,
        chunk_size: args.chunk.max(1),
        backup: args.backup,
    };
    let (report, validation) = helper.migrate(&mapping, &opts).await?;

    if report.dry_run {
        println!("Dry-run migration summary:");
    } else {
        println!("Migration summary:");
    }
    println!("  total records:    {}", report.total_records);
    println!("  migrated:         {}", report.migrated_records);
    println!("  skipped:          {}", report.skipped_records);
    println!("  errors:           {}", report.error_records);

    let errors = report.first_errors(MAX_PRINTED_ERRORS);
    if !errors.is_empty() {
        println!("  first {} errors:", errors.len());
        for record in errors {
            println!(
                "    [{} #{}] {}",
                record.target_table,
                record.old_id,
                record.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    println!("Validation:");
    println!(
        "  users: {} total, {} valid email, {} with zone",
        validation.users_total, validation.users_with_valid_email, validation.users_with_zone
    );
    println!(
        "  clubs: {} total, {} with zone",
        validation.clubs_total, validation.clubs_with_zone
    );
    println!(
        "  tournaments: {} total, {} with club",
        validation.tournaments_total, validation.tournaments_with_club
    );

    Ok(())
}
