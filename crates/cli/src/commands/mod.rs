//! Command-line surface.
//!
//! Thin clap layer over the services: argument parsing, confirmation
//! prompts, and console summaries. Unknown actions never fall through
//! silently; the subcommand tree is a closed enum.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};

use crate::config::Config;

pub mod db;
pub mod migrate_data;
pub mod notifications;
pub mod scheduler;
pub mod tournaments;

#[derive(Parser, Debug)]
#[command(name = "refman", version, about = "Referee Manager administration CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Notification maintenance and legacy reconciliation
    Notifications {
        #[command(subcommand)]
        command: notifications::NotificationsCommand,
    },

    /// Tournament notification operations
    Tournaments {
        #[command(subcommand)]
        command: tournaments::TournamentsCommand,
    },

    /// Chunked data migration from a legacy source database
    MigrateData(migrate_data::MigrateDataArgs),

    /// Background maintenance scheduler
    Scheduler {
        #[command(subcommand)]
        command: scheduler::SchedulerCommand,
    },

    /// Database administration
    Db {
        #[command(subcommand)]
        command: db::DbCommand,
    },
}

/// Connects the pool and dispatches to the command handlers.
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let pool = persistence::db::create_pool(&config.database).await?;

    match cli.command {
        Commands::Notifications { command } => notifications::run(command, &config, pool).await,
        Commands::Tournaments { command } => tournaments::run(command, &config, pool).await,
        Commands::MigrateData(args) => migrate_data::run(args, &config, pool).await,
        Commands::Scheduler { command } => scheduler::run(command, &config, pool).await,
        Commands::Db { command } => db::run(command, pool).await,
    }
}

/// Interactive yes/no gate for destructive operations. `force` skips the
/// prompt; anything but an explicit yes aborts.
pub(crate) fn confirm(prompt: &str, force: bool) -> bool {
    if force {
        return true;
    }
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
