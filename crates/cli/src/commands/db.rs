//! `refman db ...` — database administration.

use clap::Subcommand;
use sqlx::PgPool;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Apply pending schema migrations
    Migrate,
}

pub async fn run(command: DbCommand, pool: PgPool) -> anyhow::Result<()> {
    match command {
        DbCommand::Migrate => {
            info!("Running database migrations");
            sqlx::migrate!("../persistence/src/migrations")
                .run(&pool)
                .await?;
            info!("Migrations completed");
            Ok(())
        }
    }
}
