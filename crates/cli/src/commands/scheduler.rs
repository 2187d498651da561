//! `refman scheduler run` — the background maintenance loop.

use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;
use crate::jobs::{JobScheduler, NotificationCleanupJob, NotificationRetryJob};
use crate::services::EmailService;

#[derive(Subcommand, Debug)]
pub enum SchedulerCommand {
    /// Run the maintenance jobs until interrupted
    Run,
}

/// Grace period for jobs to finish after Ctrl-C.
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub async fn run(command: SchedulerCommand, config: &Config, pool: PgPool) -> anyhow::Result<()> {
    match command {
        SchedulerCommand::Run => {
            let mailer = Arc::new(EmailService::new(config.email.clone()));

            let mut scheduler = JobScheduler::new();
            scheduler.register(NotificationRetryJob::new(
                pool.clone(),
                mailer,
                config.notifications.retry_batch_size,
            ));
            scheduler.register(NotificationCleanupJob::new(
                pool,
                config.notifications.cleanup_retention_days,
            ));
            scheduler.start();

            info!("Scheduler running; press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;

            scheduler.shutdown();
            scheduler
                .wait_for_shutdown(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS))
                .await;
            Ok(())
        }
    }
}
