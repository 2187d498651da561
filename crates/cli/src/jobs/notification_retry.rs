//! Notification retry background job.
//!
//! Periodically re-dispatches recent failed notifications that are still
//! below the retry bound.

use std::sync::Arc;

use domain::services::MailSender;
use sqlx::PgPool;
use tracing::info;

use crate::services::MaintenanceService;

use super::scheduler::{Job, JobFrequency};

/// Background job to retry failed notification deliveries.
pub struct NotificationRetryJob {
    pool: PgPool,
    mailer: Arc<dyn MailSender>,
    batch_size: i64,
}

impl NotificationRetryJob {
    pub fn new(pool: PgPool, mailer: Arc<dyn MailSender>, batch_size: i64) -> Self {
        Self {
            pool,
            mailer,
            batch_size,
        }
    }
}

#[async_trait::async_trait]
impl Job for NotificationRetryJob {
    fn name(&self) -> &'static str {
        "notification_retry"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(15)
    }

    async fn execute(&self) -> Result<(), String> {
        let service = MaintenanceService::new(self.pool.clone());
        let report = service
            .retry_failed(self.mailer.as_ref(), self.batch_size)
            .await
            .map_err(|e| format!("Failed to process notification retries: {}", e))?;

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                succeeded = report.succeeded,
                failed = report.failed,
                "Processed notification retries"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_frequency() {
        let freq = JobFrequency::Minutes(15);
        assert_eq!(freq.interval().as_secs(), 900);
    }
}
