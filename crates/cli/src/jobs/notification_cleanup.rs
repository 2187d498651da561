//! Notification cleanup background job.
//!
//! Deletes terminal notification rows past the retention period, and
//! resolves exhausted failures to cancelled on the way.

use sqlx::PgPool;
use tracing::info;

use crate::services::MaintenanceService;

use super::scheduler::{Job, JobFrequency};

/// Background job to clean up old notification records.
pub struct NotificationCleanupJob {
    pool: PgPool,
    retention_days: i64,
}

impl NotificationCleanupJob {
    pub fn new(pool: PgPool, retention_days: i64) -> Self {
        Self {
            pool,
            retention_days,
        }
    }
}

#[async_trait::async_trait]
impl Job for NotificationCleanupJob {
    fn name(&self) -> &'static str {
        "notification_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        let service = MaintenanceService::new(self.pool.clone());

        let cancelled = service
            .reset_exhausted()
            .await
            .map_err(|e| format!("Failed to reset exhausted notifications: {}", e))?;

        let report = service
            .cleanup(self.retention_days, false)
            .await
            .map_err(|e| format!("Failed to clean up notifications: {}", e))?;

        info!(
            cancelled,
            recipient_rows = report.recipient_rows_deleted,
            aggregate_rows = report.aggregate_rows_deleted,
            retention_days = self.retention_days,
            "Cleaned up old notifications"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_frequency_is_daily() {
        assert_eq!(JobFrequency::Daily.interval().as_secs(), 86_400);
    }
}
