//! Notification maintenance engine.
//!
//! Four independent operations, each idempotent and safe to run repeatedly:
//! age-based cleanup, bounded retry of recent failures, read-only
//! statistics, and resolution of exhausted failures to cancelled.

use domain::models::{
    CleanupReport, NotificationStatsReport, RetryReport, MAX_RETRY_ATTEMPTS,
};
use domain::models::notification::RETRY_WINDOW_DAYS;
use domain::services::MailSender;
use persistence::repositories::{
    RecipientNotificationRepository, TournamentNotificationRepository,
};
use sqlx::PgPool;
use tracing::info;

use super::dispatch::RecipientDispatcher;

/// Maintenance operations over the notification tables.
pub struct MaintenanceService {
    recipients: RecipientNotificationRepository,
    aggregates: TournamentNotificationRepository,
    dispatcher: RecipientDispatcher,
}

impl MaintenanceService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            recipients: RecipientNotificationRepository::new(pool.clone()),
            aggregates: TournamentNotificationRepository::new(pool.clone()),
            dispatcher: RecipientDispatcher::new(pool),
        }
    }

    /// Deletes terminal notifications older than the retention period.
    /// With `dry_run` the counts are computed but nothing is deleted.
    pub async fn cleanup(&self, retention_days: i64, dry_run: bool) -> Result<CleanupReport, sqlx::Error> {
        let report = if dry_run {
            CleanupReport {
                recipient_rows_deleted: self
                    .recipients
                    .count_cleanup_candidates(retention_days)
                    .await? as u64,
                aggregate_rows_deleted: self.aggregates.count_older_than(retention_days).await?
                    as u64,
                dry_run: true,
            }
        } else {
            CleanupReport {
                recipient_rows_deleted: self
                    .recipients
                    .delete_cleanup_candidates(retention_days)
                    .await?,
                aggregate_rows_deleted: self.aggregates.delete_older_than(retention_days).await?,
                dry_run: false,
            }
        };

        info!(
            retention_days,
            recipient_rows = report.recipient_rows_deleted,
            aggregate_rows = report.aggregate_rows_deleted,
            dry_run = report.dry_run,
            "Notification cleanup"
        );
        Ok(report)
    }

    /// Retries failed notifications still inside the retry window and
    /// below the retry bound. Renewed failures increment the counter.
    pub async fn retry_failed(
        &self,
        mailer: &dyn MailSender,
        batch_size: i64,
    ) -> Result<RetryReport, sqlx::Error> {
        let rows = self
            .recipients
            .find_failed_retryable(RETRY_WINDOW_DAYS, MAX_RETRY_ATTEMPTS, batch_size)
            .await?;

        let mut report = RetryReport::default();
        for row in &rows {
            report.attempted += 1;
            if self.dispatcher.redeliver(mailer, row).await.is_sent() {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                succeeded = report.succeeded,
                failed = report.failed,
                "Notification retry batch processed"
            );
        }
        Ok(report)
    }

    /// Read-only statistics over a trailing window.
    pub async fn stats(&self, window_days: i64) -> Result<NotificationStatsReport, sqlx::Error> {
        let by_status = self
            .recipients
            .count_by_status(window_days)
            .await?
            .into_iter()
            .map(|(status, count)| (status.to_string(), count))
            .collect();
        let by_recipient_type = self
            .recipients
            .count_by_recipient_type(window_days)
            .await?
            .into_iter()
            .map(|(recipient_type, count)| (recipient_type.to_string(), count))
            .collect();

        let success_rate = NotificationStatsReport::compute_success_rate(&by_status);

        Ok(NotificationStatsReport {
            window_days,
            by_status,
            by_recipient_type,
            success_rate,
            failures_last_24h: self.recipients.count_recent_failures().await?,
            pending_backlog: self.recipients.count_pending().await?,
        })
    }

    /// Resolves exhausted failures (retry counter at the bound) to
    /// cancelled. This is the only path out for permanently failed rows.
    pub async fn reset_exhausted(&self) -> Result<u64, sqlx::Error> {
        let resolved = self.recipients.reset_exhausted(MAX_RETRY_ATTEMPTS).await?;
        if resolved > 0 {
            info!(resolved, "Exhausted notifications cancelled");
        }
        Ok(resolved)
    }
}
