//! Domain models for Referee Manager.

pub mod migration;
pub mod notification;

pub use migration::{
    CleanupReport, DataValidationReport, LegacyAnalysis, LegacyMigrationPhase,
    LegacyMigrationSummary, MigrationRecord, MigrationReport, NotificationStatsReport,
    RepairReport, RetryReport, RollbackReport, ValidationReport,
};
pub use notification::{
    AggregateStatus, CategoryCounts, DispatchOutcome, NotificationDetails, NotificationStatus,
    NotificationSummary, RecipientType, DEFAULT_RETENTION_DAYS, MAX_RETRY_ATTEMPTS,
    RESEND_COOLDOWN_MINUTES, RETRY_WINDOW_DAYS,
};
