//! Migration and maintenance outcome models.
//!
//! Per-row migration outcomes are accumulated in memory and flushed to a
//! JSON log file at the end of a run; they are not first-class entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Phases of the legacy notification migration. The phases advance strictly
/// forward during a run; `RolledBack` is reachable only from `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyMigrationPhase {
    NotAnalyzed,
    Analyzed,
    BackedUp,
    Migrating,
    Validated,
    Done,
    RolledBack,
}

impl LegacyMigrationPhase {
    /// Whether the migrate step may start from this phase. A backup is
    /// mandatory before any mutation.
    pub fn can_migrate(&self) -> bool {
        matches!(self, Self::BackedUp)
    }

    /// Whether a rollback may start from this phase.
    pub fn can_rollback(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for LegacyMigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotAnalyzed => "not_analyzed",
            Self::Analyzed => "analyzed",
            Self::BackedUp => "backed_up",
            Self::Migrating => "migrating",
            Self::Validated => "validated",
            Self::Done => "done",
            Self::RolledBack => "rolled_back",
        };
        write!(f, "{}", name)
    }
}

/// Counts produced by the legacy migration analyze step.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LegacyAnalysis {
    /// Recipient rows without a tournament link (legacy schema).
    pub legacy_rows: i64,
    /// Aggregate rows already present in the new schema.
    pub aggregate_rows: i64,
    /// Tournaments with assignments but no aggregate record.
    pub ready_tournaments: i64,
    /// Recipient rows with no resolvable tournament.
    pub orphaned_rows: i64,
    /// Duplicate (tournament, email, type) groups.
    pub duplicate_groups: i64,
}

/// Outcome of the legacy migrate step.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LegacyMigrationSummary {
    pub linked_rows: i64,
    pub skipped_rows: i64,
    pub synthesized_aggregates: i64,
    pub dry_run: bool,
}

/// Non-fatal inconsistencies found by the legacy validate step.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ValidationReport {
    /// Recipient rows still lacking a tournament link.
    pub unlinked_rows: i64,
    /// Aggregates referencing a missing tournament.
    pub orphaned_aggregates: i64,
    /// Aggregates whose total does not match the linked row count.
    pub total_mismatches: i64,
}

impl ValidationReport {
    pub fn is_consistent(&self) -> bool {
        self.unlinked_rows == 0 && self.orphaned_aggregates == 0 && self.total_mismatches == 0
    }
}

/// Outcome of the independent repair pass. Each counter corresponds to one
/// idempotent sub-repair.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RepairReport {
    pub links_backfilled: u64,
    pub orphaned_aggregates_deleted: u64,
    pub totals_recomputed: u64,
    pub templates_backfilled: u64,
}

/// Outcome of the legacy rollback step.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RollbackReport {
    pub links_cleared: u64,
    pub aggregates_deleted: u64,
    pub dry_run: bool,
}

/// Outcome of a cleanup run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CleanupReport {
    pub recipient_rows_deleted: u64,
    pub aggregate_rows_deleted: u64,
    pub dry_run: bool,
}

impl CleanupReport {
    pub fn total_deleted(&self) -> u64 {
        self.recipient_rows_deleted + self.aggregate_rows_deleted
    }
}

/// Outcome of a retry batch.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RetryReport {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Read-only notification statistics over a trailing window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationStatsReport {
    pub window_days: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_recipient_type: BTreeMap<String, i64>,
    /// sent / (sent + failed + pending + cancelled), 0 when the window is empty.
    pub success_rate: f64,
    pub failures_last_24h: i64,
    pub pending_backlog: i64,
}

impl NotificationStatsReport {
    /// Computes the success rate from the by-status counters.
    pub fn compute_success_rate(by_status: &BTreeMap<String, i64>) -> f64 {
        let total: i64 = by_status.values().sum();
        if total == 0 {
            return 0.0;
        }
        let sent = by_status.get("sent").copied().unwrap_or(0);
        sent as f64 / total as f64
    }

    /// True when recent failures or a pending backlog need attention.
    pub fn has_warnings(&self) -> bool {
        self.failures_last_24h > 0 || self.pending_backlog > 0
    }
}

/// Per-row outcome of the generic data migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub old_id: i64,
    pub target_table: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MigrationRecord {
    pub fn success(old_id: i64, target_table: &str, new_data: serde_json::Value) -> Self {
        Self {
            old_id,
            target_table: target_table.to_string(),
            success: true,
            new_data: Some(new_data),
            error: None,
        }
    }

    pub fn failure(old_id: i64, target_table: &str, error: impl Into<String>) -> Self {
        Self {
            old_id,
            target_table: target_table.to_string(),
            success: false,
            new_data: None,
            error: Some(error.into()),
        }
    }

    /// A row that was left alone (already present in the target). Counted
    /// apart from errors: nothing went wrong.
    pub fn skipped(old_id: i64, target_table: &str, reason: impl Into<String>) -> Self {
        Self {
            old_id,
            target_table: target_table.to_string(),
            success: true,
            new_data: None,
            error: Some(reason.into()),
        }
    }
}

/// Accumulated outcome of a data migration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub total_records: u64,
    pub migrated_records: u64,
    pub skipped_records: u64,
    pub error_records: u64,
    pub dry_run: bool,
    pub log: Vec<MigrationRecord>,
}

impl MigrationReport {
    pub fn record_success(&mut self, record: MigrationRecord) {
        self.total_records += 1;
        self.migrated_records += 1;
        self.log.push(record);
    }

    pub fn record_skip(&mut self, record: MigrationRecord) {
        self.total_records += 1;
        self.skipped_records += 1;
        self.log.push(record);
    }

    pub fn record_error(&mut self, record: MigrationRecord) {
        self.total_records += 1;
        self.error_records += 1;
        self.log.push(record);
    }

    /// First `n` error messages, for the console summary.
    pub fn first_errors(&self, n: usize) -> Vec<&MigrationRecord> {
        self.log.iter().filter(|r| !r.success).take(n).collect()
    }
}

/// Informational post-migration counts; never enforced as a hard failure.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DataValidationReport {
    pub users_total: i64,
    pub users_with_valid_email: i64,
    pub users_with_zone: i64,
    pub clubs_total: i64,
    pub clubs_with_zone: i64,
    pub tournaments_total: i64,
    pub tournaments_with_club: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_gating() {
        assert!(LegacyMigrationPhase::BackedUp.can_migrate());
        assert!(!LegacyMigrationPhase::Analyzed.can_migrate());
        assert!(!LegacyMigrationPhase::NotAnalyzed.can_migrate());
        assert!(LegacyMigrationPhase::Done.can_rollback());
        assert!(!LegacyMigrationPhase::Migrating.can_rollback());
    }

    #[test]
    fn test_report_counters() {
        let mut report = MigrationReport::default();
        report.record_success(MigrationRecord::success(1, "users", serde_json::json!({})));
        report.record_error(MigrationRecord::failure(2, "users", "bad zone"));
        report.record_skip(MigrationRecord::failure(3, "users", "already migrated"));

        assert_eq!(report.total_records, 3);
        assert_eq!(report.migrated_records, 1);
        assert_eq!(report.error_records, 1);
        assert_eq!(report.skipped_records, 1);
    }

    #[test]
    fn test_first_errors_filters_successes() {
        let mut report = MigrationReport::default();
        for i in 0..5 {
            report.record_success(MigrationRecord::success(i, "clubs", serde_json::json!({})));
            report.record_error(MigrationRecord::failure(100 + i, "clubs", "boom"));
        }
        let errors = report.first_errors(3);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|r| !r.success));
    }

    #[test]
    fn test_success_rate() {
        let mut by_status = BTreeMap::new();
        by_status.insert("sent".to_string(), 8);
        by_status.insert("failed".to_string(), 1);
        by_status.insert("pending".to_string(), 1);
        let rate = NotificationStatsReport::compute_success_rate(&by_status);
        assert!((rate - 0.8).abs() < f64::EPSILON);

        assert_eq!(NotificationStatsReport::compute_success_rate(&BTreeMap::new()), 0.0);
    }

    #[test]
    fn test_validation_report_consistency() {
        assert!(ValidationReport::default().is_consistent());
        let report = ValidationReport { total_mismatches: 2, ..Default::default() };
        assert!(!report.is_consistent());
    }
}
