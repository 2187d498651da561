//! Database and notification metrics collection.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record database query duration.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Count a recipient dispatch outcome.
pub fn record_dispatch(recipient_type: &str, sent: bool) {
    counter!(
        "notifications_dispatched_total",
        "recipient_type" => recipient_type.to_string(),
        "outcome" => if sent { "sent" } else { "failed" }
    )
    .increment(1);
}

/// Count rows processed by a data migration run.
pub fn record_migrated_rows(target_table: &str, success: bool, rows: u64) {
    counter!(
        "migration_rows_total",
        "table" => target_table.to_string(),
        "outcome" => if success { "migrated" } else { "error" }
    )
    .increment(rows);
}

/// A helper to time database operations and record metrics.
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    /// Create a new timer for the given query name.
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.query_name, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_creation() {
        let timer = QueryTimer::new("find_tournament");
        assert_eq!(timer.query_name, "find_tournament");
    }
}
