//! Backup snapshot and report files.
//!
//! Snapshots are timestamped JSON files: serialized rows per section plus
//! metadata (counts, timestamp, label). The legacy migrator's rollback
//! story depends on these files existing before any mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where a snapshot landed and what it contains.
#[derive(Debug, Clone, Serialize)]
pub struct BackupManifest {
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub counts: BTreeMap<String, usize>,
}

impl BackupManifest {
    pub fn total_rows(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Writes timestamped snapshot and report files under a base directory.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
}

impl BackupWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a snapshot of serialized rows, one section per table.
    pub fn write_snapshot(
        &self,
        label: &str,
        sections: BTreeMap<String, Vec<serde_json::Value>>,
    ) -> Result<BackupManifest, BackupError> {
        fs::create_dir_all(&self.dir)?;

        let created_at = Utc::now();
        let counts: BTreeMap<String, usize> = sections
            .iter()
            .map(|(name, rows)| (name.clone(), rows.len()))
            .collect();

        let path = self.dir.join(format!(
            "{}_{}.json",
            label,
            created_at.format("%Y%m%d_%H%M%S")
        ));

        let document = serde_json::json!({
            "metadata": {
                "label": label,
                "created_at": created_at,
                "counts": counts,
            },
            "tables": sections,
        });
        fs::write(&path, serde_json::to_vec_pretty(&document)?)?;

        info!(path = %path.display(), rows = counts.values().sum::<usize>(), "Backup snapshot written");

        Ok(BackupManifest {
            path,
            created_at,
            counts,
        })
    }

    /// Writes a machine-readable report (migration logs, summaries).
    pub fn write_report<T: Serialize>(
        &self,
        label: &str,
        report: &T,
    ) -> Result<PathBuf, BackupError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "{}_{}.json",
            label,
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        fs::write(&path, serde_json::to_vec_pretty(report)?)?;
        info!(path = %path.display(), "Report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_writer(tag: &str) -> BackupWriter {
        let dir = std::env::temp_dir().join(format!("refman_backup_test_{}_{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        BackupWriter::new(dir)
    }

    #[test]
    fn test_snapshot_written_with_counts() {
        let writer = temp_writer("snapshot");
        let mut sections = BTreeMap::new();
        sections.insert(
            "recipient_notifications".to_string(),
            vec![serde_json::json!({"id": 1}), serde_json::json!({"id": 2})],
        );
        sections.insert("tournament_notifications".to_string(), Vec::new());

        let manifest = writer.write_snapshot("legacy_notifications", sections).unwrap();
        assert_eq!(manifest.total_rows(), 2);
        assert_eq!(manifest.counts["recipient_notifications"], 2);
        assert!(manifest.path.exists());

        let raw = fs::read_to_string(&manifest.path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["metadata"]["label"], "legacy_notifications");
        assert_eq!(parsed["tables"]["recipient_notifications"][1]["id"], 2);

        let _ = fs::remove_dir_all(writer.dir());
    }

    #[test]
    fn test_report_written() {
        let writer = temp_writer("report");
        let path = writer
            .write_report("migration_log", &serde_json::json!({"errors": 0}))
            .unwrap();
        assert!(path.exists());
        let _ = fs::remove_dir_all(writer.dir());
    }
}
