//! Field-mapping configuration for the data migration.
//!
//! A mapping is a per-source-table map of source column → either a target
//! column name (plain copy with scalar normalization) or a semantic key
//! (`zone_mapping`, `club_mapping`, `status_mapping`, ...) that routes the
//! value through a lookup/normalization function. Unknown target columns
//! and unknown tables are rejected when the mapping is loaded, not when
//! rows start flowing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Source tables in dependency order: entities that only need zones first,
/// then tournaments, then relational rows.
pub const SOURCE_ORDER: [&str; 5] = [
    "old_users",
    "old_clubs",
    "old_tournaments",
    "old_assignments",
    "old_availabilities",
];

/// Semantic mapping keys that trigger lookup/normalization functions.
pub const SEMANTIC_KEYS: [&str; 9] = [
    "email",
    "phone",
    "zone_mapping",
    "club_mapping",
    "user_mapping",
    "tournament_mapping",
    "type_mapping",
    "status_mapping",
    "role_mapping",
];

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse mapping file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown target table '{0}'")]
    UnknownTargetTable(String),

    #[error("Table '{table}' maps to unknown target column '{column}'")]
    UnknownTargetColumn { table: String, column: String },

    #[error("Table '{0}' has no 'id' mapping")]
    MissingId(String),
}

/// Mapping for one source table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableMapping {
    /// Target table the rows land in.
    pub target: String,
    /// source column → target column or semantic key.
    pub columns: BTreeMap<String, String>,
}

/// The full mapping: one entry per source table.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    pub tables: BTreeMap<String, TableMapping>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        let mut tables = BTreeMap::new();

        tables.insert(
            "old_users".to_string(),
            TableMapping {
                target: "users".to_string(),
                columns: columns(&[
                    ("id", "id"),
                    ("name", "name"),
                    ("email", "email"),
                    ("phone", "phone"),
                    ("zone", "zone_mapping"),
                    ("role", "role_mapping"),
                    ("created_at", "created_at"),
                ]),
            },
        );
        tables.insert(
            "old_clubs".to_string(),
            TableMapping {
                target: "clubs".to_string(),
                columns: columns(&[
                    ("id", "id"),
                    ("code", "code"),
                    ("name", "name"),
                    ("email", "email"),
                    ("phone", "phone"),
                    ("zone", "zone_mapping"),
                    ("created_at", "created_at"),
                ]),
            },
        );
        tables.insert(
            "old_tournaments".to_string(),
            TableMapping {
                target: "tournaments".to_string(),
                columns: columns(&[
                    ("id", "id"),
                    ("name", "name"),
                    ("club", "club_mapping"),
                    ("zone", "zone_mapping"),
                    ("type", "type_mapping"),
                    ("start_date", "start_date"),
                    ("end_date", "end_date"),
                    ("created_at", "created_at"),
                ]),
            },
        );
        tables.insert(
            "old_assignments".to_string(),
            TableMapping {
                target: "assignments".to_string(),
                columns: columns(&[
                    ("id", "id"),
                    ("tournament", "tournament_mapping"),
                    ("user", "user_mapping"),
                    ("role", "role"),
                    ("confirmed", "status_mapping"),
                    ("created_at", "created_at"),
                ]),
            },
        );
        tables.insert(
            "old_availabilities".to_string(),
            TableMapping {
                target: "availabilities".to_string(),
                columns: columns(&[
                    ("id", "id"),
                    ("tournament", "tournament_mapping"),
                    ("user", "user_mapping"),
                    ("created_at", "created_at"),
                ]),
            },
        );

        Self { tables }
    }
}

fn columns(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Plain-copy columns each target table accepts.
fn allowed_columns(target: &str) -> Option<&'static [&'static str]> {
    match target {
        "users" => Some(&["id", "name", "created_at"]),
        "clubs" => Some(&["id", "code", "name", "created_at"]),
        "tournaments" => Some(&["id", "name", "start_date", "end_date", "created_at"]),
        "assignments" => Some(&["id", "role", "created_at"]),
        "availabilities" => Some(&["id", "created_at"]),
        _ => None,
    }
}

impl MappingConfig {
    /// Loads a mapping from a JSON file and validates it.
    pub fn from_file(path: &Path) -> Result<Self, MappingError> {
        let raw = fs::read_to_string(path)?;
        let mapping: Self = serde_json::from_str(&raw)?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Loads the mapping file when given, the built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, MappingError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Rejects unknown target tables/columns and mappings without an id.
    pub fn validate(&self) -> Result<(), MappingError> {
        for (table, mapping) in &self.tables {
            let allowed = allowed_columns(&mapping.target)
                .ok_or_else(|| MappingError::UnknownTargetTable(mapping.target.clone()))?;

            if !mapping.columns.values().any(|v| v == "id") {
                return Err(MappingError::MissingId(table.clone()));
            }

            for value in mapping.columns.values() {
                if SEMANTIC_KEYS.contains(&value.as_str()) {
                    continue;
                }
                if !allowed.contains(&value.as_str()) {
                    return Err(MappingError::UnknownTargetColumn {
                        table: table.clone(),
                        column: value.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Source tables present in this mapping, in dependency order. Tables
    /// outside the known order are appended last so a custom mapping can
    /// still opt into them.
    pub fn ordered_sources(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = SOURCE_ORDER
            .iter()
            .copied()
            .filter(|name| self.tables.contains_key(*name))
            .collect();
        for name in self.tables.keys() {
            if !SOURCE_ORDER.contains(&name.as_str()) {
                ordered.push(name);
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let mapping = MappingConfig::default();
        assert!(mapping.validate().is_ok());
        assert_eq!(mapping.tables.len(), 5);
    }

    #[test]
    fn test_ordered_sources_follow_dependency_order() {
        let mapping = MappingConfig::default();
        assert_eq!(
            mapping.ordered_sources(),
            vec![
                "old_users",
                "old_clubs",
                "old_tournaments",
                "old_assignments",
                "old_availabilities"
            ]
        );
    }

    #[test]
    fn test_unknown_target_table_rejected() {
        let mut mapping = MappingConfig::default();
        mapping.tables.insert(
            "old_scores".to_string(),
            TableMapping {
                target: "scores".to_string(),
                columns: columns(&[("id", "id")]),
            },
        );
        assert!(matches!(
            mapping.validate(),
            Err(MappingError::UnknownTargetTable(t)) if t == "scores"
        ));
    }

    #[test]
    fn test_unknown_target_column_rejected() {
        let mut mapping = MappingConfig::default();
        mapping
            .tables
            .get_mut("old_users")
            .unwrap()
            .columns
            .insert("shoe_size".to_string(), "shoe_size".to_string());
        assert!(matches!(
            mapping.validate(),
            Err(MappingError::UnknownTargetColumn { .. })
        ));
    }

    #[test]
    fn test_missing_id_rejected() {
        let mut mapping = MappingConfig::default();
        mapping
            .tables
            .get_mut("old_availabilities")
            .unwrap()
            .columns
            .remove("id");
        assert!(matches!(mapping.validate(), Err(MappingError::MissingId(_))));
    }

    #[test]
    fn test_from_file_round_trip() {
        let path = std::env::temp_dir().join(format!("refman_mapping_{}.json", std::process::id()));
        let raw = r#"{
            "tables": {
                "old_users": {
                    "target": "users",
                    "columns": {
                        "id": "id",
                        "full_name": "name",
                        "mail": "email",
                        "district": "zone_mapping"
                    }
                }
            }
        }"#;
        fs::write(&path, raw).unwrap();
        let mapping = MappingConfig::from_file(&path).unwrap();
        assert_eq!(mapping.tables["old_users"].columns["mail"], "email");
        let _ = fs::remove_file(&path);
    }
}
