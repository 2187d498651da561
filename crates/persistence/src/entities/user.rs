//! User entity definitions. Referees and committee admins share the table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User role enum matching the database enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRoleDb {
    #[default]
    Referee,
    Admin,
}

impl std::fmt::Display for UserRoleDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Referee => write!(f, "referee"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Database entity for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRoleDb,
    pub zone_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
