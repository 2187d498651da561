//! Application configuration.

use persistence::db::DatabaseConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Email service configuration for the convocation letters.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Whether email sending is enabled.
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: smtp, sendgrid, or console (for development).
    #[serde(default = "default_email_provider")]
    pub provider: String,

    /// SMTP server host (for smtp provider).
    #[serde(default)]
    pub smtp_host: String,

    /// SMTP server port (for smtp provider).
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SendGrid API key (for sendgrid provider).
    #[serde(default)]
    pub sendgrid_api_key: String,

    /// Sender address stamped on outgoing letters.
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender display name.
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            sendgrid_api_key: String::new(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

/// Maintenance engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Days terminal notifications are retained before cleanup.
    #[serde(default = "default_cleanup_retention_days")]
    pub cleanup_retention_days: i64,

    /// Rows processed per retry batch.
    #[serde(default = "default_retry_batch_size")]
    pub retry_batch_size: i64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            cleanup_retention_days: default_cleanup_retention_days(),
            retry_batch_size: default_retry_batch_size(),
        }
    }
}

/// Locations for backup snapshots and migration reports.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,

    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            report_dir: default_report_dir(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_email_provider() -> String {
    "console".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_sender_email() -> String {
    "noreply@referee-manager.example".to_string()
}
fn default_sender_name() -> String {
    "Referee Manager".to_string()
}
fn default_cleanup_retention_days() -> i64 {
    30
}
fn default_retry_batch_size() -> i64 {
    50
}
fn default_backup_dir() -> String {
    "backups".to_string()
}
fn default_report_dir() -> String {
    "reports".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with RM__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("RM").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.database.url.is_empty() {
            return Err(config::ConfigError::Message(
                "database.url must be set".to_string(),
            ));
        }
        if self.notifications.cleanup_retention_days < 1 {
            return Err(config::ConfigError::Message(
                "notifications.cleanup_retention_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration for testing, entirely from embedded defaults plus
    /// overrides, without touching the file system.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [database]
            url = "postgres://localhost/refman_test"

            [logging]
            level = "debug"
            format = "pretty"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = Config::load_for_test(&[]).unwrap();
        assert_eq!(config.email.provider, "console");
        assert!(!config.email.enabled);
        assert_eq!(config.notifications.cleanup_retention_days, 30);
        assert_eq!(config.notifications.retry_batch_size, 50);
        assert_eq!(config.storage.backup_dir, "backups");
    }

    #[test]
    fn test_override_wins() {
        let config = Config::load_for_test(&[
            ("notifications.cleanup_retention_days", "14"),
            ("email.provider", "sendgrid"),
        ])
        .unwrap();
        assert_eq!(config.notifications.cleanup_retention_days, 14);
        assert_eq!(config.email.provider, "sendgrid");
    }

    #[test]
    fn test_invalid_retention_rejected() {
        let result = Config::load_for_test(&[("notifications.cleanup_retention_days", "0")]);
        assert!(result.is_err());
    }
}
