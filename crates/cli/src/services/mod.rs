//! Notification and migration services.

pub mod aggregator;
pub mod backup;
pub mod data_migration;
pub mod dispatch;
pub mod email;
pub mod legacy_migration;
pub mod maintenance;
pub mod mapping;

pub use aggregator::{NotifyError, SendOptions, TournamentNotifier};
pub use backup::{BackupManifest, BackupWriter};
pub use data_migration::{DataMigrationHelper, MigrationError, MigrationOptions};
pub use dispatch::{DispatchRequest, RecipientDispatcher};
pub use email::{EmailError, EmailService};
pub use legacy_migration::{LegacyMigrationError, LegacyNotificationMigrator};
pub use maintenance::MaintenanceService;
pub use mapping::MappingConfig;
