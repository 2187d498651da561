//! Background job scheduler and job implementations.

mod notification_cleanup;
mod notification_retry;
mod scheduler;

pub use notification_cleanup::NotificationCleanupJob;
pub use notification_retry::NotificationRetryJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
