//! Common validation utilities.

use chrono::{DateTime, Duration, Utc};
use validator::{ValidateEmail, ValidationError};

/// Maximum length accepted for an email address.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Minimum retention period in days accepted by cleanup operations.
pub const MIN_RETENTION_DAYS: i64 = 1;

/// Returns true if the given string is a syntactically valid email address.
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= MAX_EMAIL_LENGTH && email.validate_email()
}

/// Validates that an email address is non-empty and syntactically valid.
pub fn validate_email_syntax(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        let mut err = ValidationError::new("email_syntax");
        err.message = Some("Recipient email is empty or not a valid address".into());
        Err(err)
    }
}

/// Validates that a retention period is at least one day.
pub fn validate_retention_days(days: i64) -> Result<(), ValidationError> {
    if days >= MIN_RETENTION_DAYS {
        Ok(())
    } else {
        let mut err = ValidationError::new("retention_days");
        err.message = Some("Retention period must be at least one day".into());
        Err(err)
    }
}

/// Computes the cutoff timestamp for a trailing window of whole days.
pub fn window_cutoff(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email_accepted() {
        assert!(is_valid_email("referee@federation.example"));
        assert!(validate_email_syntax("club.rome@golf.example").is_ok());
    }

    #[test]
    fn test_empty_email_rejected() {
        assert!(!is_valid_email(""));
        assert!(validate_email_syntax("").is_err());
    }

    #[test]
    fn test_malformed_email_rejected() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@domain@twice.example"));
    }

    #[test]
    fn test_overlong_email_rejected() {
        let local = "a".repeat(MAX_EMAIL_LENGTH);
        assert!(!is_valid_email(&format!("{}@x.example", local)));
    }

    #[test]
    fn test_retention_days_bounds() {
        assert!(validate_retention_days(1).is_ok());
        assert!(validate_retention_days(30).is_ok());
        assert!(validate_retention_days(0).is_err());
        assert!(validate_retention_days(-5).is_err());
    }

    #[test]
    fn test_window_cutoff() {
        let now = Utc::now();
        let cutoff = window_cutoff(now, 7);
        assert_eq!(now - cutoff, Duration::days(7));
    }
}
