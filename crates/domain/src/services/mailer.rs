//! Mail-sending abstraction.
//!
//! The core never talks to a transport directly; it sends through
//! [`MailSender`], which any SMTP/API-backed implementation can satisfy.
//! [`MockMailSender`] is the development and test implementation.

use std::collections::HashSet;
use std::sync::Mutex;

/// A file attached to an outgoing email.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// An email ready for transport.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
    pub attachments: Vec<EmailAttachment>,
}

/// Result of a send attempt. Failures are values: the caller records the
/// outcome and decides about retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailOutcome {
    Sent,
    Failed(String),
}

impl MailOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Mail transport trait. Implementations must not panic on transport
/// errors; they report them through [`MailOutcome::Failed`].
#[async_trait::async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: OutgoingEmail) -> MailOutcome;
}

/// Mock mail sender for development and testing.
///
/// Records every accepted message and can be configured to fail for all or
/// for specific addresses.
#[derive(Debug, Default)]
pub struct MockMailSender {
    fail_all: bool,
    failing_recipients: HashSet<String>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MockMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender that fails every message.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// A sender that fails only for the given addresses.
    pub fn failing_for<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_recipients: addresses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Messages accepted so far.
    pub fn sent_messages(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mock mailer lock").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mock mailer lock").len()
    }
}

#[async_trait::async_trait]
impl MailSender for MockMailSender {
    async fn send(&self, message: OutgoingEmail) -> MailOutcome {
        if self.fail_all || self.failing_recipients.contains(&message.to) {
            tracing::warn!(
                to = %message.to,
                subject = %message.subject,
                "Mock mailer simulating delivery failure"
            );
            return MailOutcome::Failed("Simulated delivery failure".to_string());
        }

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            attachments = message.attachments.len(),
            "Mock mailer accepted message"
        );
        self.sent.lock().expect("mock mailer lock").push(message);
        MailOutcome::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> OutgoingEmail {
        OutgoingEmail {
            to: to.to_string(),
            to_name: None,
            subject: "Convocation".to_string(),
            body_text: "body".to_string(),
            body_html: None,
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_accepts_and_records() {
        let mailer = MockMailSender::new();
        let outcome = mailer.send(message("referee@golf.example")).await;
        assert!(outcome.is_sent());
        assert_eq!(mailer.sent_count(), 1);
        assert_eq!(mailer.sent_messages()[0].to, "referee@golf.example");
    }

    #[tokio::test]
    async fn test_mock_fail_all() {
        let mailer = MockMailSender::failing();
        let outcome = mailer.send(message("a@b.example")).await;
        assert_eq!(outcome, MailOutcome::Failed("Simulated delivery failure".to_string()));
        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_fails_selectively() {
        let mailer = MockMailSender::failing_for(["bad@b.example"]);
        assert!(!mailer.send(message("bad@b.example")).await.is_sent());
        assert!(mailer.send(message("good@b.example")).await.is_sent());
        assert_eq!(mailer.sent_count(), 1);
    }
}
