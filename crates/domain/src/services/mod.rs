//! Domain services for Referee Manager.
//!
//! Services contain business logic that operates on domain models.

pub mod mailer;
pub mod templates;

pub use mailer::{EmailAttachment, MailOutcome, MailSender, MockMailSender, OutgoingEmail};
pub use templates::{render, template_for, LetterTemplate, RenderedLetter, TemplateError};
