//! Recipient dispatcher.
//!
//! Sends a single notification to one recipient and records the outcome on
//! a recipient_notifications row. The dispatcher never retries and never
//! lets a transport, render, or bookkeeping error escape as `Err`: every
//! failure becomes a `Failed` outcome so one recipient cannot abort the
//! surrounding batch. Retry policy belongs to the callers.

use std::collections::BTreeMap;

use domain::models::{DispatchOutcome, RecipientType};
use domain::services::{templates, EmailAttachment, MailSender, OutgoingEmail};
use persistence::entities::RecipientNotificationEntity;
use persistence::metrics::record_dispatch;
use persistence::repositories::{
    CreateRecipientNotificationInput, RecipientNotificationRepository,
};
use shared::validation::validate_email_syntax;
use sqlx::PgPool;
use tracing::{error, warn};

/// One dispatch: recipient identity plus the template variables and
/// attachments for the letter.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub tournament_id: Option<i64>,
    pub assignment_id: Option<i64>,
    pub recipient_type: RecipientType,
    pub recipient_email: String,
    pub recipient_name: Option<String>,
    pub variables: BTreeMap<&'static str, String>,
    pub attachments: Vec<EmailAttachment>,
}

/// Dispatches single notifications and records their outcomes.
#[derive(Debug, Clone)]
pub struct RecipientDispatcher {
    repo: RecipientNotificationRepository,
}

impl RecipientDispatcher {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: RecipientNotificationRepository::new(pool),
        }
    }

    /// Renders the letter, persists a pending row, performs exactly one
    /// send attempt, and records the result.
    pub async fn dispatch(
        &self,
        mailer: &dyn MailSender,
        request: DispatchRequest,
    ) -> DispatchOutcome {
        let template = templates::template_for(request.recipient_type);
        let letter = match templates::render(template, &request.variables) {
            Ok(letter) => letter,
            Err(e) => {
                let outcome = DispatchOutcome::failed(e.to_string());
                self.record_unsendable(&request, template.name, &e.to_string())
                    .await;
                record_dispatch(&request.recipient_type.to_string(), false);
                return outcome;
            }
        };

        let attachment_refs: Vec<String> = request
            .attachments
            .iter()
            .map(|a| a.filename.clone())
            .collect();

        let row = match self
            .repo
            .create(CreateRecipientNotificationInput {
                tournament_id: request.tournament_id,
                assignment_id: request.assignment_id,
                recipient_type: request.recipient_type,
                recipient_email: request.recipient_email.clone(),
                subject: letter.subject.clone(),
                body: letter.body.clone(),
                attachments: attachment_refs,
            })
            .await
        {
            Ok(row) => row,
            Err(e) => {
                error!(error = %e, "Failed to persist notification row");
                record_dispatch(&request.recipient_type.to_string(), false);
                return DispatchOutcome::failed(format!("bookkeeping error: {}", e));
            }
        };

        if let Err(e) = validate_email_syntax(&request.recipient_email) {
            let reason = e
                .message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid email".to_string());
            return self.finish(row.id, request.recipient_type, Err(reason)).await;
        }

        let outcome = mailer
            .send(OutgoingEmail {
                to: request.recipient_email,
                to_name: request.recipient_name,
                subject: letter.subject,
                body_text: letter.body,
                body_html: None,
                attachments: request.attachments,
            })
            .await;

        match outcome {
            domain::services::MailOutcome::Sent => {
                self.finish(row.id, request.recipient_type, Ok(())).await
            }
            domain::services::MailOutcome::Failed(reason) => {
                self.finish(row.id, request.recipient_type, Err(reason)).await
            }
        }
    }

    /// Re-delivers an existing failed row using its stored subject and
    /// body. Used by the maintenance retry loop.
    pub async fn redeliver(
        &self,
        mailer: &dyn MailSender,
        row: &RecipientNotificationEntity,
    ) -> DispatchOutcome {
        if let Err(e) = self.repo.reset_for_retry(row.id).await {
            error!(id = %row.id, error = %e, "Failed to reset row for retry");
            return DispatchOutcome::failed(format!("bookkeeping error: {}", e));
        }

        let outcome = mailer
            .send(OutgoingEmail {
                to: row.recipient_email.clone(),
                to_name: None,
                subject: row.subject.clone(),
                body_text: row.body.clone(),
                body_html: None,
                attachments: Vec::new(),
            })
            .await;

        match outcome {
            domain::services::MailOutcome::Sent => {
                self.finish(row.id, row.recipient_type, Ok(())).await
            }
            domain::services::MailOutcome::Failed(reason) => {
                self.finish(row.id, row.recipient_type, Err(reason)).await
            }
        }
    }

    async fn finish(
        &self,
        id: uuid::Uuid,
        recipient_type: RecipientType,
        result: Result<(), String>,
    ) -> DispatchOutcome {
        match result {
            Ok(()) => {
                if let Err(e) = self.repo.mark_sent(id).await {
                    error!(id = %id, error = %e, "Failed to mark notification sent");
                }
                record_dispatch(&recipient_type.to_string(), true);
                DispatchOutcome::Sent
            }
            Err(reason) => {
                warn!(id = %id, reason = %reason, "Notification dispatch failed");
                if let Err(e) = self.repo.mark_failed(id, &reason).await {
                    error!(id = %id, error = %e, "Failed to mark notification failed");
                }
                record_dispatch(&recipient_type.to_string(), false);
                DispatchOutcome::Failed { error: reason }
            }
        }
    }

    /// Records a row for a letter that could not even be rendered, so the
    /// failure shows up in statistics.
    async fn record_unsendable(&self, request: &DispatchRequest, template_name: &str, reason: &str) {
        let created = self
            .repo
            .create(CreateRecipientNotificationInput {
                tournament_id: request.tournament_id,
                assignment_id: request.assignment_id,
                recipient_type: request.recipient_type,
                recipient_email: request.recipient_email.clone(),
                subject: template_name.to_string(),
                body: String::new(),
                attachments: Vec::new(),
            })
            .await;
        match created {
            Ok(row) => {
                if let Err(e) = self.repo.mark_failed(row.id, reason).await {
                    error!(id = %row.id, error = %e, "Failed to mark unrenderable row");
                }
            }
            Err(e) => error!(error = %e, "Failed to persist unrenderable notification"),
        }
    }
}
