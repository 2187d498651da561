//! Tournament notification aggregator.
//!
//! Fans one tournament's notification out to its three recipient groups
//! (club contact, assigned referees, subscribed institutional addresses),
//! tallies the per-category outcomes, and persists one aggregate row per
//! send-event. Resend layers a new aggregate on top of the old one; the
//! audit trail is never rewritten.
//!
//! Recipient groups are always derived fresh from relational state, so
//! repeating a send or resend never double-counts.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use domain::models::{
    AggregateStatus, NotificationDetails, NotificationSummary, RecipientType,
    RESEND_COOLDOWN_MINUTES,
};
use domain::services::{templates, EmailAttachment, MailSender};
use persistence::entities::TournamentWithContextEntity;
use persistence::repositories::{
    CreateTournamentNotificationInput, InstitutionalContactRepository,
    TournamentNotificationRepository, TournamentRepository,
};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::dispatch::{DispatchRequest, RecipientDispatcher};

/// Notification type institutional contacts subscribe to for convocations.
pub const TOURNAMENT_NOTIFICATION_TYPE: &str = "tournament_convocation";

/// Signature stamped at the bottom of every letter.
const COMMITTEE_SIGNATURE: &str = "National Referee Committee";

/// Errors surfaced by send/resend preconditions. Recipient-level failures
/// are never errors; they are counted in the summary.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Tournament {0} not found")]
    TournamentNotFound(i64),

    #[error("Tournament {0} is not ready: it has no referee assignments")]
    NotReady(i64),

    #[error("Tournament {0} has an unresolved pending notification; use force to override")]
    PendingAggregate(i64),

    #[error("Aggregate notification {0} not found")]
    AggregateNotFound(Uuid),

    #[error("Resend cooldown active: {remaining_minutes} minutes remaining")]
    CooldownActive { remaining_minutes: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Options for a send or resend operation.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub force: bool,
    pub sent_by: Option<String>,
    pub attachments: Vec<EmailAttachment>,
}

/// Orchestrates tournament notification fan-out.
pub struct TournamentNotifier {
    tournaments: TournamentRepository,
    aggregates: TournamentNotificationRepository,
    contacts: InstitutionalContactRepository,
    dispatcher: RecipientDispatcher,
}

impl TournamentNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tournaments: TournamentRepository::new(pool.clone()),
            aggregates: TournamentNotificationRepository::new(pool.clone()),
            contacts: InstitutionalContactRepository::new(pool.clone()),
            dispatcher: RecipientDispatcher::new(pool),
        }
    }

    /// Sends the convocation letters for one tournament and persists the
    /// aggregate record.
    pub async fn send_tournament_notifications(
        &self,
        mailer: &dyn MailSender,
        tournament_id: i64,
        opts: &SendOptions,
    ) -> Result<NotificationSummary, NotifyError> {
        let tournament = self
            .tournaments
            .find_with_context(tournament_id)
            .await?
            .ok_or(NotifyError::TournamentNotFound(tournament_id))?;

        if self.tournaments.count_assignments(tournament_id).await? == 0 {
            return Err(NotifyError::NotReady(tournament_id));
        }

        if !opts.force && self.aggregates.has_pending_for(tournament_id).await? {
            return Err(NotifyError::PendingAggregate(tournament_id));
        }

        self.run_dispatch(mailer, &tournament, opts).await
    }

    /// Re-sends an earlier aggregate. Failed and partial aggregates are
    /// always eligible; a successful one only after the cooldown window,
    /// unless forced. A new aggregate row is created; the old one stays.
    pub async fn resend_tournament_notifications(
        &self,
        mailer: &dyn MailSender,
        aggregate_id: Uuid,
        opts: &SendOptions,
    ) -> Result<NotificationSummary, NotifyError> {
        let previous = self
            .aggregates
            .find_by_id(aggregate_id)
            .await?
            .ok_or(NotifyError::AggregateNotFound(aggregate_id))?;

        resend_eligibility(previous.status, previous.sent_at, Utc::now(), opts.force)?;

        let tournament = self
            .tournaments
            .find_with_context(previous.tournament_id)
            .await?
            .ok_or(NotifyError::TournamentNotFound(previous.tournament_id))?;

        info!(
            tournament_id = previous.tournament_id,
            previous_aggregate = %aggregate_id,
            previous_status = %previous.status,
            "Resending tournament notifications"
        );

        self.run_dispatch(mailer, &tournament, opts).await
    }

    async fn run_dispatch(
        &self,
        mailer: &dyn MailSender,
        tournament: &TournamentWithContextEntity,
        opts: &SendOptions,
    ) -> Result<NotificationSummary, NotifyError> {
        let referees = self.tournaments.find_assigned_referees(tournament.id).await?;
        let institutional = self
            .contacts
            .find_eligible(tournament.zone_id, TOURNAMENT_NOTIFICATION_TYPE)
            .await?;
        let club_contact = tournament
            .club_email
            .as_deref()
            .filter(|email| !email.is_empty())
            .map(|email| (email.to_string(), tournament.club_name.clone()));

        let attachment_refs: Vec<String> = opts
            .attachments
            .iter()
            .map(|a| a.filename.clone())
            .collect();

        if club_contact.is_none() && referees.is_empty() && institutional.is_empty() {
            warn!(tournament_id = tournament.id, "No eligible notification recipients");
            let aggregate = self
                .aggregates
                .create(CreateTournamentNotificationInput {
                    tournament_id: tournament.id,
                    status: AggregateStatus::Failed,
                    total_recipients: 0,
                    sent_at: Some(Utc::now()),
                    sent_by: opts.sent_by.clone(),
                    details: serde_json::to_value(NotificationDetails::default())
                        .unwrap_or_default(),
                    templates_used: serde_json::json!({}),
                    error_message: Some("No eligible recipients".to_string()),
                    attachments: attachment_refs,
                })
                .await?;
            return Ok(NotificationSummary {
                aggregate_id: aggregate.id,
                tournament_id: tournament.id,
                status: AggregateStatus::Failed,
                total_sent: 0,
                total_failed: 0,
                details: NotificationDetails::default(),
            });
        }

        let referee_list = referees
            .iter()
            .map(|r| format!("- {} ({})", r.name, r.role))
            .collect::<Vec<_>>()
            .join("\n");

        let mut details = NotificationDetails::default();
        let mut templates_used = BTreeMap::new();

        if let Some((email, name)) = club_contact {
            let outcome = self
                .dispatcher
                .dispatch(
                    mailer,
                    DispatchRequest {
                        tournament_id: Some(tournament.id),
                        assignment_id: None,
                        recipient_type: RecipientType::Club,
                        recipient_email: email,
                        recipient_name: name,
                        variables: base_variables(tournament, &referee_list),
                        attachments: opts.attachments.clone(),
                    },
                )
                .await;
            details.record(RecipientType::Club, outcome.is_sent());
            templates_used.insert(
                "club".to_string(),
                templates::template_for(RecipientType::Club).name.to_string(),
            );
        }

        for referee in &referees {
            let mut variables = base_variables(tournament, &referee_list);
            variables.insert("referee_name", referee.name.clone());
            variables.insert("role", referee.role.clone());

            let outcome = self
                .dispatcher
                .dispatch(
                    mailer,
                    DispatchRequest {
                        tournament_id: Some(tournament.id),
                        assignment_id: Some(referee.assignment_id),
                        recipient_type: RecipientType::Referee,
                        recipient_email: referee.email.clone(),
                        recipient_name: Some(referee.name.clone()),
                        variables,
                        attachments: opts.attachments.clone(),
                    },
                )
                .await;
            details.record(RecipientType::Referee, outcome.is_sent());
            templates_used.insert(
                "referees".to_string(),
                templates::template_for(RecipientType::Referee).name.to_string(),
            );
        }

        for contact in &institutional {
            let outcome = self
                .dispatcher
                .dispatch(
                    mailer,
                    DispatchRequest {
                        tournament_id: Some(tournament.id),
                        assignment_id: None,
                        recipient_type: RecipientType::Institutional,
                        recipient_email: contact.email.clone(),
                        recipient_name: None,
                        variables: base_variables(tournament, &referee_list),
                        attachments: Vec::new(),
                    },
                )
                .await;
            details.record(RecipientType::Institutional, outcome.is_sent());
            templates_used.insert(
                "institutional".to_string(),
                templates::template_for(RecipientType::Institutional)
                    .name
                    .to_string(),
            );
        }

        let status = details.derive_status();
        let error_message = match status {
            AggregateStatus::Failed => Some("All dispatches failed".to_string()),
            _ => None,
        };

        let aggregate = self
            .aggregates
            .create(CreateTournamentNotificationInput {
                tournament_id: tournament.id,
                status,
                total_recipients: details.total(),
                sent_at: Some(Utc::now()),
                sent_by: opts.sent_by.clone(),
                details: serde_json::to_value(details).unwrap_or_default(),
                templates_used: serde_json::to_value(&templates_used).unwrap_or_default(),
                error_message,
                attachments: attachment_refs,
            })
            .await?;

        info!(
            tournament_id = tournament.id,
            aggregate_id = %aggregate.id,
            status = %status,
            total_sent = details.total_sent(),
            total_failed = details.total_failed(),
            "Tournament notifications dispatched"
        );

        Ok(NotificationSummary {
            aggregate_id: aggregate.id,
            tournament_id: tournament.id,
            status,
            total_sent: details.total_sent(),
            total_failed: details.total_failed(),
            details,
        })
    }
}

fn base_variables(
    tournament: &TournamentWithContextEntity,
    referee_list: &str,
) -> BTreeMap<&'static str, String> {
    let mut variables = BTreeMap::new();
    variables.insert("tournament_name", tournament.name.clone());
    variables.insert(
        "club_name",
        tournament
            .club_name
            .clone()
            .unwrap_or_else(|| "the host club".to_string()),
    );
    variables.insert("zone_name", tournament.zone_name.clone());
    variables.insert("start_date", tournament.start_date.to_string());
    variables.insert("end_date", tournament.end_date.to_string());
    variables.insert("referee_list", referee_list.to_string());
    variables.insert("committee", COMMITTEE_SIGNATURE.to_string());
    variables
}

/// Resend gate: failed and partial aggregates are always eligible; a sent
/// one only after the cooldown; a pending one never (it is unresolved).
/// `force` bypasses the cooldown and the pending gate.
fn resend_eligibility(
    status: AggregateStatus,
    sent_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    force: bool,
) -> Result<(), NotifyError> {
    if force {
        return Ok(());
    }
    match status {
        AggregateStatus::Failed | AggregateStatus::Partial => Ok(()),
        AggregateStatus::Pending => Err(NotifyError::CooldownActive {
            remaining_minutes: RESEND_COOLDOWN_MINUTES,
        }),
        AggregateStatus::Sent => {
            let last = sent_at.unwrap_or(now);
            let elapsed = now - last;
            let cooldown = Duration::minutes(RESEND_COOLDOWN_MINUTES);
            if elapsed >= cooldown {
                Ok(())
            } else {
                Err(NotifyError::CooldownActive {
                    remaining_minutes: (cooldown - elapsed).num_minutes().max(1),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_and_partial_always_resendable() {
        let now = Utc::now();
        assert!(resend_eligibility(AggregateStatus::Failed, Some(now), now, false).is_ok());
        assert!(resend_eligibility(AggregateStatus::Partial, Some(now), now, false).is_ok());
    }

    #[test]
    fn test_sent_blocked_inside_cooldown() {
        let now = Utc::now();
        let result = resend_eligibility(
            AggregateStatus::Sent,
            Some(now - Duration::minutes(10)),
            now,
            false,
        );
        match result {
            Err(NotifyError::CooldownActive { remaining_minutes }) => {
                assert!(remaining_minutes > 0 && remaining_minutes <= RESEND_COOLDOWN_MINUTES);
            }
            other => panic!("expected cooldown error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_sent_allowed_after_cooldown() {
        let now = Utc::now();
        let result = resend_eligibility(
            AggregateStatus::Sent,
            Some(now - Duration::minutes(RESEND_COOLDOWN_MINUTES + 1)),
            now,
            false,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_force_bypasses_cooldown() {
        let now = Utc::now();
        assert!(resend_eligibility(AggregateStatus::Sent, Some(now), now, true).is_ok());
        assert!(resend_eligibility(AggregateStatus::Pending, None, now, true).is_ok());
    }

    #[test]
    fn test_pending_not_resendable() {
        let now = Utc::now();
        assert!(resend_eligibility(AggregateStatus::Pending, None, now, false).is_err());
    }
}
