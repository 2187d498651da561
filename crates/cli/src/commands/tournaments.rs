//! `refman tournaments ...` — send, resend, list, and aggregate stats.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use domain::services::EmailAttachment;
use persistence::repositories::{TournamentNotificationRepository, TournamentRepository};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::services::{EmailService, SendOptions, TournamentNotifier};

use super::confirm;

#[derive(Subcommand, Debug)]
pub enum TournamentsCommand {
    /// List tournaments with their notification state
    List {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Send convocation letters for a tournament
    Send {
        #[arg(long)]
        tournament_id: i64,

        /// Override the pending-aggregate guard
        #[arg(long)]
        force: bool,

        /// Actor recorded on the aggregate
        #[arg(long)]
        sent_by: Option<String>,

        /// Files attached to the letters (repeatable)
        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Resend an earlier aggregate notification
    Resend {
        #[arg(long)]
        notification_id: Uuid,

        /// Override the resend cooldown
        #[arg(long)]
        force: bool,

        #[arg(long)]
        sent_by: Option<String>,

        #[arg(long)]
        attach: Vec<PathBuf>,
    },

    /// Aggregate notification statistics
    Stats,
}

pub async fn run(command: TournamentsCommand, config: &Config, pool: PgPool) -> anyhow::Result<()> {
    match command {
        TournamentsCommand::List { limit } => {
            let tournaments = TournamentRepository::new(pool);
            println!(
                "{:>6}  {:<32} {:<12} {:>9}  {}",
                "id", "name", "start", "referees", "last notification"
            );
            for row in tournaments.list_overview(limit).await? {
                let last = match (row.last_notification_status, row.last_notification_at) {
                    (Some(status), Some(at)) => format!("{} ({})", status, at.format("%Y-%m-%d")),
                    (Some(status), None) => status.to_string(),
                    _ => "-".to_string(),
                };
                println!(
                    "{:>6}  {:<32} {:<12} {:>9}  {}",
                    row.id, row.name, row.start_date, row.assignment_count, last
                );
            }
        }

        TournamentsCommand::Send {
            tournament_id,
            force,
            sent_by,
            attach,
        } => {
            if !confirm(
                &format!("Send convocation letters for tournament {}?", tournament_id),
                force,
            ) {
                println!("Aborted.");
                return Ok(());
            }

            let mailer = EmailService::new(config.email.clone());
            let notifier = TournamentNotifier::new(pool);
            let opts = SendOptions {
                force,
                sent_by,
                attachments: load_attachments(&attach)?,
            };
            let summary = notifier
                .send_tournament_notifications(&mailer, tournament_id, &opts)
                .await?;
            print_summary(&summary);
        }

        TournamentsCommand::Resend {
            notification_id,
            force,
            sent_by,
            attach,
        } => {
            let mailer = EmailService::new(config.email.clone());
            let notifier = TournamentNotifier::new(pool);
            let opts = SendOptions {
                force,
                sent_by,
                attachments: load_attachments(&attach)?,
            };
            let summary = notifier
                .resend_tournament_notifications(&mailer, notification_id, &opts)
                .await?;
            print_summary(&summary);
        }

        TournamentsCommand::Stats => {
            let aggregates = TournamentNotificationRepository::new(pool.clone());
            let tournaments = TournamentRepository::new(pool);

            println!("Aggregate notifications by status:");
            for (status, count) in aggregates.count_by_status().await? {
                println!("  {:<8} {}", status, count);
            }
            println!(
                "Tournaments ready for notification: {}",
                tournaments.count_ready_for_notification().await?
            );
        }
    }
    Ok(())
}

fn print_summary(summary: &domain::models::NotificationSummary) {
    println!(
        "Tournament {}: status {}, {} sent, {} failed (aggregate {})",
        summary.tournament_id,
        summary.status,
        summary.total_sent,
        summary.total_failed,
        summary.aggregate_id
    );
    println!(
        "  club: {}/{}  referees: {}/{}  institutional: {}/{}",
        summary.details.club.sent,
        summary.details.club.total(),
        summary.details.referees.sent,
        summary.details.referees.total(),
        summary.details.institutional.sent,
        summary.details.institutional.total()
    );
}

fn load_attachments(paths: &[PathBuf]) -> anyhow::Result<Vec<EmailAttachment>> {
    paths
        .iter()
        .map(|path| {
            let content = fs::read(path)
                .map_err(|e| anyhow::anyhow!("cannot read attachment {}: {}", path.display(), e))?;
            Ok(EmailAttachment {
                filename: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                content_type: content_type_for(path),
                content,
            })
        })
        .collect()
}

fn content_type_for(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => "application/pdf".to_string(),
        Some("txt") => "text/plain".to_string(),
        _ => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("letter.pdf")), "application/pdf");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(
            content_type_for(Path::new("blob.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_missing_attachment_is_an_error() {
        let result = load_attachments(&[PathBuf::from("/definitely/not/here.pdf")]);
        assert!(result.is_err());
    }
}
