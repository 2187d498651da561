//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod assignment;
pub mod availability;
pub mod club;
pub mod institutional_contact;
pub mod recipient_notification;
pub mod tournament;
pub mod tournament_notification;
pub mod user;
pub mod zone;

pub use assignment::{AssignedRefereeEntity, AssignmentEntity};
pub use availability::AvailabilityEntity;
pub use club::ClubEntity;
pub use institutional_contact::InstitutionalContactEntity;
pub use recipient_notification::{DuplicateGroupEntity, RecipientNotificationEntity};
pub use tournament::{
    ReadyTournamentEntity, TournamentEntity, TournamentOverviewEntity, TournamentTypeEntity,
    TournamentWithContextEntity,
};
pub use tournament_notification::TournamentNotificationEntity;
pub use user::{UserEntity, UserRoleDb};
pub use zone::ZoneEntity;
