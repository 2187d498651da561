//! Repository implementations for database operations.

pub mod assignment;
pub mod availability;
pub mod club;
pub mod housekeeping;
pub mod institutional_contact;
pub mod recipient_notification;
pub mod tournament;
pub mod tournament_notification;
pub mod user;
pub mod zone;

pub use assignment::{AssignmentRepository, NewAssignment};
pub use availability::{AvailabilityRepository, NewAvailability};
pub use club::{ClubRepository, NewClub};
pub use housekeeping::{HousekeepingError, HousekeepingRepository, MANAGED_TABLES};
pub use institutional_contact::InstitutionalContactRepository;
pub use recipient_notification::{
    CreateRecipientNotificationInput, RecipientNotificationRepository,
};
pub use tournament::{NewTournament, TournamentRepository};
pub use tournament_notification::{
    CreateTournamentNotificationInput, TournamentNotificationRepository,
};
pub use user::{NewUser, UserRepository};
pub use zone::ZoneRepository;
