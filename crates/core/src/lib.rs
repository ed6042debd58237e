pub mod config;
pub mod domain;
pub mod errors;

pub use domain::meetup::{Meetup, MeetupDraft, MeetupId, MeetupStatus, ValidatedMeetup};
pub use domain::registry::RegistrySnapshot;
pub use errors::{ApplicationError, DomainError, InterfaceError};
