pub mod meetup;
pub mod registry;
