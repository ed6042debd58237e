use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::meetup::{Meetup, MeetupId};
use crate::errors::DomainError;

/// The whole persisted collection, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub meetups: Vec<Meetup>,
}

impl RegistrySnapshot {
    pub fn new(meetups: Vec<Meetup>) -> Self {
        Self { meetups }
    }

    pub fn is_empty(&self) -> bool {
        self.meetups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.meetups.len()
    }

    /// `max(id) + 1`, or 1 for an empty registry. Deleting the current
    /// maximum makes its id available again. Fails once the maximum is
    /// `u64::MAX` rather than wrapping to the invalid id 0.
    pub fn next_id(&self) -> Result<MeetupId, DomainError> {
        let max = self.meetups.iter().map(|meetup| meetup.id.0).max().unwrap_or(0);
        max.checked_add(1).map(MeetupId).ok_or_else(|| {
            DomainError::InvariantViolation(format!(
                "no meetup id left after {max}; delete the highest id to free it"
            ))
        })
    }

    pub fn find(&self, id: MeetupId) -> Option<&Meetup> {
        self.meetups.iter().find(|meetup| meetup.id == id)
    }

    pub fn push(&mut self, meetup: Meetup) {
        self.meetups.push(meetup);
    }

    pub fn remove(&mut self, id: MeetupId) -> Option<Meetup> {
        let index = self.meetups.iter().position(|meetup| meetup.id == id)?;
        Some(self.meetups.remove(index))
    }

    pub fn check_invariants(&self) -> Result<(), DomainError> {
        let mut seen = HashSet::with_capacity(self.meetups.len());
        for meetup in &self.meetups {
            if meetup.id.0 == 0 {
                return Err(DomainError::InvariantViolation(format!(
                    "meetup `{}` has id 0; ids are strictly positive",
                    meetup.title
                )));
            }
            if !seen.insert(meetup.id) {
                return Err(DomainError::InvariantViolation(format!(
                    "meetup id {} appears more than once",
                    meetup.id
                )));
            }
        }
        Ok(())
    }
}
