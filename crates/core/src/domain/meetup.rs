use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const NAIVE_DATE_TIME_FORMATS: [&str; 4] =
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeetupId(pub u64);

impl fmt::Display for MeetupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MeetupId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let id = value.trim().parse::<u64>().map_err(|_| DomainError::Validation {
            field: "id",
            reason: format!("`{value}` is not a meetup id"),
        })?;
        if id == 0 {
            return Err(DomainError::Validation {
                field: "id",
                reason: "meetup ids start at 1".to_owned(),
            });
        }
        Ok(Self(id))
    }
}

/// Lifecycle marker shown next to each meetup. There are no automatic
/// transitions between the two values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetupStatus {
    #[serde(rename = "activo")]
    Active,
    #[serde(rename = "pendiente")]
    Pending,
}

impl MeetupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "activo",
            Self::Pending => "pendiente",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Active => "🟢",
            Self::Pending => "🟡",
        }
    }
}

impl fmt::Display for MeetupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetupStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "activo" | "active" => Ok(Self::Active),
            "pendiente" | "pending" => Ok(Self::Pending),
            other => Err(DomainError::Validation {
                field: "status",
                reason: format!("unsupported status `{other}` (expected activo|pendiente)"),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meetup {
    pub id: MeetupId,
    pub title: String,
    pub description: String,
    #[serde(with = "utc_timestamp")]
    pub date: DateTime<Utc>,
    pub location: String,
    pub status: MeetupStatus,
    #[serde(default)]
    pub participants: Vec<String>,
}

/// Raw field values as supplied by a command handler, before validation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeetupDraft {
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedMeetup {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub status: MeetupStatus,
}

impl MeetupDraft {
    pub fn validate(&self) -> Result<ValidatedMeetup, DomainError> {
        let title = required_text("title", &self.title)?;
        let description = required_text("description", &self.description)?;
        let date = parse_meetup_date(&self.date)?;
        let status = self.status.parse::<MeetupStatus>()?;

        Ok(ValidatedMeetup {
            title,
            description,
            date,
            location: self.location.trim().to_owned(),
            status,
        })
    }
}

impl ValidatedMeetup {
    pub fn into_meetup(self, id: MeetupId) -> Meetup {
        Meetup {
            id,
            title: self.title,
            description: self.description,
            date: self.date,
            location: self.location,
            status: self.status,
            participants: Vec::new(),
        }
    }
}

/// Accepts an RFC 3339 timestamp (any offset, normalized to UTC) or a naive
/// `YYYY-MM-DD[T| ]HH:MM[:SS]` value interpreted as UTC.
pub fn parse_meetup_date(raw: &str) -> Result<DateTime<Utc>, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation {
            field: "date",
            reason: "date is required".to_owned(),
        });
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DomainError::Validation {
            field: "date",
            reason: format!("`{trimmed}` is not a valid calendar date and time"),
        })
}

fn required_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation { field, reason: format!("{field} must not be empty") });
    }
    Ok(trimmed.to_owned())
}

mod utc_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|error| de::Error::custom(format!("invalid meetup date `{raw}`: {error}")))
    }
}
