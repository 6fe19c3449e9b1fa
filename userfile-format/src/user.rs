//! The user record and the partial form decoders collect it in.

use chrono::{Local, NaiveDateTime, Timelike};
use serde::Serialize;

/// Names of the record fields, in their on-disk order.
pub const FIELDS: [&str; 8] = [
    "id",
    "name",
    "email",
    "department",
    "role",
    "active",
    "createdAt",
    "updatedAt",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
    pub active: bool,
    #[serde(with = "timestamp::serde_seconds")]
    pub created_at: NaiveDateTime,
    #[serde(with = "timestamp::serde_seconds")]
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Creates an active user stamped with the current time.
    pub fn new<S: Into<String>>(
        id: Option<i64>,
        name: S,
        email: S,
        department: S,
        role: S,
    ) -> User {
        let now = timestamp::now();
        User {
            id,
            name: name.into(),
            email: email.into(),
            department: department.into(),
            role: role.into(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A user whose fields may not all have been seen yet.
///
/// Every decoder fills one of these and then calls [`PartialUser::finish`],
/// so defaulting lives in one place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialUser {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PartialUser {
    /// Applies defaults: empty text, `active = true`, and `now` for timestamps.
    pub fn finish(self, now: NaiveDateTime) -> User {
        let now = timestamp::truncate(now);
        User {
            id: self.id,
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            department: self.department.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            active: self.active.unwrap_or(true),
            created_at: self.created_at.map(timestamp::truncate).unwrap_or(now),
            updated_at: self.updated_at.map(timestamp::truncate).unwrap_or(now),
        }
    }
}

/// Parses the textual form of `active`. Only `true` (any case) is true; an
/// empty value means the field was omitted.
pub(crate) fn parse_active(value: &str) -> Option<bool> {
    if value.is_empty() {
        None
    } else {
        Some(value.eq_ignore_ascii_case("true"))
    }
}

pub mod timestamp {
    use super::*;

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// The current local time, truncated to whole seconds.
    pub fn now() -> NaiveDateTime {
        truncate(Local::now().naive_local())
    }

    pub fn truncate(value: NaiveDateTime) -> NaiveDateTime {
        value.with_nanosecond(0).unwrap_or(value)
    }

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    /// Accepts `YYYY-MM-DDTHH:MM[:SS[.fff]]`; fractions are dropped.
    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
            .ok()
            .map(truncate)
    }

    pub mod serde_seconds {
        use chrono::NaiveDateTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            value: &NaiveDateTime,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&super::format(value))
        }
    }
}
