//! Comma separated records with a fixed header line.
//!
//! There is no quoting: a value containing `,` shifts the rest of its row.
//! Values written by [`CsvCodec::encode`] are emitted as-is, so such a row
//! will not decode back to the same record.

use chrono::NaiveDateTime;

use super::{Decoder, Encoder};
use crate::error::{Error, Location, Result};
use crate::user::{parse_active, timestamp, PartialUser, User, FIELDS};

pub const HEADER: &str = "id,name,email,department,role,active,createdAt,updatedAt";

const FORMAT: &str = "CSV";

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvCodec;

impl CsvCodec {
    fn parse_line(line: &str, number: usize) -> Result<PartialUser> {
        let fields = line.split(',').collect::<Vec<_>>();
        if fields.len() > FIELDS.len() {
            tracing::warn!(
                line = number,
                fields = fields.len(),
                "row has more fields than the header; extra fields ignored"
            );
        }

        let field = |index: usize| fields.get(index).copied().unwrap_or("");
        let timestamp_at = |index: usize| -> Result<Option<NaiveDateTime>> {
            match field(index) {
                "" => Ok(None),
                value => timestamp::parse(value).map(Some).ok_or_else(|| {
                    Error::parse(
                        FORMAT,
                        Location::Line(number),
                        format!("invalid {} '{}'", FIELDS[index], value),
                    )
                }),
            }
        };
        let text_at = |index: usize| match field(index) {
            "" => None,
            value => Some(value.to_string()),
        };

        let id = match field(0) {
            "" => None,
            value => Some(value.parse::<i64>().map_err(|e| {
                Error::parse(
                    FORMAT,
                    Location::Line(number),
                    format!("invalid id '{}': {}", value, e),
                )
            })?),
        };

        Ok(PartialUser {
            id,
            name: text_at(1),
            email: text_at(2),
            department: text_at(3),
            role: text_at(4),
            active: parse_active(field(5)),
            created_at: timestamp_at(6)?,
            updated_at: timestamp_at(7)?,
        })
    }

    fn format_line(user: &User) -> String {
        [
            user.id.map(|id| id.to_string()).unwrap_or_default(),
            user.name.clone(),
            user.email.clone(),
            user.department.clone(),
            user.role.clone(),
            user.active.to_string(),
            timestamp::format(&user.created_at),
            timestamp::format(&user.updated_at),
        ]
        .join(",")
    }
}

impl Decoder for CsvCodec {
    fn decode_at(&self, text: &str, now: NaiveDateTime) -> Result<Vec<User>> {
        text.lines()
            .enumerate()
            // The header is never validated, only skipped.
            .skip(1)
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| Self::parse_line(line, index + 1).map(|p| p.finish(now)))
            .collect()
    }
}

impl Encoder for CsvCodec {
    fn encode(&self, users: &[User]) -> Result<String> {
        let mut out = String::with_capacity(HEADER.len() + 1 + users.len() * 96);
        out.push_str(HEADER);
        out.push('\n');
        for user in users {
            out.push_str(&Self::format_line(user));
            out.push('\n');
        }
        Ok(out)
    }
}
