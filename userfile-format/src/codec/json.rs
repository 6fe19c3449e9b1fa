//! A JSON array of user objects, field names in camelCase.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use super::{Decoder, Encoder};
use crate::error::{Error, Location, Result};
use crate::user::{timestamp, PartialUser, User};

const FORMAT: &str = "JSON";

/// Output settings for [`JsonCodec`]. Fixed once the codec is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonConfig {
    pub pretty: bool,
    /// Spaces per indentation level when `pretty` is set.
    pub indent: usize,
}

impl Default for JsonConfig {
    fn default() -> Self {
        JsonConfig {
            pretty: true,
            indent: 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonCodec {
    config: JsonConfig,
}

/// Wire form of a record. Timestamps stay as text so a bad value can be
/// reported with the field it came from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    id: Option<i64>,
    name: Option<String>,
    email: Option<String>,
    department: Option<String>,
    role: Option<String>,
    active: Option<bool>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl RawUser {
    fn into_partial(self, index: usize) -> Result<PartialUser> {
        let parse_time = |field: &str, value: Option<String>| -> Result<Option<NaiveDateTime>> {
            match value {
                None => Ok(None),
                Some(value) => timestamp::parse(&value).map(Some).ok_or_else(|| {
                    Error::parse(
                        FORMAT,
                        Location::Document,
                        format!("invalid {} '{}' in element {}", field, value, index),
                    )
                }),
            }
        };

        Ok(PartialUser {
            id: self.id,
            name: self.name,
            email: self.email,
            department: self.department,
            role: self.role,
            active: self.active,
            created_at: parse_time("createdAt", self.created_at)?,
            updated_at: parse_time("updatedAt", self.updated_at)?,
        })
    }
}

impl JsonCodec {
    pub fn new(config: JsonConfig) -> JsonCodec {
        JsonCodec { config }
    }

    pub fn config(&self) -> &JsonConfig {
        &self.config
    }
}

fn parse_error(e: serde_json::Error) -> Error {
    let location = if e.line() == 0 {
        Location::Document
    } else {
        Location::Line(e.line())
    };
    Error::parse(FORMAT, location, e.to_string())
}

impl Decoder for JsonCodec {
    fn decode_at(&self, text: &str, now: NaiveDateTime) -> Result<Vec<User>> {
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let value: serde_json::Value = serde_json::from_str(text).map_err(parse_error)?;
        if !value.is_array() {
            return Err(Error::parse(
                FORMAT,
                Location::Document,
                "expected a top-level array of users",
            ));
        }

        let raw: Vec<RawUser> = serde_json::from_value(value).map_err(parse_error)?;
        raw.into_iter()
            .enumerate()
            .map(|(index, user)| user.into_partial(index).map(|p| p.finish(now)))
            .collect()
    }
}

impl Encoder for JsonCodec {
    fn encode(&self, users: &[User]) -> Result<String> {
        let mut out = Vec::new();
        let result = if self.config.pretty {
            let indent = vec![b' '; self.config.indent];
            let formatter = PrettyFormatter::with_indent(&indent);
            let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
            users.serialize(&mut ser)
        } else {
            serde_json::to_writer(&mut out, users)
        };

        result.map_err(|e| Error::Serialize {
            format: FORMAT,
            message: e.to_string(),
        })?;
        String::from_utf8(out).map_err(|e| Error::Serialize {
            format: FORMAT,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::NaiveDate;

    fn user() -> User {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        User {
            id: Some(1),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            department: "IT".into(),
            role: "Dev".into(),
            active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn encodes_pretty_camel_case() {
        let text = JsonCodec::default().encode(&[user()]).unwrap();
        assert!(text.starts_with("[\n  {\n    \"id\": 1,"));
        assert!(text.contains("\"createdAt\": \"2024-01-01T10:00:00\""));
        assert!(text.contains("\"active\": true"));
    }

    #[test]
    fn compact_config_has_no_newlines() {
        let codec = JsonCodec::new(JsonConfig {
            pretty: false,
            indent: 0,
        });
        let text = codec.encode(&[user()]).unwrap();
        assert!(!text.contains('\n'));
        assert_eq!(codec.decode(&text).unwrap(), vec![user()]);
    }

    #[test]
    fn empty_inputs_decode_to_empty_list() {
        assert!(JsonCodec::default().decode("[]").unwrap().is_empty());
        assert!(JsonCodec::default().decode("  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = JsonCodec::default().decode("{not json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn non_array_is_a_parse_error() {
        let err = JsonCodec::default().decode("{\"id\": 1}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("top-level array"));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let now = user().created_at;
        let users = JsonCodec::default()
            .decode_at(r#"[{"name": "Eva", "id": null}]"#, now)
            .unwrap();
        assert_eq!(users[0].id, None);
        assert_eq!(users[0].name, "Eva");
        assert!(users[0].active);
        assert_eq!(users[0].updated_at, now);
    }

    #[test]
    fn bad_timestamp_is_a_parse_error() {
        let err = JsonCodec::default()
            .decode(r#"[{"name": "Eva", "createdAt": "soon"}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("createdAt"));
    }
}
