//! XML documents of the form `<users><user><id>..</id>..</user></users>`.
//!
//! Two readers share one event source ([`events::XmlEvents`]) so that they
//! accept exactly the same documents: [`XmlTreeCodec`] builds an element tree
//! first, [`XmlStreamReader`] folds the events through a state machine.

use crate::error::{Error, Location, Result};
use crate::user::{parse_active, timestamp, PartialUser, User, FIELDS};

pub mod events;
pub mod stream;
pub mod tree;

pub use self::stream::XmlStreamReader;
pub use self::tree::XmlTreeCodec;

pub(crate) const FORMAT: &str = "XML";
pub const ROOT: &str = "users";
pub const USER: &str = "user";

/// A child element of `<user>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Email,
    Department,
    Role,
    Active,
    CreatedAt,
    UpdatedAt,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Id,
        Field::Name,
        Field::Email,
        Field::Department,
        Field::Role,
        Field::Active,
        Field::CreatedAt,
        Field::UpdatedAt,
    ];

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        FIELDS[self as usize]
    }

    /// Stores the element text into `user`. Empty text leaves the field unset.
    pub fn assign(self, user: &mut PartialUser, text: &str) -> Result<()> {
        let invalid = |what: &str| {
            Error::parse(
                FORMAT,
                Location::Element(self.name().to_string()),
                format!("invalid {} '{}'", what, text),
            )
        };
        let trimmed = text.trim();

        match self {
            Field::Id if trimmed.is_empty() => user.id = None,
            Field::Id => user.id = Some(trimmed.parse().map_err(|_| invalid("integer"))?),
            Field::Name => user.name = Some(text.to_string()),
            Field::Email => user.email = Some(text.to_string()),
            Field::Department => user.department = Some(text.to_string()),
            Field::Role => user.role = Some(text.to_string()),
            Field::Active => user.active = parse_active(trimmed),
            Field::CreatedAt | Field::UpdatedAt => {
                let value = if trimmed.is_empty() {
                    None
                } else {
                    Some(timestamp::parse(trimmed).ok_or_else(|| invalid("timestamp"))?)
                };
                if self == Field::CreatedAt {
                    user.created_at = value;
                } else {
                    user.updated_at = value;
                }
            }
        }
        Ok(())
    }

    /// The text written for this field of `user`.
    pub fn value(self, user: &User) -> String {
        match self {
            Field::Id => user.id.map(|id| id.to_string()).unwrap_or_default(),
            Field::Name => user.name.clone(),
            Field::Email => user.email.clone(),
            Field::Department => user.department.clone(),
            Field::Role => user.role.clone(),
            Field::Active => user.active.to_string(),
            Field::CreatedAt => timestamp::format(&user.created_at),
            Field::UpdatedAt => timestamp::format(&user.updated_at),
        }
    }
}
