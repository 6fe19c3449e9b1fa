//! Single pass, event driven user reader.
//!
//! The reader never builds a tree. Each event moves a [`State`] value forward
//! through [`State::step`], and finished users are emitted as `</user>` tags
//! are reached.

use chrono::NaiveDateTime;

use super::events::{XmlEvent, XmlEvents};
use super::{Field, FORMAT, USER};
use crate::codec::Decoder;
use crate::error::{Error, Location, Result};
use crate::user::{PartialUser, User};

/// A user being read, plus which fields have been assigned. The first
/// occurrence of a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pending {
    pub user: PartialUser,
    seen: Vec<Field>,
}

impl Pending {
    fn assign(&mut self, field: Field, text: &str) -> Result<()> {
        if self.seen.contains(&field) {
            return Ok(());
        }
        self.seen.push(field);
        field.assign(&mut self.user, text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Before, between or around `<user>` elements.
    Outside,
    InUser(Pending),
    /// Inside an element of `<user>` that is not a field. `depth` counts the
    /// open elements being skipped.
    Skipping { pending: Pending, depth: usize },
    /// Collecting the text of `field`. `depth` counts elements opened inside
    /// the field, whose text is collected too.
    InField {
        pending: Pending,
        field: Field,
        buffer: String,
        depth: usize,
    },
}

fn nesting_error<S: Into<String>>(element: &str, message: S) -> Error {
    Error::parse(FORMAT, Location::Element(element.to_string()), message)
}

impl State {
    /// Advances the state by one event, returning the next state and the user
    /// completed by this event, if any.
    pub fn step(self, event: XmlEvent, now: NaiveDateTime) -> Result<(State, Option<User>)> {
        let next = match (self, event) {
            (State::Outside, XmlEvent::Start(name)) if name == USER => {
                State::InUser(Pending::default())
            }
            (State::Outside, XmlEvent::End(name)) if name == USER => {
                return Err(nesting_error(USER, "</user> without a matching <user>"));
            }
            (State::Outside, _) => State::Outside,

            (State::InUser(pending), XmlEvent::Start(name)) => {
                if name == USER {
                    return Err(nesting_error(USER, "<user> nested inside <user>"));
                }
                match Field::from_name(&name) {
                    Some(field) => State::InField {
                        pending,
                        field,
                        buffer: String::new(),
                        depth: 0,
                    },
                    None => State::Skipping { pending, depth: 1 },
                }
            }
            (State::InUser(pending), XmlEvent::Text(_)) => State::InUser(pending),
            (State::InUser(pending), XmlEvent::End(name)) => {
                if name != USER {
                    return Err(nesting_error(&name, "closing tag with no open field"));
                }
                return Ok((State::Outside, Some(pending.user.finish(now))));
            }

            (State::Skipping { pending, depth }, XmlEvent::Start(name)) => {
                if name == USER {
                    return Err(nesting_error(USER, "<user> nested inside <user>"));
                }
                State::Skipping {
                    pending,
                    depth: depth + 1,
                }
            }
            (state @ State::Skipping { .. }, XmlEvent::Text(_)) => state,
            (State::Skipping { pending, depth }, XmlEvent::End(_)) => match depth {
                0 | 1 => State::InUser(pending),
                _ => State::Skipping {
                    pending,
                    depth: depth - 1,
                },
            },

            (
                State::InField {
                    pending,
                    field,
                    buffer,
                    depth,
                },
                XmlEvent::Start(name),
            ) => {
                if name == USER {
                    return Err(nesting_error(USER, "<user> nested inside a field"));
                }
                State::InField {
                    pending,
                    field,
                    buffer,
                    depth: depth + 1,
                }
            }
            (
                State::InField {
                    pending,
                    field,
                    mut buffer,
                    depth,
                },
                XmlEvent::Text(text),
            ) => {
                buffer.push_str(&text);
                State::InField {
                    pending,
                    field,
                    buffer,
                    depth,
                }
            }
            (
                State::InField {
                    mut pending,
                    field,
                    buffer,
                    depth,
                },
                XmlEvent::End(name),
            ) => {
                if depth > 0 {
                    State::InField {
                        pending,
                        field,
                        buffer,
                        depth: depth - 1,
                    }
                } else if name == field.name() {
                    pending.assign(field, &buffer)?;
                    State::InUser(pending)
                } else {
                    return Err(nesting_error(
                        &name,
                        format!("closing tag while reading <{}>", field.name()),
                    ));
                }
            }
        };
        Ok((next, None))
    }
}

/// Reads users by folding document events through [`State::step`].
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlStreamReader;

impl XmlStreamReader {
    pub fn decode_streaming(&self, text: &str) -> Result<Vec<User>> {
        self.decode(text)
    }
}

impl Decoder for XmlStreamReader {
    fn decode_at(&self, text: &str, now: NaiveDateTime) -> Result<Vec<User>> {
        let (state, users) = XmlEvents::new(text).try_fold(
            (State::Outside, Vec::new()),
            |(state, mut users), event| {
                let (next, done) = state.step(event?, now)?;
                if let Some(user) = done {
                    tracing::trace!(id = ?user.id, "user complete");
                    users.push(user);
                }
                Ok::<_, Error>((next, users))
            },
        )?;

        if state != State::Outside {
            return Err(Error::parse(
                FORMAT,
                Location::Document,
                "document ended inside <user>",
            ));
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::timestamp;

    fn start(name: &str) -> XmlEvent {
        XmlEvent::Start(name.into())
    }

    fn end(name: &str) -> XmlEvent {
        XmlEvent::End(name.into())
    }

    fn text(value: &str) -> XmlEvent {
        XmlEvent::Text(value.into())
    }

    fn run(events: Vec<XmlEvent>) -> Result<(State, Vec<User>)> {
        let now = timestamp::parse("2024-01-01T00:00:00").unwrap();
        let mut state = State::Outside;
        let mut users = vec![];
        for event in events {
            let (next, done) = state.step(event, now)?;
            users.extend(done);
            state = next;
        }
        Ok((state, users))
    }

    #[test]
    fn walks_through_states() {
        let now = timestamp::parse("2024-01-01T00:00:00").unwrap();
        let (state, _) = State::Outside.step(start("user"), now).unwrap();
        assert!(matches!(state, State::InUser(_)));

        let (state, _) = state.step(start("name"), now).unwrap();
        assert!(matches!(state, State::InField { field: Field::Name, .. }));

        let (state, _) = state.step(text("Ana"), now).unwrap();
        match &state {
            State::InField { buffer, .. } => assert_eq!(buffer, "Ana"),
            other => panic!("unexpected state {:?}", other),
        }

        let (state, _) = state.step(end("name"), now).unwrap();
        assert!(matches!(state, State::InUser(_)));

        let (state, user) = state.step(end("user"), now).unwrap();
        assert_eq!(state, State::Outside);
        assert_eq!(user.unwrap().name, "Ana");
    }

    #[test]
    fn whitespace_between_fields_is_ignored() {
        let (_, users) = run(vec![
            start("user"),
            text("\n    "),
            start("role"),
            text("Dev"),
            end("role"),
            text("\n  "),
            end("user"),
        ])
        .unwrap();
        assert_eq!(users[0].role, "Dev");
    }

    #[test]
    fn whitespace_only_field_text_is_kept() {
        let (_, users) = run(vec![
            start("user"),
            start("name"),
            text(" "),
            end("name"),
            start("department"),
            text("\t"),
            end("department"),
            end("user"),
        ])
        .unwrap();
        assert_eq!(users[0].name, " ");
        assert_eq!(users[0].department, "\t");
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let (_, users) = run(vec![
            start("user"),
            start("notes"),
            start("name"),
            text("Hidden"),
            end("name"),
            end("notes"),
            start("name"),
            text("Shown"),
            end("name"),
            end("user"),
        ])
        .unwrap();
        assert_eq!(users[0].name, "Shown");
    }

    #[test]
    fn user_end_inside_field_is_an_error() {
        let err = run(vec![start("user"), start("name"), text("Ana"), end("user")]).unwrap_err();
        assert!(err.to_string().contains("closing tag while reading <name>"));
    }

    #[test]
    fn field_end_without_field_is_an_error() {
        assert!(run(vec![start("user"), end("name")]).is_err());
        assert!(run(vec![end("user")]).is_err());
    }

    #[test]
    fn open_user_stays_pending() {
        let users = XmlStreamReader
            .decode_streaming("<users><user><id>1</id></user><user></user></users>")
            .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].id, None);

        let (state, users) = run(vec![start("users"), start("user")]).unwrap();
        assert!(users.is_empty());
        assert!(matches!(state, State::InUser(_)));
    }
}
