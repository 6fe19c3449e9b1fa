use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::events::{XmlEvent, XmlEvents};
use super::{Field, FORMAT, ROOT, USER};
use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Location, Result};
use crate::user::{PartialUser, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element of a fully parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new<S: Into<String>>(name: S) -> Element {
        Element {
            name: name.into(),
            children: vec![],
        }
    }

    /// Parses `text` into its root element.
    pub fn parse(text: &str) -> Result<Element> {
        let mut stack: Vec<Element> = vec![];
        let mut root = None;

        for event in XmlEvents::new(text) {
            match event? {
                XmlEvent::Start(name) => stack.push(Element::new(name)),
                XmlEvent::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text));
                    }
                }
                XmlEvent::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        Error::parse(FORMAT, Location::Document, "unbalanced closing tag")
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
            }
        }

        root.ok_or_else(|| {
            Error::parse(FORMAT, Location::Document, "document has no root element")
        })
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text of this element and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.push_text(out),
            }
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.elements().any(|e| e.name == name || e.contains(name))
    }

    /// Elements named `name` at any depth, in document order. Matches are not
    /// searched for further matches.
    pub fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        if self.name == name {
            out.push(self);
            return;
        }
        for element in self.elements() {
            element.find_all(name, out);
        }
    }
}

/// Reads and writes documents through an in-memory element tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTreeCodec;

impl XmlTreeCodec {
    fn user_from_element(element: &Element) -> Result<PartialUser> {
        if element.contains(USER) {
            return Err(Error::parse(
                FORMAT,
                Location::Element(USER.to_string()),
                "<user> nested inside <user>",
            ));
        }

        let mut user = PartialUser::default();
        for field in Field::ALL {
            if let Some(child) = element.child(field.name()) {
                field.assign(&mut user, &child.text_content())?;
            }
        }
        Ok(user)
    }
}

impl Decoder for XmlTreeCodec {
    fn decode_at(&self, text: &str, now: NaiveDateTime) -> Result<Vec<User>> {
        let root = Element::parse(text)?;
        tracing::trace!(root = %root.name, children = root.children.len(), "parsed document tree");

        let mut elements = vec![];
        root.find_all(USER, &mut elements);
        elements
            .into_iter()
            .map(|element| Self::user_from_element(element).map(|p| p.finish(now)))
            .collect()
    }
}

fn write_error(e: quick_xml::Error) -> Error {
    Error::Serialize {
        format: FORMAT,
        message: e.to_string(),
    }
}

impl Encoder for XmlTreeCodec {
    fn encode(&self, users: &[User]) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        let mut events = vec![
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
            Event::Start(BytesStart::new(ROOT)),
        ];
        for user in users {
            events.push(Event::Start(BytesStart::new(USER)));
            for field in Field::ALL {
                events.push(Event::Start(BytesStart::new(field.name())));
                events.push(Event::Text(BytesText::new(&field.value(user)).into_owned()));
                events.push(Event::End(BytesEnd::new(field.name())));
            }
            events.push(Event::End(BytesEnd::new(USER)));
        }
        events.push(Event::End(BytesEnd::new(ROOT)));

        for event in events {
            writer.write_event(event).map_err(write_error)?;
        }

        let mut out = String::from_utf8(writer.into_inner()).map_err(|e| Error::Serialize {
            format: FORMAT,
            message: e.to_string(),
        })?;
        out.push('\n');
        Ok(out)
    }
}
