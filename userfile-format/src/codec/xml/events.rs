//! A flattened, well-formedness-checked view of a quick-xml event stream.

use std::borrow::Cow;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::FORMAT;
use crate::error::{Error, Location, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    Start(String),
    /// Unescaped character data, CDATA included. Never empty.
    Text(String),
    End(String),
}

/// Yields start, text and end events for a document.
///
/// Empty elements are expanded to a start and end pair, and declarations,
/// comments and processing instructions are dropped. Text inside the root is
/// passed through as is, whitespace included; consumers decide where it is
/// meaningful. Whitespace outside the root is discarded. The document must
/// have exactly one root element with every element closed; anything else
/// ends the iteration with a parse error.
pub struct XmlEvents<'a> {
    reader: Reader<&'a [u8]>,
    depth: usize,
    seen_root: bool,
    done: bool,
}

impl<'a> XmlEvents<'a> {
    pub fn new(text: &'a str) -> XmlEvents<'a> {
        let mut reader = Reader::from_str(text);
        reader.expand_empty_elements(true);
        reader.check_end_names(true);
        XmlEvents {
            reader,
            depth: 0,
            seen_root: false,
            done: false,
        }
    }

    fn error<S: Into<String>>(&mut self, message: S) -> Error {
        self.done = true;
        Error::parse(
            FORMAT,
            Location::Offset(self.reader.buffer_position() as u64),
            message,
        )
    }

    fn name(&mut self, raw: &[u8]) -> Result<String> {
        match std::str::from_utf8(raw) {
            Ok(name) => Ok(name.to_string()),
            Err(e) => Err(self.error(format!("element name is not UTF-8: {}", e))),
        }
    }

    fn text(&mut self, text: Cow<'_, str>) -> Option<Result<XmlEvent>> {
        if text.is_empty() {
            return None;
        }
        if self.depth == 0 {
            if text.trim().is_empty() {
                return None;
            }
            return Some(Err(self.error("text outside of the root element")));
        }
        Some(Ok(XmlEvent::Text(text.into_owned())))
    }

    fn next_event(&mut self) -> Option<Result<XmlEvent>> {
        loop {
            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => return Some(Err(self.error(e.to_string()))),
            };

            match event {
                Event::Start(start) => {
                    if self.depth == 0 && self.seen_root {
                        return Some(Err(self.error("more than one root element")));
                    }
                    let name = match self.name(start.name().as_ref()) {
                        Ok(name) => name,
                        Err(e) => return Some(Err(e)),
                    };
                    self.depth += 1;
                    self.seen_root = true;
                    return Some(Ok(XmlEvent::Start(name)));
                }
                Event::End(end) => {
                    if self.depth == 0 {
                        return Some(Err(self.error("closing tag without an open element")));
                    }
                    let name = match self.name(end.name().as_ref()) {
                        Ok(name) => name,
                        Err(e) => return Some(Err(e)),
                    };
                    self.depth -= 1;
                    return Some(Ok(XmlEvent::End(name)));
                }
                Event::Text(text) => {
                    let text = match text.unescape() {
                        Ok(text) => text,
                        Err(e) => return Some(Err(self.error(e.to_string()))),
                    };
                    if let Some(event) = self.text(text) {
                        return Some(event);
                    }
                }
                Event::CData(data) => {
                    let text = match std::str::from_utf8(&data) {
                        Ok(text) => Cow::Borrowed(text),
                        Err(e) => {
                            return Some(Err(self.error(format!("CDATA is not UTF-8: {}", e))))
                        }
                    };
                    if let Some(event) = self.text(text) {
                        return Some(event);
                    }
                }
                Event::Eof => {
                    self.done = true;
                    if !self.seen_root {
                        return Some(Err(self.error("document has no root element")));
                    }
                    if self.depth > 0 {
                        return Some(Err(self.error(format!(
                            "unexpected end of document with {} element(s) still open",
                            self.depth
                        ))));
                    }
                    return None;
                }
                Event::Empty(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::Comment(_)
                | Event::DocType(_) => {}
            }
        }
    }
}

impl<'a> Iterator for XmlEvents<'a> {
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.next_event()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(text: &str) -> Result<Vec<XmlEvent>> {
        XmlEvents::new(text).collect()
    }

    #[test]
    fn flattens_empty_elements_and_drops_noise() {
        let events =
            collect("<?xml version=\"1.0\"?>\n<!-- c --><a><b/> x &amp; y </a>\n").unwrap();
        assert_eq!(
            events,
            vec![
                XmlEvent::Start("a".into()),
                XmlEvent::Start("b".into()),
                XmlEvent::End("b".into()),
                XmlEvent::Text(" x & y ".into()),
                XmlEvent::End("a".into()),
            ]
        );
    }

    #[test]
    fn whitespace_inside_the_root_is_kept() {
        let events = collect("<a>\n  <b>\t</b></a>").unwrap();
        assert_eq!(
            events,
            vec![
                XmlEvent::Start("a".into()),
                XmlEvent::Text("\n  ".into()),
                XmlEvent::Start("b".into()),
                XmlEvent::Text("\t".into()),
                XmlEvent::End("b".into()),
                XmlEvent::End("a".into()),
            ]
        );
    }

    #[test]
    fn unclosed_document_is_an_error() {
        assert!(collect("<a><b></b>").is_err());
    }

    #[test]
    fn stops_after_first_error() {
        let mut events = XmlEvents::new("<a></b><c/>");
        assert!(matches!(events.next(), Some(Ok(XmlEvent::Start(name))) if name == "a"));
        assert!(matches!(events.next(), Some(Err(_))));
        assert!(events.next().is_none());
    }
}
