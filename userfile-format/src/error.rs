use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Where in the input a parse failure was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// 1-based line number, header included.
    Line(usize),
    /// Name of the offending element.
    Element(String),
    /// Byte offset into the input.
    Offset(u64),
    Document,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Line(line) => write!(f, "line {}", line),
            Location::Element(name) => write!(f, "element <{}>", name),
            Location::Offset(offset) => write!(f, "byte offset {}", offset),
            Location::Document => f.write_str("document"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("File not found. Path: '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("Malformed {format} content at {location}: {message}")]
    Parse {
        format: &'static str,
        location: Location,
        message: String,
    },

    #[error("Unknown or unsupported character encoding: '{0}'")]
    Encoding(String),

    #[error("I/O failure. Path: '{}'", .1.display())]
    Io(#[source] std::io::Error, PathBuf),

    #[error("Could not serialize {format} output: {message}")]
    Serialize {
        format: &'static str,
        message: String,
    },
}

/// Coarse classification of [`Error`], for callers that only need to decide
/// how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Parse,
    Encoding,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Io(..) | Error::Serialize { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn parse<S: Into<String>>(
        format: &'static str,
        location: Location,
        message: S,
    ) -> Error {
        Error::Parse {
            format,
            location,
            message: message.into(),
        }
    }

    /// Maps an I/O error on `path`, turning `ErrorKind::NotFound` into [`Error::NotFound`].
    pub(crate) fn io<P: Into<PathBuf>>(source: std::io::Error, path: P) -> Error {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path)
        } else {
            Error::Io(source, path)
        }
    }
}
