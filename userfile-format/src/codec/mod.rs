//! Text encodings of user record lists, and the file-level helpers that
//! load and store them.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{Error, Location, Result};
use crate::user::{timestamp, User};

pub mod csv;
pub mod json;
pub mod xml;

pub use self::csv::CsvCodec;
pub use self::json::{JsonCodec, JsonConfig};
pub use self::xml::{XmlStreamReader, XmlTreeCodec};

pub trait Decoder {
    /// Decodes `text`, using `now` for any timestamp the input omits.
    fn decode_at(&self, text: &str, now: NaiveDateTime) -> Result<Vec<User>>;

    fn decode(&self, text: &str) -> Result<Vec<User>> {
        self.decode_at(text, timestamp::now())
    }
}

pub trait Encoder {
    fn encode(&self, users: &[User]) -> Result<String>;
}

/// A format that can both read and write record lists.
pub trait Codec: Decoder + Encoder {}

impl<T: Decoder + Encoder> Codec for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Csv,
    Json,
    Xml,
}

impl Format {
    pub const EXTENSIONS: [&'static str; 3] = ["csv", "json", "xml"];

    /// Picks a format by file extension, ignoring case.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Format::Csv),
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Csv => "CSV",
            Format::Json => "JSON",
            Format::Xml => "XML",
        }
    }

    /// The codec for this format. XML uses the tree codec.
    pub fn codec(self, json: JsonConfig) -> Box<dyn Codec> {
        match self {
            Format::Csv => Box::new(CsvCodec),
            Format::Json => Box::new(JsonCodec::new(json)),
            Format::Xml => Box::new(XmlTreeCodec),
        }
    }
}

/// Reads `path` as UTF-8 and decodes it. A leading byte order mark is ignored.
///
/// Bytes that are not valid UTF-8 are a parse error at their byte offset.
pub fn read_users<D, P>(decoder: &D, path: P) -> Result<Vec<User>>
where
    D: Decoder + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::io(e, path))?;
    let text = String::from_utf8(bytes).map_err(|e| {
        Error::parse(
            "UTF-8",
            Location::Offset(e.utf8_error().valid_up_to() as u64),
            "invalid UTF-8 sequence",
        )
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let users = decoder.decode(text)?;
    tracing::debug!(path = %path.display(), count = users.len(), "read users");
    Ok(users)
}

/// Encodes `users` and atomically replaces `path` with the result.
///
/// The output is staged in a temporary file next to `path` and renamed over
/// it once complete, so a failure never leaves a partial file behind.
/// Parent directories are created as needed.
pub fn write_users<E, P>(encoder: &E, path: P, users: &[User]) -> Result<()>
where
    E: Encoder + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = encoder.encode(users)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;

    let mut staged =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;
    staged
        .write_all(text.as_bytes())
        .and_then(|_| staged.as_file().sync_all())
        .map_err(|e| Error::Io(e, staged.path().to_path_buf()))?;
    staged
        .persist(path)
        .map_err(|e| Error::Io(e.error, path.to_path_buf()))?;

    tracing::debug!(
        path = %path.display(),
        count = users.len(),
        bytes = text.len(),
        "wrote users"
    );
    Ok(())
}
