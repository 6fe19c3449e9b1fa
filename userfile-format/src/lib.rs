//! Reading and writing user record files as CSV, JSON and XML, plus a few
//! byte- and line-level file tools: positional I/O, charset transcoding and
//! text reformatting.

pub mod codec;
pub mod config;
mod error;
pub mod fs;
pub mod random_access;
pub mod reformat;
pub mod transcode;
pub mod user;

pub use codec::{
    read_users, write_users, Codec, CsvCodec, Decoder, Encoder, Format, JsonCodec, JsonConfig,
    XmlStreamReader, XmlTreeCodec,
};
pub use config::Settings;
pub use error::{Error, ErrorKind, Location, Result};
pub use random_access::{read_at, read_text_at, write_at, write_text_at};
pub use reformat::{reformat, reformat_file, reformat_file_in};
pub use transcode::transcode;
pub use user::{PartialUser, User};

#[doc(hidden)]
pub use figment;
