//! Positional reads and writes against a file treated as a flat byte array.

use std::fs::OpenOptions;
use std::io::{prelude::*, SeekFrom};
use std::path::Path;

use crate::error::{Error, Result};

/// Reads up to `length` bytes starting at `position`.
///
/// Reading past the end is not an error: a `position` beyond the end gives an
/// empty result, and a range crossing the end is cut short.
pub fn read_at<P: AsRef<Path>>(path: P, position: u64, length: u64) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| Error::io(e, path))?;

    let mut out = vec![];
    file.seek(SeekFrom::Start(position))
        .and_then(|_| Read::by_ref(&mut file).take(length).read_to_end(&mut out))
        .map_err(|e| Error::Io(e, path.to_path_buf()))?;

    tracing::trace!(
        path = %path.display(),
        position,
        requested = length,
        read = out.len(),
        "read_at"
    );
    Ok(out)
}

/// Writes `bytes` at `position`, creating the file and its parent directories
/// as needed.
///
/// Bytes outside the written span are left untouched. Writing past the end
/// extends the file, and the gap reads back as zeroes.
pub fn write_at<P: AsRef<Path>>(path: P, position: u64, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Io(e, parent.to_path_buf()))?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::Io(e, path.to_path_buf()))?;

    file.seek(SeekFrom::Start(position))
        .and_then(|_| file.write_all(bytes))
        .and_then(|_| file.flush())
        .map_err(|e| Error::Io(e, path.to_path_buf()))?;

    tracing::trace!(path = %path.display(), position, written = bytes.len(), "write_at");
    Ok(())
}

/// [`read_at`], decoding the bytes as UTF-8. Invalid sequences become U+FFFD.
pub fn read_text_at<P: AsRef<Path>>(path: P, position: u64, length: u64) -> Result<String> {
    let bytes = read_at(path, position, length)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// [`write_at`] with the UTF-8 bytes of `text`.
pub fn write_text_at<P: AsRef<Path>>(path: P, position: u64, text: &str) -> Result<()> {
    write_at(path, position, text.as_bytes())
}
