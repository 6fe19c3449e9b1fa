//! Line by line re-encoding of text files between character sets.
//!
//! Charset names are WHATWG labels as understood by `encoding_rs`, so for
//! example `latin1` and `ISO-8859-1` both resolve to windows-1252. Bytes the
//! source charset cannot decode become U+FFFD; characters the target charset
//! cannot represent are written as `?`.
//!
//! Line breaks in the source may be `\n`, `\r\n` or a lone `\r`; every line
//! is written with a `\n` terminator.

use std::fs::File;
use std::io::{prelude::*, BufReader, BufWriter};
use std::path::Path;

use encoding_rs::{CoderResult, Encoding, EncoderResult, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};

use crate::error::{Error, Result};

/// Written in place of characters the target charset has no mapping for.
pub const SUBSTITUTE: u8 = b'?';

const CHUNK: usize = 8 * 1024;

/// Resolves a charset name, rejecting labels that only exist to block
/// decoding (such as `iso-2022-kr`).
pub fn lookup(label: &str) -> Result<&'static Encoding> {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) if encoding != REPLACEMENT => Ok(encoding),
        _ => Err(Error::Encoding(label.to_string())),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    pub lines: usize,
    /// Characters replaced by [`SUBSTITUTE`].
    pub substitutions: usize,
}

/// Writes text into a byte buffer in the target charset.
enum LineEncoder {
    Utf8,
    Utf16 { big_endian: bool },
    Other(encoding_rs::Encoder),
}

impl LineEncoder {
    fn new(encoding: &'static Encoding) -> LineEncoder {
        if encoding == UTF_8 {
            LineEncoder::Utf8
        } else if encoding == UTF_16LE || encoding == UTF_16BE {
            // encoding_rs only decodes UTF-16, so those targets are encoded here.
            LineEncoder::Utf16 {
                big_endian: encoding == UTF_16BE,
            }
        } else {
            LineEncoder::Other(encoding.new_encoder())
        }
    }

    /// Appends `text` to `out`, returning the number of substituted characters.
    fn encode(&mut self, text: &str, out: &mut Vec<u8>, last: bool) -> usize {
        match self {
            LineEncoder::Utf8 => {
                out.extend_from_slice(text.as_bytes());
                0
            }
            LineEncoder::Utf16 { big_endian } => {
                for unit in text.encode_utf16() {
                    let bytes = if *big_endian {
                        unit.to_be_bytes()
                    } else {
                        unit.to_le_bytes()
                    };
                    out.extend_from_slice(&bytes);
                }
                0
            }
            LineEncoder::Other(encoder) => {
                let mut substitutions = 0;
                let mut src = text;
                loop {
                    if let Some(needed) =
                        encoder.max_buffer_length_from_utf8_without_replacement(src.len())
                    {
                        out.reserve(needed);
                    }
                    let (result, read) =
                        encoder.encode_from_utf8_to_vec_without_replacement(src, out, last);
                    src = &src[read..];
                    match result {
                        EncoderResult::InputEmpty => break,
                        EncoderResult::OutputFull => {}
                        EncoderResult::Unmappable(c) => {
                            tracing::trace!(character = %c, "unmappable character substituted");
                            out.push(SUBSTITUTE);
                            substitutions += 1;
                        }
                    }
                }
                substitutions
            }
        }
    }
}

/// Finds the first line break in `text`, returning where the line ends and
/// where the next one starts. A trailing `\r` is not a break until `last`,
/// since the `\n` of a `\r\n` pair may still be in the next chunk.
fn line_break(text: &str, last: bool) -> Option<(usize, usize)> {
    let end = text.find(|c: char| c == '\r' || c == '\n')?;
    match &text.as_bytes()[end..] {
        [b'\r', b'\n', ..] => Some((end, end + 2)),
        [b'\r'] if !last => None,
        _ => Some((end, end + 1)),
    }
}

/// Re-encodes `source` from `source_charset` into `target` as `target_charset`.
///
/// Lines may end in `\n`, `\r\n` or `\r` in the source; every line is written
/// with a `\n` terminator. Order and count of lines are preserved. The target
/// is staged next to its final path and only replaced once fully written.
pub fn transcode<S, T>(
    source: S,
    target: T,
    source_charset: &str,
    target_charset: &str,
) -> Result<TranscodeStats>
where
    S: AsRef<Path>,
    T: AsRef<Path>,
{
    let (source, target) = (source.as_ref(), target.as_ref());
    let from = lookup(source_charset)?;
    let to = lookup(target_charset)?;

    let input = File::open(source).map_err(|e| Error::io(e, source))?;
    let mut input = BufReader::new(input);

    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;
    let staged =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;

    let mut decoder = from.new_decoder_with_bom_removal();
    let mut encoder = LineEncoder::new(to);
    let mut stats = TranscodeStats::default();
    let mut pending = String::new();
    let mut encoded = Vec::with_capacity(CHUNK);
    let mut buf = vec![0u8; CHUNK];

    {
        let mut output = BufWriter::new(staged.as_file());
        let mut write_line = |line: &str, encoded: &mut Vec<u8>, stats: &mut TranscodeStats| {
            encoded.clear();
            stats.substitutions += encoder.encode(line, encoded, false);
            stats.substitutions += encoder.encode("\n", encoded, false);
            stats.lines += 1;
            output.write_all(encoded)
        };

        loop {
            let read = input
                .read(&mut buf)
                .map_err(|e| Error::Io(e, source.to_path_buf()))?;
            let last = read == 0;

            let mut chunk = &buf[..read];
            loop {
                if let Some(needed) = decoder.max_utf8_buffer_length(chunk.len()) {
                    pending.reserve(needed);
                }
                let (result, consumed, _) = decoder.decode_to_string(chunk, &mut pending, last);
                chunk = &chunk[consumed..];
                if result == CoderResult::InputEmpty {
                    break;
                }
            }

            while let Some((end, next)) = line_break(&pending, last) {
                write_line(&pending[..end], &mut encoded, &mut stats)
                    .map_err(|e| Error::Io(e, target.to_path_buf()))?;
                pending.drain(..next);
            }

            if last {
                if !pending.is_empty() {
                    write_line(&pending, &mut encoded, &mut stats)
                        .map_err(|e| Error::Io(e, target.to_path_buf()))?;
                }
                break;
            }
        }

        // Flush any shift state of stateful encodings such as ISO-2022-JP.
        encoded.clear();
        encoder.encode("", &mut encoded, true);
        output
            .write_all(&encoded)
            .and_then(|_| output.flush())
            .map_err(|e| Error::Io(e, target.to_path_buf()))?;
    }

    staged
        .persist(target)
        .map_err(|e| Error::Io(e.error, target.to_path_buf()))?;

    if stats.substitutions > 0 {
        tracing::warn!(
            target = %target.display(),
            charset = to.name(),
            count = stats.substitutions,
            "characters not representable in target charset were substituted"
        );
    }
    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        from = from.name(),
        to = to.name(),
        lines = stats.lines,
        "transcoded"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn lookup_accepts_common_labels() {
        assert_eq!(lookup("UTF-8").unwrap(), UTF_8);
        assert_eq!(lookup("utf-16le").unwrap(), UTF_16LE);
        assert_eq!(lookup("ISO-8859-1").unwrap().name(), "windows-1252");
    }

    #[test]
    fn lookup_rejects_unknown_labels() {
        assert_eq!(lookup("klingon").unwrap_err().kind(), ErrorKind::Encoding);
        assert_eq!(lookup("iso-2022-kr").unwrap_err().kind(), ErrorKind::Encoding);
    }

    #[test]
    fn latin1_to_utf8() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("latin1.txt");
        let target = dir.path().join("out").join("utf8.txt");
        // "Año\r\ncafé" in windows-1252
        std::fs::write(&source, b"A\xf1o\r\ncaf\xe9").unwrap();

        let stats = transcode(&source, &target, "ISO-8859-1", "UTF-8").unwrap();
        assert_eq!(stats.lines, 2);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "Año\ncafé\n");
    }

    #[test]
    fn every_line_break_style_is_recognized() {
        assert_eq!(line_break("a\nb", false), Some((1, 2)));
        assert_eq!(line_break("a\r\nb", false), Some((1, 3)));
        assert_eq!(line_break("a\rb", false), Some((1, 2)));
        assert_eq!(line_break("a\r", false), None);
        assert_eq!(line_break("a\r", true), Some((1, 2)));
        assert_eq!(line_break("abc", true), None);

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("mixed.txt");
        let target = dir.path().join("unix.txt");
        std::fs::write(&source, "a\rb\r\nc\n\rd\r").unwrap();

        let stats = transcode(&source, &target, "utf-8", "utf-8").unwrap();
        assert_eq!(stats.lines, 5);
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "a\nb\nc\n\nd\n");
    }

    #[test]
    fn unmappable_characters_become_question_marks() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("utf8.txt");
        let target = dir.path().join("latin1.txt");
        std::fs::write(&source, "naïve → 東京\n\nend\n").unwrap();

        let stats = transcode(&source, &target, "utf-8", "latin1").unwrap();
        assert_eq!(stats.lines, 3);
        assert_eq!(stats.substitutions, 3);
        assert_eq!(std::fs::read(&target).unwrap(), b"na\xefve ? ??\n\nend\n");
    }

    #[test]
    fn utf16_targets_are_encoded() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("in.txt");
        let target = dir.path().join("out.txt");
        std::fs::write(&source, "hé").unwrap();

        transcode(&source, &target, "utf-8", "utf-16be").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), vec![0, b'h', 0, 0xe9, 0, b'\n']);
    }

    #[test]
    fn missing_source_and_bad_charset() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.txt");
        let err = transcode(dir.path().join("none.txt"), &target, "utf-8", "latin1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        std::fs::write(dir.path().join("in.txt"), "x").unwrap();
        let err = transcode(dir.path().join("in.txt"), &target, "utf-8", "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(!target.exists());
    }
}
