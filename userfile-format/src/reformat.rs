//! Whitespace and capitalization cleanup for plain text files.

use std::fs::File;
use std::io::{prelude::*, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Per-line state of the reformatter.
///
/// Leading spaces are dropped, runs of spaces collapse to one, and the first
/// emitted character of the line is upper-cased if it is alphabetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineFormatter {
    at_line_start: bool,
    in_space_run: bool,
    capitalize_next: bool,
}

impl Default for LineFormatter {
    fn default() -> Self {
        LineFormatter {
            at_line_start: true,
            in_space_run: false,
            capitalize_next: true,
        }
    }
}

impl LineFormatter {
    pub fn new() -> LineFormatter {
        LineFormatter::default()
    }

    /// Feeds one character, appending whatever it produces to `out`.
    pub fn push(&mut self, c: char, out: &mut String) {
        if c == ' ' && (self.at_line_start || self.in_space_run) {
            return;
        }

        if self.capitalize_next && c.is_alphabetic() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        self.capitalize_next = false;
        if c != ' ' {
            self.at_line_start = false;
        }
        self.in_space_run = c == ' ';
    }

    pub fn format_line(line: &str) -> String {
        let mut state = LineFormatter::new();
        let mut out = String::with_capacity(line.len());
        for c in line.chars() {
            state.push(c, &mut out);
        }
        out
    }
}

/// Reformats every line of `text`. Line breaks are kept; `\r\n` becomes `\n`.
pub fn reformat(text: &str) -> String {
    text.split('\n')
        .map(|line| LineFormatter::format_line(line.strip_suffix('\r').unwrap_or(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reformats `source` into a new file in the system temporary directory and
/// returns its path. The file is kept after this call returns.
pub fn reformat_file<P: AsRef<Path>>(source: P) -> Result<PathBuf> {
    reformat_file_in(source, std::env::temp_dir())
}

/// As [`reformat_file`], placing the output in `dir`.
pub fn reformat_file_in<P, D>(source: P, dir: D) -> Result<PathBuf>
where
    P: AsRef<Path>,
    D: AsRef<Path>,
{
    let (source, dir) = (source.as_ref(), dir.as_ref());
    let input = File::open(source).map_err(|e| Error::io(e, source))?;

    std::fs::create_dir_all(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;
    let output = tempfile::Builder::new()
        .prefix("formatted_")
        .suffix(".txt")
        .tempfile_in(dir)
        .map_err(|e| Error::Io(e, dir.to_path_buf()))?;

    let mut lines = 0usize;
    {
        let mut writer = BufWriter::new(output.as_file());
        for line in BufReader::new(input).lines() {
            let line = line.map_err(|e| Error::Io(e, source.to_path_buf()))?;
            writer
                .write_all(LineFormatter::format_line(&line).as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(|e| Error::Io(e, output.path().to_path_buf()))?;
            lines += 1;
        }
        writer
            .flush()
            .map_err(|e| Error::Io(e, output.path().to_path_buf()))?;
    }

    let (_, path) = output
        .keep()
        .map_err(|e| Error::Io(e.error, dir.to_path_buf()))?;
    tracing::debug!(source = %source.display(), output = %path.display(), lines, "reformatted");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn collapses_and_capitalizes() {
        assert_eq!(LineFormatter::format_line("   hello   world"), "Hello world");
        assert_eq!(LineFormatter::format_line("already Fine"), "Already Fine");
        assert_eq!(LineFormatter::format_line("trailing  "), "Trailing ");
        assert_eq!(LineFormatter::format_line("     "), "");
    }

    #[test]
    fn only_the_first_emitted_character_is_capitalized() {
        assert_eq!(LineFormatter::format_line("  1st place"), "1st place");
        assert_eq!(LineFormatter::format_line("\tword"), "\tword");
        assert_eq!(LineFormatter::format_line("émile"), "Émile");
    }

    #[test]
    fn state_resets_per_line() {
        assert_eq!(reformat("  one  two\r\n three\n"), "One two\nThree\n");
    }

    #[test]
    fn reformat_file_writes_new_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, "  first   line\nsecond\n").unwrap();

        let out = reformat_file_in(&source, dir.path().join("tmp")).unwrap();
        assert!(out.starts_with(dir.path().join("tmp")));
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "First line\nSecond\n");
        assert_eq!(
            std::fs::read_to_string(&source).unwrap(),
            "  first   line\nsecond\n"
        );
    }

    #[test]
    fn missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = reformat_file_in(dir.path().join("nope.txt"), dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
