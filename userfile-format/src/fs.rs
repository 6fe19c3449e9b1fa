//! Filesystem helpers around the user data directories.

use std::fmt;
use std::fs::Metadata;
use std::io::{prelude::*, BufReader};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::codec::Format;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => f.write_str("file"),
            FileKind::Directory => f.write_str("directory"),
        }
    }
}

/// Owner read, write and execute flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl Permissions {
    #[cfg(unix)]
    fn from_metadata(meta: &Metadata) -> Permissions {
        use std::os::unix::fs::PermissionsExt;

        let mode = meta.permissions().mode();
        Permissions {
            read: mode & 0o400 != 0,
            write: mode & 0o200 != 0,
            execute: mode & 0o100 != 0,
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(meta: &Metadata) -> Permissions {
        Permissions {
            read: true,
            write: !meta.permissions().readonly(),
            execute: meta.is_dir(),
        }
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            flag(self.read, 'r'),
            flag(self.write, 'w'),
            flag(self.execute, 'x')
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub kind: FileKind,
    /// Length in bytes; `None` for directories.
    pub size: Option<u64>,
    pub permissions: Permissions,
    pub modified: DateTime<Local>,
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type: {}, ", self.kind)?;
        match self.size {
            Some(size) => write!(f, "Size: {} bytes, ", size)?,
            None => f.write_str("Size: -, ")?,
        }
        write!(
            f,
            "Permissions: {}, Modified: {}",
            self.permissions,
            self.modified.format("%d/%m/%Y %H:%M:%S")
        )
    }
}

pub fn file_info<P: AsRef<Path>>(path: P) -> Result<FileInfo> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|e| Error::io(e, path))?;
    let modified = meta.modified().map_err(|e| Error::Io(e, path.to_path_buf()))?;

    let kind = if meta.is_dir() {
        FileKind::Directory
    } else {
        FileKind::File
    };
    Ok(FileInfo {
        kind,
        size: match kind {
            FileKind::File => Some(meta.len()),
            FileKind::Directory => None,
        },
        permissions: Permissions::from_metadata(&meta),
        modified: DateTime::<Local>::from(modified),
    })
}

/// Lines of a text file containing a search string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextMatches {
    /// 1-based line numbers, ascending.
    pub lines: Vec<usize>,
    /// Total occurrences, counting repeats on one line.
    pub occurrences: usize,
}

impl TextMatches {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Case-sensitive search of `path` for `needle`, line by line. Invalid UTF-8
/// is read lossily.
pub fn search_text<P: AsRef<Path>>(path: P, needle: &str) -> Result<TextMatches> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::io(e, path))?;
    let mut reader = BufReader::new(file);

    let mut matches = TextMatches::default();
    if needle.is_empty() {
        return Ok(matches);
    }

    let mut buf = vec![];
    let mut number = 0;
    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| Error::Io(e, path.to_path_buf()))?;
        if read == 0 {
            break;
        }
        number += 1;

        let line = String::from_utf8_lossy(&buf);
        let count = line.matches(needle).count();
        if count > 0 {
            matches.lines.push(number);
            matches.occurrences += count;
        }
    }

    tracing::debug!(path = %path.display(), needle, lines = matches.lines.len(), "searched");
    Ok(matches)
}

/// Time taken by one read strategy and the lines it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTiming {
    pub elapsed: Duration,
    pub lines: usize,
}

impl fmt::Display for ReadTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}ms, {} lines", self.elapsed.as_secs_f64() * 1000.0, self.lines)
    }
}

/// The same file read three ways. All strategies agree on the line count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadComparison {
    /// One `read` call per byte on the raw file.
    pub unbuffered: ReadTiming,
    /// Line by line through a `BufReader`.
    pub buffered: ReadTiming,
    /// Whole file in one read, then split into lines.
    pub whole_file: ReadTiming,
}

impl ReadComparison {
    /// How much less time the buffered read took than the unbuffered one, in
    /// percent. Zero when the unbuffered read was too fast to measure.
    pub fn buffered_speedup(&self) -> f64 {
        let unbuffered = self.unbuffered.elapsed.as_secs_f64();
        if unbuffered == 0.0 {
            return 0.0;
        }
        (1.0 - self.buffered.elapsed.as_secs_f64() / unbuffered) * 100.0
    }
}

impl fmt::Display for ReadComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Unbuffered: {}", self.unbuffered)?;
        writeln!(f, "Buffered: {}", self.buffered)?;
        writeln!(f, "Whole file: {}", self.whole_file)?;
        write!(f, "Buffered speedup: {:.1}%", self.buffered_speedup())
    }
}

fn timed<F>(read: F) -> std::io::Result<ReadTiming>
where
    F: FnOnce() -> std::io::Result<usize>,
{
    let start = Instant::now();
    let lines = read()?;
    Ok(ReadTiming {
        elapsed: start.elapsed(),
        lines,
    })
}

/// Reads `path` unbuffered, buffered and whole, timing each and counting
/// lines. A final line without a terminator still counts.
pub fn compare_read_strategies<P: AsRef<Path>>(path: P) -> Result<ReadComparison> {
    let path = path.as_ref();
    let open = || std::fs::File::open(path).map_err(|e| Error::io(e, path));
    let failed = |e: std::io::Error| Error::Io(e, path.to_path_buf());

    let file = open()?;
    let unbuffered = timed(|| {
        let (mut lines, mut last) = (0, None);
        for byte in file.bytes() {
            let byte = byte?;
            if byte == b'\n' {
                lines += 1;
            }
            last = Some(byte);
        }
        Ok(match last {
            Some(byte) if byte != b'\n' => lines + 1,
            _ => lines,
        })
    })
    .map_err(failed)?;

    let file = open()?;
    let buffered = timed(|| {
        BufReader::new(file)
            .split(b'\n')
            .try_fold(0, |lines, line| line.map(|_| lines + 1))
    })
    .map_err(failed)?;

    let whole_file = timed(|| {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).lines().count())
    })
    .map_err(failed)?;

    let comparison = ReadComparison {
        unbuffered,
        buffered,
        whole_file,
    };
    tracing::debug!(
        path = %path.display(),
        lines = comparison.buffered.lines,
        unbuffered = ?comparison.unbuffered.elapsed,
        buffered = ?comparison.buffered.elapsed,
        whole_file = ?comparison.whole_file.elapsed,
        "compared read strategies"
    );
    Ok(comparison)
}

/// Names of the CSV, JSON and XML files directly inside `dir`, sorted.
pub fn list_user_files<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(e, dir))?;

    let mut names = vec![];
    for entry in entries {
        let entry = entry.map_err(|e| Error::Io(e, dir.to_path_buf()))?;
        let path = entry.path();
        let is_file = entry
            .file_type()
            .map_err(|e| Error::Io(e, path.clone()))?
            .is_file();
        if !is_file || Format::from_path(&path).is_none() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// The working directories under a base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    pub base: PathBuf,
    pub data: PathBuf,
    pub exports: PathBuf,
    pub temp: PathBuf,
    /// Directories that did not exist and were created.
    pub created: Vec<PathBuf>,
}

impl DirectoryLayout {
    pub const SUBDIRECTORIES: [&'static str; 3] = ["data", "exports", "temp"];

    pub fn new<P: Into<PathBuf>>(base: P) -> DirectoryLayout {
        let base = base.into();
        DirectoryLayout {
            data: base.join("data"),
            exports: base.join("exports"),
            temp: base.join("temp"),
            base,
            created: vec![],
        }
    }

    pub fn directories(&self) -> [&Path; 3] {
        [&self.data, &self.exports, &self.temp]
    }
}

/// Makes sure `base/data`, `base/exports` and `base/temp` exist and are
/// writable, creating the missing ones.
pub fn validate_directory_structure<P: AsRef<Path>>(base: P) -> Result<DirectoryLayout> {
    let mut layout = DirectoryLayout::new(base.as_ref());
    let mut created = vec![];

    for dir in layout.directories() {
        if !dir.is_dir() {
            std::fs::create_dir_all(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;
            tracing::info!(path = %dir.display(), "created directory");
            created.push(dir.to_path_buf());
        }

        // Probe with a real file, since permission bits do not account for
        // ACLs or read-only mounts.
        tempfile::tempfile_in(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;
    }

    layout.created = created;
    Ok(layout)
}

/// Creates `dir/<prefix>XXXXXX.tmp` holding `content` and keeps it on disk.
pub fn create_temp_file<D: AsRef<Path>>(dir: D, prefix: &str, content: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir).map_err(|e| Error::Io(e, dir.to_path_buf()))?;

    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::Io(e, dir.to_path_buf()))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| Error::Io(e, file.path().to_path_buf()))?;

    let (_, path) = file.keep().map_err(|e| Error::Io(e.error, dir.to_path_buf()))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "created temp file");
    Ok(path)
}
