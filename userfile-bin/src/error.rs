use std::path::PathBuf;

use userfile_format::figment;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Cannot load settings")]
    Settings {
        #[source]
        source: figment::Error,
    },

    #[error("Cannot prepare directories under `{}`", .path.display())]
    PrepareDirectories {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot tell the format of `{}` (expected .csv, .json or .xml)", .path.display())]
    UnknownFormat { path: PathBuf },

    #[error("Cannot read users from `{}`", .path.display())]
    ReadUsers {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot write users to `{}`", .path.display())]
    WriteUsers {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot read bytes from `{}`", .path.display())]
    ReadAt {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot write bytes to `{}`", .path.display())]
    WriteAt {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot transcode `{}` to `{}`", .path.display(), .target.display())]
    Transcode {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot reformat `{}`", .path.display())]
    Reformat {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot inspect `{}`", .path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: userfile_format::Error,
    },

    #[error("Cannot render users as JSON")]
    Render {
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot write to standard output")]
    Stdout {
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Coarse kind of the underlying library failure, if there is one.
    pub fn kind(&self) -> Option<userfile_format::ErrorKind> {
        match self {
            Error::PrepareDirectories { source, .. }
            | Error::ReadUsers { source, .. }
            | Error::WriteUsers { source, .. }
            | Error::ReadAt { source, .. }
            | Error::WriteAt { source, .. }
            | Error::Transcode { source, .. }
            | Error::Reformat { source, .. }
            | Error::Inspect { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}
