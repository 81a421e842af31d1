//! Error types for the re-packing pipeline
//!
//! Every stage reports failures through [`Error`]. Callers that only care
//! about which stage failed can match on [`Error::kind`].

use std::{fmt, io, path::PathBuf};

use thiserror::Error;
use zip::result::ZipError;

/// All failures a single wheel can hit while being re-packed.
#[derive(Debug, Error)]
pub enum Error {
    /// The working directory for this wheel is already present on disk
    #[error("working directory `{}` already exists", path.display())]
    WorkDirExists { path: PathBuf },

    /// The wheel could not be opened or unpacked
    #[error("cannot extract `{}`: {source}", archive.display())]
    Extract {
        archive: PathBuf,
        #[source]
        source: ZipError,
    },

    /// Removing stale bytecode or fixing script permissions failed
    #[error("cannot sanitize `{}`: {source}", path.display())]
    Sanitize {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The Python runtime could not be launched
    #[error("cannot run `{}`: {source}", python.display())]
    CompilerUnavailable {
        python: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The Python runtime ran but did not report a usable version
    #[error("cannot determine interpreter tag from `{}`: {detail}", python.display())]
    InterpreterProbe { python: PathBuf, detail: String },

    /// A source file could not be removed after compilation
    #[error("cannot remove source `{}`: {source}", path.display())]
    SourceRemoval {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The wheel filename does not follow `<name>-<version>-<tags>.<ext>`
    #[error("invalid wheel filename `{file_name}`: {reason}")]
    Naming {
        file_name: String,
        reason: &'static str,
    },

    /// The output wheel could not be written
    #[error("cannot write `{}`: {source}", path.display())]
    Pack {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

/// Result type for re-packing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The pipeline stage an [`Error`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Extraction,
    Compilation,
    Naming,
    Pack,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::WorkDirExists { .. } | Self::Extract { .. } | Self::Sanitize { .. } => {
                ErrorKind::Extraction
            }
            Self::CompilerUnavailable { .. }
            | Self::InterpreterProbe { .. }
            | Self::SourceRemoval { .. } => ErrorKind::Compilation,
            Self::Naming { .. } => ErrorKind::Naming,
            Self::Pack { .. } => ErrorKind::Pack,
        }
    }

    pub(crate) fn pack(path: impl Into<PathBuf>, source: impl Into<ZipError>) -> Self {
        Self::Pack {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction => write!(f, "extraction"),
            Self::Compilation => write!(f, "compilation"),
            Self::Naming => write!(f, "naming"),
            Self::Pack => write!(f, "pack"),
        }
    }
}
