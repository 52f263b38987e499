use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error at {path}: {reason}", path = .path.display())]
    Io { path: PathBuf, reason: String },
    #[error("write to {path} not accepted: wrote {expected:?}, read back {found:?}", path = .path.display())]
    VerifyMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("bad format at {path}: {reason}", path = .path.display())]
    Format { path: PathBuf, reason: String },
    #[error("allocation failed: {0}")]
    Alloc(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    pub(crate) fn io(path: &Path, err: impl core::fmt::Display) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn format(path: &Path, reason: impl core::fmt::Display) -> Self {
        Error::Format {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// True for the I/O class of failures, including verify mismatches.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. } | Error::VerifyMismatch { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format { .. })
    }
}

/// Failure to parse a scan-element layout string such as `le:s12/16>>4`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("missing ':' after endianness")]
    MissingColon,
    #[error("unknown endianness {0:?} (expected \"be\" or \"le\")")]
    Endianness(String),
    #[error("unknown sign {0:?} (expected 's' or 'u')")]
    Sign(String),
    #[error("missing '/' between used and storage bits")]
    MissingSlash,
    #[error("invalid number {0:?}")]
    Number(String),
    #[error("trailing input {0:?}")]
    Trailing(String),
    #[error("used bits must be in 1..=64, got {0}")]
    BitsUsed(u32),
    #[error("storage bits {0} is not a positive multiple of 8")]
    StorageBits(u32),
    #[error("used bits {used} exceed storage bits {storage}")]
    Overflow { used: u32, storage: u32 },
}
