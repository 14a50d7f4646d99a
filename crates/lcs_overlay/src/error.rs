//! Error types for overlay operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, `binrw::Error`,
//! `walkdir::Error`, temp-file persistence and MessagePack state errors) are converted via `From` impls.
//!
//! Shortcut and game directory resolution use their own
//! [`ResolutionFailure`](crate::shortcut::ResolutionFailure) type instead, since
//! those failures are an expected outcome rather than an I/O fault.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, indexing or writing overlay archives.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (reading WADs, hashing mod files, writing overlay, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory walk failed part way (permission denied, vanished entry).
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A finished temporary archive could not be moved over its destination.
    #[error("Failed to persist archive: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Low level decode/encode failure for a header or TOC record.
    #[error("Binary format error: {0}")]
    Binary(#[from] binrw::Error),

    /// The WAD header has the wrong magic or an unsupported version.
    #[error("Invalid WAD '{path}': {reason}")]
    Format { path: Utf8PathBuf, reason: String },

    /// Keys of a merged TOC are not strictly ascending.
    ///
    /// Unreachable with well-formed inputs, since both sides of a merge are keyed maps.
    #[error("TOC of '{path}' is not strictly ascending at key {key:016x}")]
    Invariant { path: Utf8PathBuf, key: u64 },

    /// An entry offset or size does not fit the 32-bit signed TOC field.
    #[error("Value {value} for entry {key:016x} does not fit a 32-bit TOC field")]
    OffsetOverflow { key: u64, value: i64 },

    /// A mod file was modified between indexing and writing.
    #[error("Mod file '{path}' changed size: indexed {expected} bytes, copied {actual}")]
    SizeMismatch {
        path: Utf8PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The base archive is shorter than the data section recorded when it was read.
    #[error("Base WAD '{path}' is truncated: expected {expected} data bytes, copied {actual}")]
    TruncatedSource {
        path: Utf8PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The engine state could not be encoded for saving.
    #[error("Failed to encode engine state: {0}")]
    StateEncode(#[from] rmp_serde::encode::Error),

    /// A saved engine state could not be decoded.
    #[error("Failed to decode engine state: {0}")]
    StateDecode(#[from] rmp_serde::decode::Error),

    /// The game directory does not contain the expected `DATA/FINAL` structure.
    #[error("Invalid game directory: {0}")]
    InvalidGameDir(String),

    /// Catch-all for errors without a dedicated variant.
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
