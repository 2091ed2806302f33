//! Error types for decoding and logging.
//!
//! Errors fall into two groups. Frame and record problems ([`Error::InvalidFrame`],
//! [`Error::MalformedRecord`]) concern a single input and are recovered by
//! dropping that input. Filesystem problems are fatal to the writer that hit
//! them and are surfaced to the caller without retry, since blocking on disk
//! I/O stalls live bus ingestion.
//!
//! ```rust
//! use n2k_logger::{Error, FrameRejection};
//!
//! let error = Error::InvalidFrame(FrameRejection::StandardId);
//! assert!(!error.is_fatal());
//! assert!(Error::WriterClosed.is_fatal());
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a CAN frame is not a valid NMEA 2000 physical frame.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    #[error("standard (11-bit) identifier, NMEA 2000 always uses 29-bit identifiers")]
    StandardId,

    #[error("remote transmission request frame")]
    RemoteFrame,

    #[error("declared length {dlc} exceeds 8 bytes")]
    DlcOutOfRange { dlc: u8 },

    #[error("declared length {dlc} does not match payload length {len}")]
    DlcMismatch { dlc: u8, len: usize },

    #[error("payload of {len} bytes exceeds 8 bytes")]
    PayloadTooLong { len: usize },
}

/// Main error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid NMEA 2000 frame: {0}")]
    InvalidFrame(#[from] FrameRejection),

    #[error("cannot open log file {path}")]
    CannotOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot rotate log file {path} to {destination}")]
    CannotRotate {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("log writer has been stopped")]
    WriterClosed,

    #[error("malformed log record: {reason}")]
    MalformedRecord { reason: String },

    #[error("no log writer for file suffix {suffix:?}")]
    UnsupportedFormat { suffix: String },

    #[error("invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Returns whether this error ends the writer or ingestion loop that hit
    /// it. Non-fatal errors concern a single frame or line, which is dropped.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::InvalidFrame(_) => false,
            Error::MalformedRecord { .. } => false,
            Error::CannotOpen { .. } => true,
            Error::CannotRotate { .. } => true,
            Error::Io { .. } => true,
            Error::WriterClosed => true,
            Error::UnsupportedFormat { .. } => true,
            Error::Config { .. } => true,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedRecord { reason: reason.into() }
    }

    pub(crate) fn config(
        reason: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Config { reason: reason.into(), source: Some(source.into()) }
    }
}
