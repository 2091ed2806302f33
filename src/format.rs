use std::ffi::OsStr;
use std::path::Path;

use crate::record::LogRecord;
use crate::{Clock, DecodedFrame, Error, RawFrame, Result, RotatingLogWriter, SystemClock, WriterConfig};

/// The log formats this crate can write, selected by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// canboat plain text, `.n2k`.
    N2k,
}

impl LogFormat {
    /// Pick the format for `path` from its (case-insensitive) suffix.
    pub fn from_path(path: &Path) -> Result<Self> {
        let suffix = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match suffix.as_str() {
            "n2k" => Ok(Self::N2k),
            _ => Err(Error::UnsupportedFormat { suffix }),
        }
    }

    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::N2k => ".n2k",
        }
    }
}

/// A log writer of one of the supported [`LogFormat`]s.
pub enum LogWriter<C = SystemClock> {
    N2k(RotatingLogWriter<C>),
}

impl LogWriter<SystemClock> {
    pub fn create(config: &WriterConfig) -> Result<Self> {
        Self::create_with_clock(config, SystemClock)
    }
}

impl<C: Clock> LogWriter<C> {
    pub fn create_with_clock(config: &WriterConfig, clock: C) -> Result<Self> {
        match LogFormat::from_path(&config.base_path)? {
            LogFormat::N2k => Ok(Self::N2k(RotatingLogWriter::open_with_clock(config, clock)?)),
        }
    }

    #[must_use]
    pub fn format(&self) -> LogFormat {
        match self {
            Self::N2k(_) => LogFormat::N2k,
        }
    }

    /// Decode, format and write one frame. Invalid frames fail with
    /// [`Error::InvalidFrame`] and leave the file untouched.
    pub fn log(&mut self, frame: &RawFrame) -> Result<()> {
        match self {
            Self::N2k(writer) => {
                let decoded = DecodedFrame::decode(frame)?;
                writer.write(&LogRecord::format(&decoded))
            }
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        match self {
            Self::N2k(writer) => writer.stop(),
        }
    }
}
