use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::mem;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn, Span};

use super::naming::rotated_path;
use super::policy::{FileStats, RotationPolicy};
use crate::record::LogRecord;
use crate::{Clock, Error, Result, SystemClock, WriterConfig};

/// When appended records are pushed towards the disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Only on rotation and stop.
    Buffered,
    /// Hand every record to the operating system as soon as it is appended.
    #[default]
    Flush,
    /// Like [`Durability::Flush`], then wait for the data to reach storage.
    Sync,
}

/// The open file and what the rotation policy needs to know about it.
struct ActiveFile {
    out: BufWriter<File>,
    records: u64,
}

impl ActiveFile {
    /// Opens `path`. A truncated file, or an appended one that turns out to
    /// be empty, starts with the header.
    fn open(path: &Path, append: bool) -> io::Result<Self> {
        let mut file = if append {
            OpenOptions::new().create(true).append(true).open(path)?
        } else {
            File::create(path)?
        };

        // position of an O_APPEND handle only moves on the first write
        let len = file.seek(SeekFrom::End(0))?;

        let mut out = BufWriter::new(file);
        if len == 0 {
            out.write_all(LogRecord::header().as_bytes())?;
            out.flush()?;
        }

        Ok(Self { out, records: 0 })
    }

    /// Size of the file including bytes still buffered.
    fn len(&self) -> io::Result<u64> {
        let mut file = self.out.get_ref();
        Ok(file.stream_position()? + self.out.buffer().len() as u64)
    }

    fn stats(&self) -> io::Result<FileStats> {
        Ok(FileStats {
            bytes: self.len()?,
            records: self.records,
        })
    }

    fn append(&mut self, record: &LogRecord, durability: Durability) -> io::Result<()> {
        self.out.write_all(record.as_bytes())?;
        self.records += 1;

        match durability {
            Durability::Buffered => {}
            Durability::Flush => self.out.flush()?,
            Durability::Sync => {
                self.out.flush()?;
                self.out.get_ref().sync_data()?;
            }
        }
        Ok(())
    }

    /// Flushes, syncs and closes the file. Once this returns, the file is
    /// complete for any reader.
    fn close(self) -> io::Result<()> {
        let file = self.out.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()
    }
}

enum State {
    Open(ActiveFile),
    Closed,
}

/// A line oriented log file that is rotated according to a [`RotationPolicy`].
///
/// Records always go to the base path. On rotation the base file is closed
/// and renamed to `{stem}_{time}_#{count}{suffix}` (see
/// [`rotated_path`](super::naming::rotated_path)) and a fresh base file is
/// started. The file that is active when the writer stops keeps the base name.
///
/// Every mutating operation takes `&mut self`, so "check policy, rotate,
/// append" is one critical section. Failures are reported, never retried;
/// after a failed rotation the writer is closed.
pub struct RotatingLogWriter<C = SystemClock> {
    base_path: PathBuf,
    policy: RotationPolicy,
    durability: Durability,
    clock: C,
    state: State,
    rollover_count: u32,
    span: Span,
}

impl RotatingLogWriter<SystemClock> {
    pub fn open(config: &WriterConfig) -> Result<Self> {
        Self::open_with_clock(config, SystemClock)
    }
}

impl<C: Clock> RotatingLogWriter<C> {
    /// Opens the base file using `clock` for rotation names.
    pub fn open_with_clock(config: &WriterConfig, clock: C) -> Result<Self> {
        let span = tracing::info_span!("n2k_writer", path = %config.base_path.display());
        Self::open_in_span(config, clock, span)
    }

    /// Like [`Self::open_with_clock`], emitting all events under `span`.
    pub fn open_in_span(config: &WriterConfig, clock: C, span: Span) -> Result<Self> {
        let base_path = config.base_path.clone();
        let active = ActiveFile::open(&base_path, config.append).map_err(|source| Error::CannotOpen {
            path: base_path.clone(),
            source,
        })?;

        let policy = config.rotation_policy();
        info!(parent: &span, ?policy, append = config.append, "opened log file");

        Ok(Self {
            base_path,
            policy,
            durability: config.durability,
            clock,
            state: State::Open(active),
            rollover_count: 0,
            span,
        })
    }

    /// Appends `record`, rotating first if the policy says so.
    pub fn write(&mut self, record: &LogRecord) -> Result<()> {
        let State::Open(active) = &self.state else {
            return Err(Error::WriterClosed);
        };

        let stats = active.stats().map_err(|source| self.io_error(source))?;
        if self.policy.should_rotate(&stats, record.len()) {
            debug!(parent: &self.span, bytes = stats.bytes, records = stats.records, "rotation due");
            self.rotate()?;
        }

        let durability = self.durability;
        let State::Open(active) = &mut self.state else {
            return Err(Error::WriterClosed);
        };
        if let Err(source) = active.append(record, durability) {
            return Err(self.io_error(source));
        }

        trace!(parent: &self.span, len = record.len(), "appended record");
        Ok(())
    }

    /// Closes the active file, renames it to its rotated name and starts a
    /// new base file. Returns the rotated file's path.
    pub fn rotate(&mut self) -> Result<PathBuf> {
        let State::Open(active) = mem::replace(&mut self.state, State::Closed) else {
            return Err(Error::WriterClosed);
        };

        let rotated_at = self.clock.now();
        let mut destination = rotated_path(&self.base_path, rotated_at, self.rollover_count);
        while destination.exists() {
            warn!(parent: &self.span, destination = %destination.display(), "rotated name taken, skipping");
            self.rollover_count += 1;
            destination = rotated_path(&self.base_path, rotated_at, self.rollover_count);
        }

        let records = active.records;
        active
            .close()
            .and_then(|()| fs::rename(&self.base_path, &destination))
            .map_err(|source| Error::CannotRotate {
                path: self.base_path.clone(),
                destination: destination.clone(),
                source,
            })?;
        self.rollover_count += 1;

        let active = ActiveFile::open(&self.base_path, false).map_err(|source| Error::CannotOpen {
            path: self.base_path.clone(),
            source,
        })?;
        self.state = State::Open(active);

        info!(
            parent: &self.span,
            destination = %destination.display(),
            records,
            rollover_count = self.rollover_count,
            "rotated log file"
        );
        Ok(destination)
    }

    /// Flushes and closes the active file. Later writes fail with
    /// [`Error::WriterClosed`]; stopping again does nothing.
    pub fn stop(&mut self) -> Result<()> {
        let State::Open(active) = mem::replace(&mut self.state, State::Closed) else {
            return Ok(());
        };

        let records = active.records;
        active.close().map_err(|source| self.io_error(source))?;

        info!(parent: &self.span, records, rollover_count = self.rollover_count, "closed log file");
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Number of rotations so far.
    #[inline]
    #[must_use]
    pub fn rollover_count(&self) -> u32 {
        self.rollover_count
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            path: self.base_path.clone(),
            source,
        }
    }
}

impl<C> Drop for RotatingLogWriter<C> {
    fn drop(&mut self) {
        if let State::Open(active) = mem::replace(&mut self.state, State::Closed) {
            if let Err(error) = active.close() {
                warn!(parent: &self.span, %error, "failed to close log file on drop");
            }
        }
    }
}
