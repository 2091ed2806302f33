use serde::{Deserialize, Serialize};

use crate::record::HEADER;

/// Size of a file holding only the header line.
const HEADER_LINE_LEN: u64 = HEADER.len() as u64 + 1;

/// What the rotation policy gets to see of the active file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Current size in bytes, header included.
    pub bytes: u64,
    /// Records appended since the file was opened.
    pub records: u64,
}

impl FileStats {
    /// Whether the file holds anything beyond its header. Records already
    /// present in an appended file count, even though `records` does not
    /// include them.
    #[inline]
    #[must_use]
    pub fn holds_records(&self) -> bool {
        self.records > 0 || self.bytes > HEADER_LINE_LEN
    }
}

/// Decides whether the active file is rotated before the next record.
///
/// Checks happen once per record and before it is appended, so the bounds are
/// soft: a file ends up at most one record past its limit. A file holding only
/// its header is never rotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RotationPolicy {
    /// A single unbounded file.
    #[default]
    Never,
    /// Rotate once the file holds `limit` bytes or more.
    MaxBytes { limit: u64 },
    /// Rotate once the file holds `limit` records or more.
    MaxRecords { limit: u64 },
}

impl RotationPolicy {
    /// Size based rotation, where `0` disables rotation.
    #[inline]
    #[must_use]
    pub const fn max_bytes(limit: u64) -> Self {
        if limit == 0 {
            Self::Never
        } else {
            Self::MaxBytes { limit }
        }
    }

    /// Record count based rotation, where `0` disables rotation.
    #[inline]
    #[must_use]
    pub const fn max_records(limit: u64) -> Self {
        if limit == 0 {
            Self::Never
        } else {
            Self::MaxRecords { limit }
        }
    }

    #[must_use]
    pub fn should_rotate(&self, stats: &FileStats, _next_record_len: usize) -> bool {
        if !stats.holds_records() {
            return false;
        }

        match *self {
            Self::Never => false,
            Self::MaxBytes { limit } => limit > 0 && stats.bytes >= limit,
            Self::MaxRecords { limit } => limit > 0 && stats.records >= limit,
        }
    }
}
