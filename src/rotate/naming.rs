//! File names of rotated logs.
//!
//! A rotated file keeps the directory, stem and suffix of the base file and
//! gains the rotation time and the rollover counter:
//! `foo.n2k` becomes `foo_2021-03-01T120000_#000.n2k`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};

/// Rotation time in file names. Sorts lexicographically.
pub const ROTATION_STAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";

/// Length of a formatted [`ROTATION_STAMP_FORMAT`] stamp.
const STAMP_LEN: usize = 17;

/// Split a file name at its last `.` into stem and suffix. The suffix keeps
/// the dot and is empty when there is none.
#[must_use]
pub fn split_name(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(0) | None => (file_name, ""),
        Some(dot) => file_name.split_at(dot),
    }
}

fn base_name(base_path: &Path) -> &str {
    base_path.file_name().and_then(OsStr::to_str).unwrap_or_default()
}

/// The path `base_path` is renamed to on rotation number `count`.
#[must_use]
pub fn rotated_path(base_path: &Path, rotated_at: DateTime<Utc>, count: u32) -> PathBuf {
    let (stem, suffix) = split_name(base_name(base_path));
    let name = format!(
        "{stem}_{}_#{count:03}{suffix}",
        rotated_at.format(ROTATION_STAMP_FORMAT)
    );

    base_path.with_file_name(name)
}

/// A file name produced by [`rotated_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RotatedName {
    pub rotated_at: NaiveDateTime,
    pub count: u32,
}

/// Recognize `file_name` as a rotation of `base_path`.
#[must_use]
pub fn parse_rotated_name(base_path: &Path, file_name: &str) -> Option<RotatedName> {
    let (stem, suffix) = split_name(base_name(base_path));

    let rest = file_name.strip_prefix(stem)?.strip_suffix(suffix)?;
    let rest = rest.strip_prefix('_')?;
    let (stamp, count) = rest.split_once("_#")?;

    if stamp.len() != STAMP_LEN || count.len() < 3 || !count.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(RotatedName {
        rotated_at: NaiveDateTime::parse_from_str(stamp, ROTATION_STAMP_FORMAT).ok()?,
        count: count.parse().ok()?,
    })
}

/// Name for the log of a logging session started at `started`, e.g.
/// `20210301-120000-Log.n2k`.
#[must_use]
pub fn session_log_name(started: DateTime<Utc>) -> String {
    format!("{}-Log.n2k", started.format("%Y%m%d-%H%M%S"))
}
