//! Hand-over to the archival stage.
//!
//! Only rotated files are complete: the writer closed and synced them before
//! renaming. The base file may still be growing and is never listed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use crate::rotate::naming::{parse_rotated_name, RotatedName};
use crate::{Error, Result};

/// Rotated files of `base_path`, oldest first.
///
/// Order follows the wall clock stamp in each name, then the rollover counter.
/// The counter restarts with every writer, so it only breaks ties within one
/// second. If the system clock was stepped back between rotations (a Pi
/// without RTC syncing after boot), files are listed by their stamps and not
/// in the order they were written.
pub fn completed_logs(base_path: &Path) -> Result<Vec<PathBuf>> {
    let dir = match base_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let io_error = |source: std::io::Error| Error::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut logs: Vec<(RotatedName, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let Some(name) = entry.file_name().to_str().and_then(|n| parse_rotated_name(base_path, n)) else {
            continue;
        };
        if entry.file_type().map_err(io_error)?.is_file() {
            logs.push((name, entry.path()));
        }
    }
    logs.sort();

    debug!(base = %base_path.display(), count = logs.len(), "listed completed logs");
    Ok(logs.into_iter().map(|(_, path)| path).collect())
}
