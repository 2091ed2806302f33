//! Size-bounded rotating log files.
//!
//! [`RotatingLogWriter`] owns the active file and consults a [`RotationPolicy`]
//! before every record. Rotated files are named by [`naming`].

pub mod naming;
mod policy;
mod writer;

pub use policy::{FileStats, RotationPolicy};
pub use writer::{Durability, RotatingLogWriter};
