//! This crate logs raw NMEA 2000 (N2K) bus traffic to plain-text files. Each
//! received CAN frame is decoded into its N2K header fields (priority, PGN,
//! source and destination) and written as one comma-separated record, in the
//! spirit of [the Canboat project's](https://canboat.github.io/canboat/canboat.html)
//! text formats. Payloads are not interpreted.
//!
//! Log files are bounded in size: once the active file reaches its limit it is
//! closed, renamed with a timestamp and a sequence number, and a fresh file
//! with the same name takes its place. Rotated files are complete and can be
//! picked up by an archival job, see [`archive::completed_logs`].
//!
//! ```no_run
//! use n2k_logger::{LogWriter, RawFrame, WriterConfig};
//!
//! # fn main() -> n2k_logger::Result<()> {
//! let config = WriterConfig::new("/home/pi/logs/boat.n2k").with_max_bytes(10 << 20);
//! let mut writer = LogWriter::create(&config)?;
//!
//! # let frame: RawFrame = unimplemented!();
//! writer.log(&frame)?;
//! writer.stop()?;
//! # Ok(())
//! # }
//! ```
//!
//! With the `capture` feature (on by default), [`capture`] connects an async
//! CAN interface to a writer through a bounded queue.

pub mod archive;
#[cfg(feature = "capture")]
pub mod capture;
mod clock;
pub mod config;
mod error;
mod filter;
mod format;
mod frame;
mod id;
pub mod record;
pub mod rotate;

pub use clock::{Clock, SystemClock};
pub use config::{LoggerConfig, WriterConfig};
pub use error::{Error, FrameRejection, Result};
pub use filter::{accepts, Filter};
pub use format::{LogFormat, LogWriter};
pub use frame::{decode, DecodedFrame, Payload, RawFrame, MAX_DATA_LEN};
pub use id::{Format, Id, DESTINATION_BROADCAST, PDU1_MAX_FORMAT};
pub use record::{LogRecord, ParsedRecord};
pub use rotate::naming::session_log_name;
pub use rotate::{Durability, FileStats, RotatingLogWriter, RotationPolicy};
