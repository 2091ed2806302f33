//! Configuration of the log writer and the capture pipeline.
//!
//! Everything can be built in code, or read from YAML:
//!
//! ```yaml
//! writer:
//!   base_path: /home/pi/logs/boat.n2k
//!   max_bytes: 10485760
//!   durability: sync
//! pgns: [129025, 129026, 130306]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::{Durability, Error, Result, RotationPolicy};

/// Settings of a [`RotatingLogWriter`](crate::RotatingLogWriter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    pub base_path: PathBuf,
    /// Rotate once the active file reaches this many bytes. `0` keeps a
    /// single unbounded file.
    pub max_bytes: u64,
    /// Append to an existing base file instead of truncating it.
    pub append: bool,
    pub durability: Durability,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("log.n2k"),
            max_bytes: 0,
            append: false,
            durability: Durability::default(),
        }
    }
}

impl WriterConfig {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    #[must_use]
    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    #[must_use]
    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::max_bytes(self.max_bytes)
    }
}

/// Settings of the logging appliance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub writer: WriterConfig,
    /// Raw acceptance filters.
    pub filters: Vec<Filter>,
    /// PGNs to log, in addition to `filters`.
    pub pgns: Vec<u32>,
}

impl LoggerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| Error::config("cannot parse YAML", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}", path.display()), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// All acceptance filters, PGN filters included. Empty means log
    /// everything.
    #[must_use]
    pub fn filters(&self) -> Vec<Filter> {
        self.filters
            .iter()
            .copied()
            .chain(self.pgns.iter().map(|&pgn| Filter::pgn(pgn)))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if let Some(pgn) = self.pgns.iter().find(|&&pgn| pgn > 0x3ffff) {
            return Err(Error::Config {
                reason: format!("PGN {pgn} does not fit in 18 bits"),
                source: None,
            });
        }
        if self.writer.base_path.file_name().is_none() {
            return Err(Error::Config {
                reason: format!("base path {} has no file name", self.writer.base_path.display()),
                source: None,
            });
        }
        Ok(())
    }
}
