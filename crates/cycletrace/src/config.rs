//! Tracer configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Default ring capacity in records.
pub const DEFAULT_CAPACITY: usize = 20_480;

/// Default counter frequency: 3.3 GHz.
///
/// A nominal value for converting cycles to time, not a hardware claim.
/// Measure the real rate for accurate durations.
pub const DEFAULT_TSC_KHZ: u32 = 3_300_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("capacity must be at least one record")]
    ZeroCapacity,

    #[error("tsc_khz must be non-zero")]
    ZeroFrequency,

    #[error("unknown export window {0:?} (expected \"cursor\" or \"chronological\")")]
    UnknownWindow(String),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which slots an export reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportWindow {
    /// Slots `[0, cursor)`.  After a wrap this reports only the records
    /// written since the wrap; older surviving records are skipped.  Files
    /// match what the C tracer produces.
    #[default]
    Cursor,
    /// Every live record, oldest first: `[cursor, capacity)` then
    /// `[0, cursor)` once the ring has overwritten anything.
    Chronological,
}

impl fmt::Display for ExportWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor => f.write_str("cursor"),
            Self::Chronological => f.write_str("chronological"),
        }
    }
}

impl FromStr for ExportWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cursor" => Ok(Self::Cursor),
            "chronological" | "chrono" => Ok(Self::Chronological),
            other => Err(ConfigError::UnknownWindow(other.to_string())),
        }
    }
}

/// Tracer settings, fixed for the lifetime of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Number of record slots.
    pub capacity: usize,
    /// Counter frequency in kHz, for cycle-to-time conversion.
    pub tsc_khz: u32,
    /// Slots included by exports.
    pub export_window: ExportWindow,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tsc_khz: DEFAULT_TSC_KHZ,
            export_window: ExportWindow::default(),
        }
    }
}

impl TraceConfig {
    /// Default settings with a different capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.tsc_khz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        Ok(())
    }

    /// Load and validate a JSON config file.  Missing fields take their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert a cycle delta to nanoseconds at the configured rate.
    pub fn cycles_to_ns(&self, cycles: u64) -> u64 {
        crate::verified::tsc::cycles_to_ns(cycles, self.tsc_khz)
    }

    /// Convert a cycle delta to fractional milliseconds.
    pub fn cycles_to_ms(&self, cycles: u64) -> f64 {
        cycles as f64 / self.tsc_khz as f64
    }
}
