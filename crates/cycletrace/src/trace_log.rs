//! JSON trace logs.
//!
//! A [`TraceLog`] is a drained trace plus enough context to interpret it
//! later: the counter frequency used for time conversion and a snapshot of
//! the host it was captured on.  Unlike the binary format it is
//! self-describing, so it is the format to archive or diff.

use crate::buffer::TraceBuffer;
use crate::events::{EventRecord, RECORD_SIZE};
use crate::export::ExportError;
use crate::tsc::CycleSource;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A recorded trace with its capture context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLog {
    /// Counter frequency assumed for cycle-to-time conversion.
    pub tsc_khz: u32,
    /// Records dropped by the ring before capture.
    #[serde(default)]
    pub dropped: u64,
    /// Records in export order.
    pub records: Vec<EventRecord>,
    pub metadata: TraceMetadata,
}

/// Where and when a trace was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceMetadata {
    /// Kernel version string.
    pub kernel_version: String,
    /// CPU model string.
    pub cpu_model: String,
    /// Wall-clock capture time.
    pub captured_at: String,
}

impl TraceMetadata {
    /// Gather metadata from the current system.
    pub fn gather() -> Self {
        let kernel_version = std::fs::read_to_string("/proc/version")
            .unwrap_or_default()
            .trim()
            .to_string();
        let cpu_model = std::fs::read_to_string("/proc/cpuinfo")
            .unwrap_or_default()
            .lines()
            .find(|l| l.starts_with("model name"))
            .and_then(|l| l.split_once(':'))
            .map(|(_, model)| model.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec.
        unsafe {
            libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts);
        }
        let captured_at = format!("{}s_{}ns", ts.tv_sec, ts.tv_nsec);

        Self {
            kernel_version,
            cpu_model,
            captured_at,
        }
    }
}

impl TraceLog {
    pub fn new(tsc_khz: u32, records: Vec<EventRecord>) -> Self {
        Self {
            tsc_khz,
            dropped: 0,
            records,
            metadata: TraceMetadata::gather(),
        }
    }

    /// Snapshot the buffer's export window.
    pub fn from_buffer<C: CycleSource>(buffer: &TraceBuffer<C>) -> Self {
        let mut log = Self::new(buffer.config().tsc_khz, buffer.records().copied().collect());
        log.dropped = buffer.dropped();
        log
    }

    /// Save as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!("saved {} records to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ExportError> {
        let file = File::open(path)?;
        let log = serde_json::from_reader(BufReader::new(file))?;
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size the records would occupy as a binary trace.
    pub fn binary_size(&self) -> usize {
        self.len() * RECORD_SIZE
    }

    /// Record counts per event.  Registered events are keyed by name,
    /// unregistered ones by their raw identifier.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            let key = match record.name() {
                Some(name) => name.to_string(),
                None => record.event_id.to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }

    /// Cycles between the first and last record, if there are at least two.
    pub fn span_cycles(&self) -> Option<u64> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) if self.records.len() >= 2 => {
                Some(last.timestamp.saturating_sub(first.timestamp))
            }
            _ => None,
        }
    }

    /// [`span_cycles`](Self::span_cycles) in nanoseconds at `tsc_khz`.
    pub fn span_ns(&self) -> Option<u64> {
        if self.tsc_khz == 0 {
            return None;
        }
        self.span_cycles()
            .map(|c| crate::verified::tsc::cycles_to_ns(c, self.tsc_khz))
    }
}
