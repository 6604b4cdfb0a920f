//! Draining a trace buffer to binary files and text streams.
//!
//! Exports read the buffer's configured window (see
//! [`ExportWindow`](crate::config::ExportWindow)) and never mutate it, so a
//! failed export can simply be retried.
//!
//! Binary traces are a bare sequence of 24-byte [`RawRecord`]s in host
//! byte order: no header, no count, no checksum.  The record count is the
//! file size divided by [`RECORD_SIZE`].

use crate::buffer::TraceBuffer;
use crate::events::{EventRecord, RawRecord, RECORD_SIZE};
use crate::tsc::CycleSource;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("trace is {len} bytes, not a multiple of the {}-byte record size", RECORD_SIZE)]
    Truncated { len: usize },

    #[error("record {index} has invalid category byte {value}")]
    InvalidCategory { index: usize, value: u8 },
}

// ═══════════════════════════════════════════════════════════════════════
//  Binary
// ═══════════════════════════════════════════════════════════════════════

/// Write the buffer's export window to `path` (created or truncated).
///
/// Returns the number of records written.
pub fn export_to_file<C: CycleSource>(
    buffer: &TraceBuffer<C>,
    path: impl AsRef<Path>,
) -> Result<usize, ExportError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut sink = BufWriter::new(file);
    let written = write_binary(buffer.records(), &mut sink)?;
    sink.flush()?;

    if buffer.dropped() > 0 {
        warn!(
            "{} records were overwritten before export ({} recorded, capacity {})",
            buffer.dropped(),
            buffer.total_writes(),
            buffer.capacity()
        );
    }
    info!("exported {} records to {}", written, path.display());
    Ok(written)
}

/// Encode `records` to `sink` in the binary trace layout.
pub fn write_binary<'a, W: Write>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    sink: &mut W,
) -> Result<usize, ExportError> {
    let mut written = 0;
    for record in records {
        sink.write_all(&record.to_raw().encode())?;
        written += 1;
    }
    Ok(written)
}

/// Decode a binary trace held in memory.
pub fn decode_records(bytes: &[u8]) -> Result<Vec<EventRecord>, ExportError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(ExportError::Truncated { len: bytes.len() });
    }

    bytes
        .chunks_exact(RECORD_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            let mut buf = [0u8; RECORD_SIZE];
            buf.copy_from_slice(chunk);
            EventRecord::from_raw(&RawRecord::decode(&buf))
                .map_err(|value| ExportError::InvalidCategory { index, value })
        })
        .collect()
}

/// Read a binary trace file back into records.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<EventRecord>, ExportError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let records = decode_records(&bytes)?;
    debug!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

// ═══════════════════════════════════════════════════════════════════════
//  Text
// ═══════════════════════════════════════════════════════════════════════

/// Write the buffer's export window to `sink`, one line per record.
///
/// Lines use the screen-dump format:
/// `TYPE[<category>] SRC[<source>] EVENT[<id>] TSC[<20-column count>]`.
pub fn export_to_text<C: CycleSource, W: Write>(
    buffer: &TraceBuffer<C>,
    sink: &mut W,
) -> Result<usize, ExportError> {
    write_text(buffer.records(), sink, false)
}

/// Write `records` as text lines.  With `named`, registered identifiers
/// and categories are shown by name (see [`format_named_line`]).
pub fn write_text<'a, W: Write>(
    records: impl IntoIterator<Item = &'a EventRecord>,
    sink: &mut W,
    named: bool,
) -> Result<usize, ExportError> {
    let mut written = 0;
    for record in records {
        if named {
            writeln!(sink, "{}", format_named_line(record))?;
        } else {
            writeln!(sink, "{}", record)?;
        }
        written += 1;
    }
    Ok(written)
}

/// Render a record with names resolved through the registry.
///
/// Unregistered identifiers fall back to the raw number.
pub fn format_named_line(record: &EventRecord) -> String {
    let event = match record.name() {
        Some(name) => name.to_string(),
        None => record.event_id.to_string(),
    };
    format!(
        "TYPE[{}] SRC[{}] EVENT[{}] TSC[{:>20}]",
        record.category, record.source_id, event, record.timestamp,
    )
}
