//! Low-overhead cycle-counter event tracer.
//!
//! `cycletrace` records discrete host, guest, and task events into a
//! fixed-capacity ring, stamping each with the CPU's cycle counter.  It is
//! built for timing-sensitive code such as real-time task jobs, where
//! buffered I/O, locking, or allocation would disturb the timing being
//! measured.  Recording costs a counter read and a 24-byte store; all
//! formatting and I/O happens later, at export.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Caller (RT task / host / guest)    │
//! │  record_host / record_guest /       │
//! │  record_task                        │
//! └──────────────┬──────────────────────┘
//!                │ &mut TraceBuffer
//! ┌──────────────▼──────────────────────┐
//! │  TraceBuffer                        │
//! │    CycleSource::read → timestamp    │
//! │    slot[cursor] = EventRecord       │
//! │    cursor wraps, oldest overwritten │
//! └──────────────┬──────────────────────┘
//!                │ (off the hot path)
//! ┌──────────────▼──────────────────────┐
//! │  export                             │
//! │    → binary file (24-byte records)  │
//! │    → text lines  TYPE[] SRC[] ...   │
//! │    → TraceLog (JSON + metadata)     │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use cycletrace::buffer::TraceBuffer;
//! use cycletrace::config::TraceConfig;
//! use cycletrace::events::EventId;
//! use cycletrace::export;
//!
//! let mut trace = TraceBuffer::new(TraceConfig::default()).unwrap();
//! trace.initialize();
//!
//! trace.record_task(EventId::TaskReleaseJob.as_i32(), 7);
//! // ... job body ...
//! trace.record_task(EventId::TaskFinishJob.as_i32(), 7);
//!
//! export::export_to_text(&trace, &mut std::io::stdout()).unwrap();
//! export::export_to_file(&trace, "trace.bin").unwrap();
//! ```

pub mod buffer;
pub mod config;
pub mod events;
pub mod export;
pub mod trace_log;
pub mod tsc;
pub mod verified;
