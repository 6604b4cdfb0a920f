//! Fixed-capacity circular trace buffer.
//!
//! [`TraceBuffer`] owns a slot array sized once at construction and a write
//! cursor.  Recording stamps the event with the buffer's
//! [`CycleSource`], stores it at the cursor, and advances.  When the ring is
//! full the next write wraps to slot 0 and silently replaces the oldest
//! record.
//!
//! There is no internal locking.  `record` takes `&mut self`, so a single
//! writer is enforced by the borrow checker; concurrent writers must share
//! the buffer behind their own `Mutex` or keep one buffer each.
//!
//! ```
//! use cycletrace::buffer::TraceBuffer;
//! use cycletrace::config::TraceConfig;
//! use cycletrace::events::EventId;
//! use cycletrace::tsc::VirtualCycles;
//!
//! let mut trace = TraceBuffer::with_source(TraceConfig::with_capacity(16), VirtualCycles::default())?;
//! trace.initialize();
//! trace.record_task(EventId::TaskReleaseJob.as_i32(), 7);
//! trace.record_task(EventId::TaskFinishJob.as_i32(), 7);
//! assert_eq!(trace.records().count(), 2);
//! # Ok::<(), cycletrace::config::ConfigError>(())
//! ```

use crate::config::{ConfigError, ExportWindow, TraceConfig};
use crate::events::{Category, EventRecord};
use crate::tsc::{CycleSource, HardwareCycles};
use log::debug;
use std::iter::Chain;
use std::slice::Iter;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceError {
    #[error("trace buffer used before initialize()")]
    Uninitialized,
}

/// Records in export order.
pub type Records<'a> = Chain<Iter<'a, EventRecord>, Iter<'a, EventRecord>>;

/// Circular store of [`EventRecord`]s.
pub struct TraceBuffer<C: CycleSource = HardwareCycles> {
    slots: Box<[EventRecord]>,
    /// One past the last slot written in the current generation.
    end: usize,
    total_writes: u64,
    initialized: bool,
    source: C,
    config: TraceConfig,
}

impl TraceBuffer<HardwareCycles> {
    /// Allocate a buffer stamped by the hardware counter.
    pub fn new(config: TraceConfig) -> Result<Self, ConfigError> {
        Self::with_source(config, HardwareCycles)
    }
}

impl<C: CycleSource> TraceBuffer<C> {
    /// Allocate a buffer with an explicit timestamp source.
    ///
    /// This is the only allocation the buffer ever makes.  The buffer
    /// starts uninitialized; call [`initialize`](Self::initialize) before
    /// recording.
    pub fn with_source(config: TraceConfig, source: C) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(
            "allocating trace buffer: {} slots, window={}",
            config.capacity, config.export_window
        );
        Ok(Self {
            slots: vec![EventRecord::EMPTY; config.capacity].into_boxed_slice(),
            end: 0,
            total_writes: 0,
            initialized: false,
            source,
            config,
        })
    }

    /// Rewind the cursor to slot 0 and forget everything recorded.
    ///
    /// Slot contents are not cleared; they are unreachable until
    /// overwritten.
    pub fn initialize(&mut self) {
        self.end = 0;
        self.total_writes = 0;
        self.initialized = true;
    }

    /// Record one event.
    ///
    /// Never blocks, allocates, or fails once the buffer is initialized.
    /// When the ring is full the oldest record is overwritten.
    ///
    /// # Panics
    ///
    /// If [`initialize`](Self::initialize) has not been called.
    #[inline]
    pub fn record(&mut self, category: Category, event_id: i32, source_id: i32) {
        assert!(self.initialized, "TraceBuffer::record called before initialize()");
        self.write(category, event_id, source_id);
    }

    /// Like [`record`](Self::record), but reports uninitialized use as an
    /// error instead of panicking.
    #[inline]
    pub fn try_record(
        &mut self,
        category: Category,
        event_id: i32,
        source_id: i32,
    ) -> Result<(), TraceError> {
        if !self.initialized {
            return Err(TraceError::Uninitialized);
        }
        self.write(category, event_id, source_id);
        Ok(())
    }

    #[inline]
    pub fn record_host(&mut self, event_id: i32) {
        self.record(Category::Host, event_id, 0);
    }

    #[inline]
    pub fn record_guest(&mut self, event_id: i32, registration_id: i32) {
        self.record(Category::Guest, event_id, registration_id);
    }

    #[inline]
    pub fn record_task(&mut self, event_id: i32, reference_id: i32) {
        self.record(Category::Task, event_id, reference_id);
    }

    #[inline(always)]
    fn write(&mut self, category: Category, event_id: i32, source_id: i32) {
        let timestamp = self.source.read();
        let (slot, end) = crate::verified::ring::write_slot(self.end, self.slots.len());
        self.slots[slot] = EventRecord {
            category,
            event_id,
            source_id,
            timestamp,
        };
        self.end = end;
        self.total_writes = self.total_writes.wrapping_add(1);
    }

    // ─── Read-only views ─────────────────────────────────────────────

    /// Records in the configured export window.
    pub fn records(&self) -> Records<'_> {
        self.window(self.config.export_window)
    }

    /// Records in an explicit export window.
    pub fn window(&self, window: ExportWindow) -> Records<'_> {
        let [first, second] = crate::verified::ring::window_spans(
            self.end,
            self.slots.len(),
            self.total_writes,
            window == ExportWindow::Chronological,
        );
        self.slots[first].iter().chain(self.slots[second].iter())
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next record will be written to.
    pub fn cursor(&self) -> usize {
        crate::verified::ring::next_slot(self.end, self.slots.len())
    }

    /// Records written since the last [`initialize`](Self::initialize).
    pub fn total_writes(&self) -> u64 {
        self.total_writes
    }

    /// Records lost to overwriting since the last
    /// [`initialize`](Self::initialize).
    pub fn dropped(&self) -> u64 {
        crate::verified::ring::dropped_records(self.total_writes, self.slots.len())
    }

    /// Whether any record has been overwritten.
    pub fn has_wrapped(&self) -> bool {
        crate::verified::ring::has_overwritten(self.total_writes, self.slots.len())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn source(&self) -> &C {
        &self.source
    }
}

impl<C: CycleSource> std::fmt::Debug for TraceBuffer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceBuffer")
            .field("capacity", &self.slots.len())
            .field("cursor", &self.cursor())
            .field("total_writes", &self.total_writes)
            .field("initialized", &self.initialized)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventId;
    use crate::tsc::VirtualCycles;

    fn buffer(capacity: usize) -> TraceBuffer<VirtualCycles> {
        let mut b = TraceBuffer::with_source(
            TraceConfig::with_capacity(capacity),
            VirtualCycles::new(1_000, 10),
        )
        .unwrap();
        b.initialize();
        b
    }

    fn ids(records: Records<'_>) -> Vec<i32> {
        records.map(|r| r.event_id).collect()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = TraceBuffer::with_source(TraceConfig::with_capacity(0), VirtualCycles::default());
        assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
    }

    #[test]
    fn hardware_buffer_records_in_order() {
        let mut b = TraceBuffer::new(TraceConfig::with_capacity(8)).unwrap();
        b.initialize();
        for i in 0..5 {
            b.record_host(100 + i);
        }
        let recs: Vec<_> = b.records().copied().collect();
        assert_eq!(recs.len(), 5);
        assert!(recs.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn capacity_bound_exports_every_record_in_call_order() {
        for n in [0usize, 1, 7, 16] {
            let mut b = buffer(16);
            for i in 0..n {
                b.record_task(i as i32, 1);
            }
            let expected: Vec<i32> = (0..n as i32).collect();
            assert_eq!(ids(b.records()), expected, "n = {n}");
        }
    }

    #[test]
    fn wraparound_exports_only_new_generation() {
        let capacity = 16;
        for k in [1usize, 5, 15] {
            let mut b = buffer(capacity);
            for i in 0..capacity + k {
                b.record_task(i as i32, 1);
            }
            let expected: Vec<i32> = (capacity as i32..(capacity + k) as i32).collect();
            assert_eq!(ids(b.records()), expected, "k = {k}");
            assert_eq!(b.cursor(), k);
        }
    }

    #[test]
    fn chronological_window_exports_live_records_oldest_first() {
        let mut b = buffer(8);
        for i in 0..11 {
            b.record_guest(i, 2);
        }
        let expected: Vec<i32> = (3..11).collect();
        assert_eq!(ids(b.window(ExportWindow::Chronological)), expected);
        let stamps: Vec<u64> = b
            .window(ExportWindow::Chronological)
            .map(|r| r.timestamp)
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn configured_window_drives_records() {
        let config = TraceConfig {
            capacity: 4,
            export_window: ExportWindow::Chronological,
            ..TraceConfig::default()
        };
        let mut b = TraceBuffer::with_source(config, VirtualCycles::default()).unwrap();
        b.initialize();
        for i in 0..6 {
            b.record_host(i);
        }
        assert_eq!(ids(b.records()), vec![2, 3, 4, 5]);
    }

    #[test]
    fn timestamps_are_monotonic_within_generation() {
        let mut b = buffer(64);
        for _ in 0..64 {
            b.record_host(EventId::HostSentUpdateWithAck.as_i32());
        }
        let stamps: Vec<u64> = b.records().map(|r| r.timestamp).collect();
        assert_eq!(stamps.first(), Some(&1_000));
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn entry_points_set_category_and_source() {
        let mut b = buffer(8);
        b.record_host(101);
        b.record_guest(201, 42);
        b.record_task(301, 7);
        let recs: Vec<_> = b.records().copied().collect();
        assert_eq!(recs[0].category, Category::Host);
        assert_eq!(recs[0].source_id, 0);
        assert_eq!(recs[1].category, Category::Guest);
        assert_eq!(recs[1].source_id, 42);
        assert_eq!(recs[2].category, Category::Task);
        assert_eq!(recs[2].source_id, 7);
    }

    #[test]
    fn reinitialize_is_idempotent() {
        let mut b = buffer(8);
        b.initialize();
        assert_eq!(b.records().count(), 0);
        b.initialize();
        assert_eq!(b.records().count(), 0);
        assert_eq!(b.cursor(), 0);
    }

    #[test]
    fn reinitialize_discards_recorded_data() {
        let mut b = buffer(8);
        for i in 0..12 {
            b.record_host(i);
        }
        b.initialize();
        assert_eq!(b.records().count(), 0);
        assert_eq!(b.window(ExportWindow::Chronological).count(), 0);
        assert_eq!(b.dropped(), 0);
        b.record_host(77);
        assert_eq!(ids(b.records()), vec![77]);
    }

    #[test]
    #[should_panic(expected = "before initialize")]
    fn record_before_initialize_panics() {
        let mut b =
            TraceBuffer::with_source(TraceConfig::with_capacity(4), VirtualCycles::default()).unwrap();
        b.record_host(101);
    }

    #[test]
    fn try_record_before_initialize_is_an_error() {
        let mut b =
            TraceBuffer::with_source(TraceConfig::with_capacity(4), VirtualCycles::default()).unwrap();
        assert!(!b.is_initialized());
        assert_eq!(b.try_record(Category::Host, 101, 0), Err(TraceError::Uninitialized));
        assert_eq!(b.total_writes(), 0);
        b.initialize();
        assert_eq!(b.try_record(Category::Host, 101, 0), Ok(()));
        assert_eq!(b.records().count(), 1);
    }

    #[test]
    fn dropped_counts_overwrites() {
        let mut b = buffer(4);
        for i in 0..4 {
            b.record_host(i);
        }
        assert!(!b.has_wrapped());
        assert_eq!(b.dropped(), 0);
        for i in 4..10 {
            b.record_host(i);
        }
        assert!(b.has_wrapped());
        assert_eq!(b.total_writes(), 10);
        assert_eq!(b.dropped(), 6);
    }

    #[test]
    fn unregistered_ids_are_recorded_verbatim() {
        let mut b = buffer(4);
        b.record_guest(-1, i32::MIN);
        let rec = b.records().next().copied().unwrap();
        assert_eq!(rec.event_id, -1);
        assert_eq!(rec.source_id, i32::MIN);
        assert!(rec.name().is_none());
    }

    #[test]
    fn single_slot_ring_keeps_latest() {
        let mut b = buffer(1);
        b.record_task(301, 1);
        b.record_task(302, 1);
        assert_eq!(ids(b.records()), vec![302]);
        assert_eq!(b.dropped(), 1);
    }
}
