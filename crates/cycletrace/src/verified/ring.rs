//! Cursor arithmetic for the fixed-capacity ring.
//!
//! The ring is described by three numbers:
//!
//! - `capacity`: number of slots, fixed at construction, always `> 0`.
//! - `end`: one past the last slot written in the current generation, in
//!   `0..=capacity`.  The wrap to slot 0 happens lazily at the start of the
//!   *next* write, so after exactly `capacity` writes `end == capacity` and
//!   the whole ring is still reported.
//! - `total_writes`: writes since the last `initialize`.
//!
//! | Function                 | Used by                                   |
//! |--------------------------|-------------------------------------------|
//! | [`write_slot`]           | `TraceBuffer::record`                     |
//! | [`next_slot`]            | `TraceBuffer::cursor`                     |
//! | [`has_overwritten`]      | `TraceBuffer::has_wrapped`                |
//! | [`dropped_records`]      | `TraceBuffer::dropped`                    |
//! | [`window_spans`]         | `TraceBuffer::window` (export range)      |

use std::ops::Range;

/// Compute the slot the next write lands in, and the new `end`.
///
/// Returns `(slot, new_end)`.  When the previous generation filled the ring
/// (`end == capacity`) the write wraps to slot 0 and overwrites the oldest
/// record.
///
/// # Panics (debug only)
///
/// - `capacity` must be non-zero.
/// - `end` must be in `0..=capacity`.
#[inline]
pub fn write_slot(end: usize, capacity: usize) -> (usize, usize) {
    debug_assert!(capacity > 0, "ring capacity must be non-zero");
    debug_assert!(end <= capacity, "end {end} out of range for capacity {capacity}");

    let slot = if end == capacity { 0 } else { end };
    let new_end = slot + 1;

    // Postcondition: the written slot is in bounds and `new_end` follows it.
    debug_assert!(slot < capacity);
    debug_assert!(new_end <= capacity);

    (slot, new_end)
}

/// Index of the slot the next write will land in.
#[inline]
pub fn next_slot(end: usize, capacity: usize) -> usize {
    write_slot(end, capacity).0
}

/// Whether at least one record has been overwritten since the last reset.
#[inline]
pub fn has_overwritten(total_writes: u64, capacity: usize) -> bool {
    total_writes > capacity as u64
}

/// Number of records lost to the overwrite policy.
///
/// Every write beyond the first `capacity` replaces exactly one older
/// record.
#[inline]
pub fn dropped_records(total_writes: u64, capacity: usize) -> u64 {
    total_writes.saturating_sub(capacity as u64)
}

/// Slot ranges to read, in order, for an export.
///
/// With `chronological == false` the result is `[0, end)`: everything
/// written in the current generation, ignoring older records left behind
/// the cursor after a wrap.  With `chronological == true` and at least one
/// overwrite, the result is `[end, capacity)` followed by `[0, end)`, which
/// is every live record, oldest first.
///
/// The second range is empty when only one span is needed.
///
/// # Properties
///
/// - Both ranges lie within `0..capacity`.
/// - The total length is `end` for the cursor window and `capacity` for a
///   chronological window after an overwrite.
pub fn window_spans(
    end: usize,
    capacity: usize,
    total_writes: u64,
    chronological: bool,
) -> [Range<usize>; 2] {
    debug_assert!(capacity > 0, "ring capacity must be non-zero");
    debug_assert!(end <= capacity, "end {end} out of range for capacity {capacity}");

    let spans = if chronological && has_overwritten(total_writes, capacity) {
        [end..capacity, 0..end]
    } else {
        [0..end, 0..0]
    };

    // Postcondition: spans stay inside the slot array.
    debug_assert!(spans.iter().all(|r| r.start <= r.end && r.end <= capacity));

    spans
}
