//! Cycle-count arithmetic.

/// Convert a cycle count to nanoseconds at `tsc_khz`.
///
/// Uses a `u128` intermediate so that large counts (centuries at GHz
/// rates) do not overflow.
///
/// ```text
///   ns = cycles × 1_000_000 / tsc_khz
/// ```
///
/// # Panics (debug only)
///
/// - `tsc_khz` must be non-zero.
pub fn cycles_to_ns(cycles: u64, tsc_khz: u32) -> u64 {
    debug_assert!(tsc_khz > 0, "tsc_khz must be non-zero");

    let wide = (cycles as u128 * 1_000_000) / tsc_khz as u128;
    let result = u64::try_from(wide).unwrap_or(u64::MAX);

    // Postcondition: zero cycles is zero time.
    debug_assert!(cycles != 0 || result == 0);

    result
}

/// Advance a software counter by one step (wrapping).
#[inline]
pub fn step_counter(counter: u64, step: u64) -> u64 {
    counter.wrapping_add(step)
}
