//! Cycle-counter timestamp sources.
//!
//! [`HardwareCycles`] reads the CPU's free-running counter directly: no
//! system call, no allocation, a handful of instructions.  The read is
//! fenced so that it cannot be reordered with the surrounding work, which
//! keeps the relative order of nearby events meaningful.
//!
//! | Target    | Counter                         | Ordering              |
//! |-----------|---------------------------------|-----------------------|
//! | `x86_64`  | `RDTSC`                         | `LFENCE` on both sides|
//! | `aarch64` | `CNTVCT_EL0` (virtual count)    | `ISB` before the read |
//! | other     | ns since a process-wide epoch   | `Instant` semantics   |
//!
//! Counter units are opaque.  Converting to time needs a frequency, which
//! lives in [`TraceConfig`](crate::config::TraceConfig), not here.
//!
//! [`VirtualCycles`] is a deterministic software counter for tests and
//! simulations.

/// Anything that can stamp an event with a cycle count.
///
/// Implementations must be cheap and must never block or allocate:
/// [`read`](Self::read) runs on the recording hot path.
pub trait CycleSource {
    /// Current counter value.  Successive reads never decrease.
    fn read(&mut self) -> u64;
}

// ─── Hardware counter ────────────────────────────────────────────────

/// The CPU's own cycle counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareCycles;

impl HardwareCycles {
    #[inline]
    pub fn now() -> u64 {
        read_cycle_counter()
    }
}

impl CycleSource for HardwareCycles {
    #[inline]
    fn read(&mut self) -> u64 {
        read_cycle_counter()
    }
}

/// Read the hardware cycle counter.
#[cfg(target_arch = "x86_64")]
#[inline]
#[allow(unused_unsafe)]
pub fn read_cycle_counter() -> u64 {
    use std::arch::x86_64::{_mm_lfence, _rdtsc};

    // SAFETY: RDTSC and LFENCE (SSE2) are part of the x86_64 baseline.
    unsafe {
        _mm_lfence();
        let tsc = _rdtsc();
        _mm_lfence();
        tsc
    }
}

/// Read the hardware cycle counter.
#[cfg(target_arch = "aarch64")]
#[inline]
pub fn read_cycle_counter() -> u64 {
    let cnt: u64;
    // SAFETY: CNTVCT_EL0 is readable from EL0 on every supported OS.
    unsafe {
        std::arch::asm!(
            "isb",
            "mrs {cnt}, cntvct_el0",
            cnt = out(reg) cnt,
            options(nostack, preserves_flags),
        );
    }
    cnt
}

/// Read the hardware cycle counter.
///
/// No user-readable counter on this target; nanoseconds since the first
/// call stand in for cycles.
#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
pub fn read_cycle_counter() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    u64::try_from(epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

// ─── Software counter ────────────────────────────────────────────────

/// A deterministic counter that advances by a fixed step on every read.
///
/// Each [`read`](CycleSource::read) returns the current value and then
/// advances it, so two consecutive records are exactly `step` cycles
/// apart.
///
/// ```
/// use cycletrace::tsc::{CycleSource, VirtualCycles};
///
/// let mut clock = VirtualCycles::new(1_000, 10);
/// assert_eq!(clock.read(), 1_000);
/// assert_eq!(clock.read(), 1_010);
/// assert_eq!(clock.peek(), 1_020);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualCycles {
    counter: u64,
    step: u64,
}

impl VirtualCycles {
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            counter: start,
            step,
        }
    }

    /// Value the next read will return, without advancing.
    #[inline]
    pub fn peek(&self) -> u64 {
        self.counter
    }

    /// Overwrite the counter.
    #[inline]
    pub fn set(&mut self, value: u64) {
        self.counter = value;
    }

    #[inline]
    pub fn step(&self) -> u64 {
        self.step
    }
}

impl Default for VirtualCycles {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

impl CycleSource for VirtualCycles {
    #[inline]
    fn read(&mut self) -> u64 {
        let now = self.counter;
        self.counter = crate::verified::tsc::step_counter(self.counter, self.step);
        now
    }
}
