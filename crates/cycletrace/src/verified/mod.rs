//! Pure functions behind the tracer's stateful types.
//!
//! Every function here takes values in and returns values out: no I/O, no
//! clock reads, no mutation of shared state.  The stateful shells
//! ([`TraceBuffer`](crate::buffer::TraceBuffer),
//! [`VirtualCycles`](crate::tsc::VirtualCycles), the registry lookups in
//! [`events`](crate::events)) delegate their arithmetic and table scans to
//! this module so it can be tested exhaustively in isolation.
//!
//! Non-trivial functions carry `debug_assert!` preconditions and
//! postconditions.  They compile away in release builds, which keeps the
//! recording hot path free of extra branches.

pub mod events;
pub mod ring;
pub mod tsc;
