//! # Critical sections
//!
//! All shared kernel state is mutated inside a critical section: a
//! save-and-restore interrupt guard that releases on every exit path.
//! The implementation comes from the `critical-section` crate — on the
//! target the single-core Cortex-M provider (PRIMASK save, disable,
//! restore), on the host the `std` provider so the kernel logic runs
//! under `cargo test`.
//!
//! Keep the enclosed work short; every cycle spent here is added
//! interrupt latency and, through the tick timer, periodic-task jitter.

pub use critical_section::with;
