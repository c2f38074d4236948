//! # Time services
//!
//! The monotonic clock and the millisecond clock, both driven by the
//! dedicated kernel tick timer.
//!
//! The tick handler increments a 32-bit millisecond counter; the timer's
//! own countdown register supplies the sub-tick cycles. Composing the
//! two yields a 64-bit timestamp in bus cycles (12.5 ns at 80 MHz) with
//! sub-microsecond resolution.

use crate::arch;
use crate::config::CYCLES_PER_TICK;
use crate::kernel;
use crate::sync;

/// The clock's wrap period in cycles: one full revolution of the 32-bit
/// tick counter.
pub const WRAP_CYCLES: u64 = (1u64 << 32) * CYCLES_PER_TICK as u64;

/// Compose a tick count and a countdown-register sample into a cycle
/// timestamp. The countdown register counts down from
/// `CYCLES_PER_TICK - 1`, so the elapsed part of the current tick is its
/// complement.
pub(crate) const fn compose(ticks: u32, countdown: u32) -> u64 {
    ticks as u64 * CYCLES_PER_TICK as u64 + (CYCLES_PER_TICK - 1 - countdown) as u64
}

/// Current monotonic time in bus cycles (12.5 ns units).
///
/// The tick counter is sampled on both sides of the countdown read and
/// the read retried if a tick landed in between, so concurrent readers
/// always observe nondecreasing values. Safe from threads and from
/// interrupt handlers.
pub fn now() -> u64 {
    loop {
        let before = kernel::ticks_now();
        let countdown = arch::tick_timer_remaining();
        let after = kernel::ticks_now();
        if before == after {
            return compose(before, countdown);
        }
    }
}

/// Difference between two timestamps taken with [`now`], corrected for
/// wraparound of the tick counter.
pub fn diff(start: u64, stop: u64) -> u64 {
    if stop >= start {
        stop - start
    } else {
        WRAP_CYCLES - (start - stop)
    }
}

/// Milliseconds since boot or since the last [`clear_ms`].
pub fn ms_now() -> u32 {
    kernel::ticks_now()
}

/// Zero the millisecond clock and restart the current tick interval.
pub fn clear_ms() {
    sync::with(|_| unsafe {
        kernel::kernel_mut().ticks = 0;
    });
    arch::tick_timer_restart();
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_starts_each_tick_at_zero_elapsed() {
        // Fresh reload: countdown at its maximum, nothing elapsed yet.
        assert_eq!(compose(0, CYCLES_PER_TICK - 1), 0);
        assert_eq!(compose(5, CYCLES_PER_TICK - 1), 5 * CYCLES_PER_TICK as u64);
    }

    #[test]
    fn compose_is_continuous_across_a_tick() {
        // Last cycle of tick 3 is one less than the first cycle of tick 4.
        let end_of_tick = compose(3, 0);
        let start_of_next = compose(4, CYCLES_PER_TICK - 1);
        assert_eq!(end_of_tick + 1, start_of_next);
    }

    #[test]
    fn compose_is_monotone_within_a_tick() {
        let mut last = compose(7, CYCLES_PER_TICK - 1);
        for countdown in (0..CYCLES_PER_TICK - 1).rev().step_by(9973) {
            let t = compose(7, countdown);
            assert!(t > last);
            last = t;
        }
    }

    #[test]
    fn diff_ordinary_and_wrapped() {
        assert_eq!(diff(100, 350), 250);
        assert_eq!(diff(0, 0), 0);
        // Clock wrapped between the two samples.
        assert_eq!(diff(WRAP_CYCLES - 10, 5), 15);
    }

    #[test]
    fn diff_is_monotone_for_fixed_start() {
        let start = compose(10, 40_000);
        let mut last = 0;
        for ticks in 10..20 {
            let d = diff(start, compose(ticks, 40_000));
            assert!(d >= last);
            last = d;
        }
    }
}
