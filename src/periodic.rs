//! # Periodic background tasks
//!
//! Up to [`NUM_PERIODIC`] tasks, each driven by its own dedicated
//! hardware timer at its own interrupt priority. The task runs to
//! completion inside the timer interrupt: it may not block, sleep, spin,
//! or kill; `Semaphore::signal`, `Semaphore::bsignal`, and
//! `kernel::add_thread` are its only kernel entry points.
//!
//! ## Jitter accounting
//!
//! Each invocation samples the monotonic clock on entry. From the second
//! invocation onward the observed interval is compared with the
//! requested period; the absolute deviation, rounded to 0.1 µs units,
//! updates a running maximum and lands in a bounded histogram whose last
//! bucket absorbs outliers. After K invocations the histogram holds
//! exactly K - 1 entries. Threads may read the statistics while the
//! timer keeps running; a torn 32-bit read is acceptable there.

use core::ptr::addr_of_mut;

use crate::arch;
use crate::config::{JITTER_BUCKETS, NUM_PERIODIC};
use crate::sync;
use crate::time;

// ---------------------------------------------------------------------------
// Slot record
// ---------------------------------------------------------------------------

/// One periodic task: the user function, its requested period, and the
/// timing statistics its timer interrupt accumulates.
pub(crate) struct PeriodicSlot {
    task: Option<fn()>,
    /// Requested period in bus cycles (12.5 ns units).
    period: u32,
    invocations: u32,
    last_time: u64,
    /// Largest observed deviation, 0.1 µs units.
    max_jitter: u32,
    histogram: [u32; JITTER_BUCKETS],
}

impl PeriodicSlot {
    const EMPTY: PeriodicSlot = PeriodicSlot {
        task: None,
        period: 0,
        invocations: 0,
        last_time: 0,
        max_jitter: 0,
        histogram: [0; JITTER_BUCKETS],
    };

    fn install(&mut self, task: fn(), period: u32) {
        *self = PeriodicSlot {
            task: Some(task),
            period,
            ..Self::EMPTY
        };
    }

    /// Account one invocation observed at `this_time`. The first
    /// invocation only seeds the timestamp; there is no previous
    /// interval to judge it against.
    fn record(&mut self, this_time: u64) {
        self.invocations += 1;
        if self.invocations > 1 {
            let observed = time::diff(self.last_time, this_time) as u32;
            let deviation = if observed > self.period {
                observed - self.period
            } else {
                self.period - observed
            };
            // 12.5 ns cycles to 0.1 µs, round to nearest.
            let jitter = (deviation + 4) / 8;
            if jitter > self.max_jitter {
                self.max_jitter = jitter;
            }
            let bucket = (jitter as usize).min(JITTER_BUCKETS - 1);
            self.histogram[bucket] += 1;
        }
        self.last_time = this_time;
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

static mut SLOTS: [PeriodicSlot; NUM_PERIODIC] = [PeriodicSlot::EMPTY; NUM_PERIODIC];

/// Install a periodic background task.
///
/// `period` is in bus cycles (12.5 ns units), `priority` is the NVIC
/// priority for the slot's timer interrupt (0 highest). Fails with
/// `Err(())` when both slots are taken; an existing registration is
/// never disturbed.
pub fn add_periodic(task: fn(), period: u32, priority: u8) -> Result<(), ()> {
    sync::with(|_| unsafe {
        let slots = &mut *addr_of_mut!(SLOTS);
        let slot = slots.iter().position(|s| s.task.is_none()).ok_or(())?;
        slots[slot].install(task, period);
        arch::periodic_timer_init(slot, period, priority);
        Ok(())
    })
}

/// Timer interrupt body for one slot: sample the clock, run the user
/// task inline, account the invocation. The port handler has already
/// acknowledged the timer.
pub(crate) fn on_timer(slot: usize) {
    let this_time = time::now();
    let slots = unsafe { &mut *addr_of_mut!(SLOTS) };
    if let Some(task) = slots[slot].task {
        task();
    }
    slots[slot].record(this_time);
}

/// Largest deviation seen by `slot`, in 0.1 µs units.
pub fn max_jitter(slot: usize) -> u32 {
    unsafe { (*addr_of_mut!(SLOTS))[slot].max_jitter }
}

/// Snapshot of `slot`'s jitter histogram.
pub fn jitter_histogram(slot: usize) -> [u32; JITTER_BUCKETS] {
    unsafe { (*addr_of_mut!(SLOTS))[slot].histogram }
}

/// How many times `slot`'s task has run.
pub fn invocations(slot: usize) -> u32 {
    unsafe { (*addr_of_mut!(SLOTS))[slot].invocations }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn task() {}

    const PERIOD: u32 = 80_000; // 1 ms in cycles

    fn slot_with_runs(intervals: &[u32]) -> PeriodicSlot {
        let mut s = PeriodicSlot::EMPTY;
        s.install(task, PERIOD);
        let mut t = 1_000_000u64;
        s.record(t);
        for &interval in intervals {
            t += interval as u64;
            s.record(t);
        }
        s
    }

    #[test]
    fn first_invocation_is_not_judged() {
        let s = slot_with_runs(&[]);
        assert_eq!(s.invocations, 1);
        assert_eq!(s.histogram.iter().sum::<u32>(), 0);
        assert_eq!(s.max_jitter, 0);
    }

    #[test]
    fn histogram_holds_k_minus_one_entries() {
        let s = slot_with_runs(&[PERIOD; 9]);
        assert_eq!(s.invocations, 10);
        assert_eq!(s.histogram.iter().sum::<u32>(), 9);
    }

    #[test]
    fn exact_periods_land_in_bucket_zero() {
        let s = slot_with_runs(&[PERIOD; 5]);
        assert_eq!(s.histogram[0], 5);
        assert_eq!(s.max_jitter, 0);
    }

    #[test]
    fn deviation_converts_to_tenth_microseconds() {
        // 80 cycles = 1 µs late and early: both bin at 10 × 0.1 µs.
        let s = slot_with_runs(&[PERIOD + 80, PERIOD - 80]);
        assert_eq!(s.histogram[10], 2);
        assert_eq!(s.max_jitter, 10);
    }

    #[test]
    fn rounding_is_to_nearest() {
        // 3 cycles → (3 + 4) / 8 = 0; 5 cycles → (5 + 4) / 8 = 1.
        let s = slot_with_runs(&[PERIOD + 3, PERIOD + 5]);
        assert_eq!(s.histogram[0], 1);
        assert_eq!(s.histogram[1], 1);
    }

    #[test]
    fn outliers_clamp_to_last_bucket() {
        let s = slot_with_runs(&[PERIOD + 800_000]);
        assert_eq!(s.histogram[JITTER_BUCKETS - 1], 1);
        assert!(s.max_jitter as usize > JITTER_BUCKETS);
    }

    #[test]
    fn max_jitter_tracks_the_worst_run() {
        let s = slot_with_runs(&[PERIOD + 8, PERIOD + 160, PERIOD + 16]);
        assert_eq!(s.max_jitter, 20);
    }
}
