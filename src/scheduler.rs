//! # Kernel core
//!
//! The thread pool, the ready ring, and the scheduling decision. This
//! module is pure bookkeeping: nothing here touches hardware, so the
//! whole state machine runs under host unit tests. The arch layer calls
//! in from the PendSV and tick handlers; the public API in `kernel`
//! wraps every entry point in a critical section.
//!
//! ## Scheduling algorithm
//!
//! On every context switch the scheduler walks the ring exactly once,
//! starting one past the running thread, and picks the Active TCB with
//! the best (numerically lowest) priority. Starting one past the current
//! thread is what makes equal-priority threads rotate: the first of the
//! tied threads encountered in ring order wins, and the ring order
//! advances with the running thread. If the running thread was killed,
//! its links are still intact, so the walk starts from its old successor
//! and ends at its old predecessor.

use crate::config::{NUM_THREADS, NUM_PRIORITIES};
use crate::thread::{Tcb, ThreadState};

// ---------------------------------------------------------------------------
// Kernel state
// ---------------------------------------------------------------------------

/// All kernel bookkeeping: the TCB pool, the running-thread cursor, the
/// splice cursor, and the tick counter. Stored as a single static in
/// `kernel`; every mutation happens inside a critical section or inside
/// an exception handler.
pub struct Kernel {
    /// Fixed pool of TCBs. Slots with state `Free` are not in the ring.
    pub(crate) tcbs: [Tcb; NUM_THREADS],

    /// Index of the running thread (the TCB whose stack the CPU is on).
    pub(crate) run: usize,

    /// Where the next created thread is spliced in: immediately after
    /// the most recently inserted one.
    pub(crate) last_inserted: usize,

    /// Number of TCBs whose state is not `Free`.
    pub(crate) thread_count: u32,

    /// Next thread id to hand out. Ids are never reused.
    pub(crate) next_id: u32,

    /// Kernel tick counter, units of 1 ms. Written only by the tick
    /// handler; read via `kernel::ticks_now`.
    pub(crate) ticks: u32,
}

impl Kernel {
    pub(crate) const fn new() -> Self {
        Self {
            tcbs: [Tcb::EMPTY; NUM_THREADS],
            run: 0,
            last_inserted: 0,
            thread_count: 0,
            next_id: 0,
            ticks: 0,
        }
    }

    /// First slot whose state is `Free`, if any.
    fn find_free_slot(&self) -> Option<usize> {
        self.tcbs.iter().position(|t| t.state == ThreadState::Free)
    }

    /// Create a thread and splice it into the ring.
    ///
    /// The first thread ever added forms a self-looping ring of one and
    /// becomes the initial running thread. Later threads are linked in
    /// right after `last_inserted`. Returns the new thread's id, or
    /// `Err(())` with nothing mutated when the pool is exhausted.
    pub(crate) fn add_thread(&mut self, entry: fn(), priority: u8) -> Result<u32, ()> {
        debug_assert!(priority < NUM_PRIORITIES);

        let slot = if self.thread_count == 0 {
            self.tcbs[0].next = 0;
            self.tcbs[0].prev = 0;
            self.last_inserted = 0;
            self.run = 0;
            0
        } else {
            let slot = self.find_free_slot().ok_or(())?;
            let after = self.last_inserted;
            let succ = self.tcbs[after].next;
            // Keeping both links makes unsplicing on kill O(1).
            self.tcbs[slot].next = succ;
            self.tcbs[slot].prev = after;
            self.tcbs[succ].prev = slot;
            self.tcbs[after].next = slot;
            self.last_inserted = slot;
            slot
        };

        let id = self.next_id;
        self.next_id += 1;
        self.tcbs[slot].activate(id, priority, entry);
        self.thread_count += 1;
        Ok(id)
    }

    /// Unlink the running thread and release its slot.
    ///
    /// The victim's own links are left pointing into the ring so the
    /// next scheduling pass can still start its walk from them. The
    /// caller must request a yield before any code that could observe
    /// the killed thread.
    pub(crate) fn kill_current(&mut self) {
        let run = self.run;
        debug_assert!(self.tcbs[run].state != ThreadState::Free);

        if self.last_inserted == run {
            self.last_inserted = self.tcbs[run].prev;
        }
        let (prev, next) = (self.tcbs[run].prev, self.tcbs[run].next);
        self.tcbs[prev].next = next;
        self.tcbs[next].prev = prev;
        self.tcbs[run].state = ThreadState::Free;
        self.tcbs[run].blocked_on = core::ptr::null();
        self.thread_count -= 1;
    }

    /// Put the running thread to sleep for `ticks` ticks (nonzero).
    pub(crate) fn sleep_current(&mut self, ticks: u32) {
        debug_assert!(ticks > 0);
        let run = self.run;
        self.tcbs[run].sleep_ticks = ticks;
        self.tcbs[run].state = ThreadState::Sleep;
    }

    /// Pick the next thread to run and advance the run cursor.
    ///
    /// Runs only inside the context-switch exception. The idle thread
    /// installed by `launch` guarantees at least one Active TCB, so the
    /// walk always finds a winner.
    pub(crate) fn schedule(&mut self) -> usize {
        let end = if self.tcbs[self.run].state == ThreadState::Free {
            self.tcbs[self.run].prev
        } else {
            self.run
        };

        let mut pt = self.run;
        let mut best: Option<usize> = None;
        let mut best_priority = u8::MAX;
        loop {
            pt = self.tcbs[pt].next;
            if self.tcbs[pt].state == ThreadState::Active
                && self.tcbs[pt].priority < best_priority
            {
                best_priority = self.tcbs[pt].priority;
                best = Some(pt);
            }
            if pt == end {
                break;
            }
        }

        debug_assert!(best.is_some(), "no Active thread in the ring");
        if let Some(next) = best {
            self.run = next;
        }
        self.run
    }

    /// One kernel tick: advance the clock and drain sleep counters,
    /// waking threads whose counter reaches zero. Runs to completion in
    /// the tick interrupt; never yields.
    pub(crate) fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        for tcb in self.tcbs.iter_mut() {
            if tcb.state == ThreadState::Sleep {
                tcb.sleep_ticks -= 1;
                if tcb.sleep_ticks == 0 {
                    tcb.state = ThreadState::Active;
                }
            }
        }
    }

    /// Id of the running thread.
    pub(crate) fn current_id(&self) -> u32 {
        self.tcbs[self.run].id
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn t() {}

    /// Collect the ring order starting from `start`, following `next`.
    fn ring_from(k: &Kernel, start: usize) -> Vec<usize> {
        let mut out = Vec::new();
        out.push(start);
        let mut pt = k.tcbs[start].next;
        while pt != start {
            out.push(pt);
            pt = k.tcbs[pt].next;
        }
        out
    }

    fn live_count(k: &Kernel) -> usize {
        k.tcbs.iter().filter(|t| t.state != ThreadState::Free).count()
    }

    #[test]
    fn first_thread_forms_singleton_ring() {
        let mut k = Kernel::new();
        k.add_thread(t, 3).unwrap();
        assert_eq!(k.run, 0);
        assert_eq!(k.tcbs[0].next, 0);
        assert_eq!(k.tcbs[0].prev, 0);
        assert_eq!(k.thread_count, 1);
    }

    #[test]
    fn threads_splice_in_insertion_order() {
        let mut k = Kernel::new();
        for _ in 0..4 {
            k.add_thread(t, 3).unwrap();
        }
        assert_eq!(ring_from(&k, 0), [0, 1, 2, 3]);
        // Backward links mirror the forward ones.
        assert_eq!(k.tcbs[0].prev, 3);
        assert_eq!(k.tcbs[2].prev, 1);
    }

    #[test]
    fn pool_exhaustion_fails_cleanly() {
        let mut k = Kernel::new();
        for _ in 0..NUM_THREADS {
            k.add_thread(t, 3).unwrap();
        }
        let count = k.thread_count;
        let next_id = k.next_id;
        assert!(k.add_thread(t, 3).is_err());
        assert_eq!(k.thread_count, count);
        assert_eq!(k.next_id, next_id);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut k = Kernel::new();
        k.add_thread(t, 3).unwrap();
        let b = k.add_thread(t, 3).unwrap();
        k.run = 1;
        k.kill_current();
        let c = k.add_thread(t, 3).unwrap();
        assert!(c > b);
    }

    #[test]
    fn ring_cardinality_matches_live_states() {
        let mut k = Kernel::new();
        for _ in 0..5 {
            k.add_thread(t, 2).unwrap();
        }
        assert_eq!(k.thread_count as usize, live_count(&k));

        k.run = 2;
        k.kill_current();
        assert_eq!(k.thread_count, 4);
        assert_eq!(k.thread_count as usize, live_count(&k));
        assert_eq!(ring_from(&k, 0), [0, 1, 3, 4]);
    }

    #[test]
    fn kill_fixes_last_inserted_cursor() {
        let mut k = Kernel::new();
        for _ in 0..3 {
            k.add_thread(t, 2).unwrap();
        }
        k.run = 2; // == last_inserted
        k.kill_current();
        assert_eq!(k.last_inserted, 1);
        // New thread splices after the repaired cursor.
        k.add_thread(t, 2).unwrap();
        assert_eq!(ring_from(&k, 0), [0, 1, 2]);
    }

    #[test]
    fn equal_priorities_rotate_round_robin() {
        let mut k = Kernel::new();
        for _ in 0..3 {
            k.add_thread(t, 3).unwrap();
        }
        assert_eq!(k.schedule(), 1);
        assert_eq!(k.schedule(), 2);
        assert_eq!(k.schedule(), 0);
        assert_eq!(k.schedule(), 1);
    }

    #[test]
    fn better_priority_always_wins() {
        let mut k = Kernel::new();
        for _ in 0..3 {
            k.add_thread(t, 5).unwrap();
        }
        k.add_thread(t, 1).unwrap(); // slot 3
        for _ in 0..4 {
            assert_eq!(k.schedule(), 3);
        }
        // Once it leaves the competition the others rotate again.
        k.tcbs[3].state = ThreadState::Sleep;
        k.tcbs[3].sleep_ticks = 5;
        assert_eq!(k.schedule(), 0);
        assert_eq!(k.schedule(), 1);
    }

    #[test]
    fn sleeping_and_blocked_threads_are_skipped() {
        let mut k = Kernel::new();
        for _ in 0..3 {
            k.add_thread(t, 3).unwrap();
        }
        k.tcbs[1].state = ThreadState::Blocked;
        k.tcbs[2].state = ThreadState::Sleep;
        k.tcbs[2].sleep_ticks = 1;
        assert_eq!(k.schedule(), 0);
        assert_eq!(k.schedule(), 0);
    }

    #[test]
    fn schedule_after_kill_walks_from_old_links() {
        let mut k = Kernel::new();
        for _ in 0..4 {
            k.add_thread(t, 3).unwrap();
        }
        k.run = 1;
        k.kill_current();
        // Victim's links still bracket the ring; its successor runs next.
        assert_eq!(k.schedule(), 2);
    }

    #[test]
    fn sleep_wakes_after_exactly_n_ticks() {
        let mut k = Kernel::new();
        k.add_thread(t, 3).unwrap();
        k.add_thread(t, 3).unwrap();
        k.run = 1;
        k.sleep_current(3);
        assert_eq!(k.tcbs[1].state, ThreadState::Sleep);

        k.tick();
        k.tick();
        assert_eq!(k.tcbs[1].state, ThreadState::Sleep);
        k.tick();
        assert_eq!(k.tcbs[1].state, ThreadState::Active);
        assert_eq!(k.tcbs[1].sleep_ticks, 0);
        assert_eq!(k.ticks, 3);
    }

    #[test]
    fn rebuilding_after_total_teardown() {
        let mut k = Kernel::new();
        k.add_thread(t, 3).unwrap();
        k.kill_current();
        assert_eq!(k.thread_count, 0);

        let id = k.add_thread(t, 4).unwrap();
        assert!(id > 0);
        assert_eq!(k.run, 0);
        assert_eq!(k.tcbs[0].next, 0);
        assert_eq!(k.tcbs[0].state, ThreadState::Active);
    }
}
