//! # Semaphores
//!
//! Counting and binary semaphores with a bounded FIFO waiter queue.
//!
//! The counter may go negative; when it does, its magnitude equals the
//! number of threads parked in the queue. Wakeups are strictly FIFO: the
//! thread released by the n-th signal after a blocking wait is the n-th
//! thread that blocked. `signal` and `bsignal` never block and are safe
//! to call from interrupt handlers; the wait variants are thread-only
//! because they suspend the caller.
//!
//! There is no cancellation and no timeout. `sleep` plus a watcher
//! thread is the only way to bound a wait.

use core::cell::UnsafeCell;

use crate::config::NUM_THREADS;
use crate::kernel;
use crate::scheduler::Kernel;
use crate::sync;
use crate::thread::ThreadState;

// ---------------------------------------------------------------------------
// Raw semaphore state
// ---------------------------------------------------------------------------

/// The raw record: a signed counter and a circular queue of waiting
/// thread indices. Embedded directly in `Semaphore`, `Fifo`, and
/// `Mailbox`; no allocation. All access happens under a critical
/// section, driven by the `Kernel` methods below.
pub struct SemState {
    pub(crate) value: i32,
    waiters: [usize; NUM_THREADS],
    head: usize,
    tail: usize,
}

impl SemState {
    pub(crate) const fn new(value: i32) -> Self {
        Self {
            value,
            waiters: [0; NUM_THREADS],
            head: 0,
            tail: 0,
        }
    }

    pub(crate) fn reset(&mut self, value: i32) {
        self.value = value;
        self.head = 0;
        self.tail = 0;
    }

    fn enqueue(&mut self, thread: usize) {
        self.waiters[self.tail] = thread;
        self.tail = (self.tail + 1) % NUM_THREADS;
    }

    fn dequeue(&mut self) -> Option<usize> {
        if self.head == self.tail {
            return None;
        }
        let thread = self.waiters[self.head];
        self.head = (self.head + 1) % NUM_THREADS;
        Some(thread)
    }

    pub(crate) fn waiter_count(&self) -> usize {
        (self.tail + NUM_THREADS - self.head) % NUM_THREADS
    }
}

// ---------------------------------------------------------------------------
// Kernel-side wait/signal state transitions
// ---------------------------------------------------------------------------

impl Kernel {
    /// Counting wait: decrement, and if the counter went negative park
    /// the running thread at the queue tail. Returns true when the
    /// caller must yield.
    pub(crate) fn sem_take(&mut self, sem: &mut SemState) -> bool {
        sem.value -= 1;
        if sem.value < 0 {
            self.block_current(sem);
            true
        } else {
            false
        }
    }

    /// Counting signal: increment, and if threads are still owed a
    /// permit release the queue head.
    pub(crate) fn sem_give(&mut self, sem: &mut SemState) {
        sem.value += 1;
        if sem.value <= 0 {
            self.wake_head(sem);
        }
    }

    /// One attempt at a binary wait. When the flag is clear the running
    /// thread parks and the caller must yield, then retry; when set, the
    /// flag is consumed.
    pub(crate) fn bsem_take(&mut self, sem: &mut SemState) -> bool {
        if sem.value == 0 {
            self.block_current(sem);
            true
        } else {
            sem.value = 0;
            false
        }
    }

    /// Binary signal: set the flag and wake at most one waiter. The
    /// woken thread re-checks the flag, so a third party that slips in
    /// first simply wins the race.
    pub(crate) fn bsem_give(&mut self, sem: &mut SemState) {
        if sem.value == 0 {
            self.wake_head(sem);
        }
        sem.value = 1;
    }

    fn block_current(&mut self, sem: &mut SemState) {
        let run = self.run;
        debug_assert!(self.tcbs[run].state == ThreadState::Active);
        self.tcbs[run].state = ThreadState::Blocked;
        self.tcbs[run].blocked_on = sem as *const SemState;
        sem.enqueue(run);
    }

    fn wake_head(&mut self, sem: &mut SemState) {
        if let Some(thread) = sem.dequeue() {
            self.tcbs[thread].state = ThreadState::Active;
            self.tcbs[thread].blocked_on = core::ptr::null();
        }
    }
}

// ---------------------------------------------------------------------------
// Public semaphore
// ---------------------------------------------------------------------------

/// A blocking semaphore, usable as either a counting or a binary one.
///
/// Declare as a static and share freely; all state lives inline.
///
/// ```ignore
/// static DATA_READY: Semaphore = Semaphore::new(0);
///
/// fn consumer() {
///     loop {
///         DATA_READY.wait();
///         // ...
///     }
/// }
/// ```
pub struct Semaphore {
    state: UnsafeCell<SemState>,
}

// State is only touched inside critical sections.
unsafe impl Sync for Semaphore {}

impl Semaphore {
    /// A semaphore with the given initial value.
    pub const fn new(value: i32) -> Self {
        Self {
            state: UnsafeCell::new(SemState::new(value)),
        }
    }

    /// Re-initialize: set the counter and empty the waiter queue.
    pub fn init(&self, value: i32) {
        sync::with(|_| unsafe {
            (*self.state.get()).reset(value);
        });
    }

    /// Decrement the counter, blocking while it would go negative.
    /// Thread-only.
    pub fn wait(&self) {
        let blocked = sync::with(|_| unsafe {
            kernel::kernel_mut().sem_take(&mut *self.state.get())
        });
        if blocked {
            kernel::suspend();
        }
    }

    /// Increment the counter and release the longest-waiting thread if
    /// any is owed a permit. ISR-safe.
    pub fn signal(&self) {
        sync::with(|_| unsafe {
            kernel::kernel_mut().sem_give(&mut *self.state.get());
        });
    }

    /// Binary wait: block while the flag is 0, then consume it.
    /// Thread-only.
    pub fn bwait(&self) {
        loop {
            let blocked = sync::with(|_| unsafe {
                kernel::kernel_mut().bsem_take(&mut *self.state.get())
            });
            if !blocked {
                return;
            }
            kernel::suspend();
        }
    }

    /// Binary signal: set the flag to 1 and wake at most one waiter.
    /// ISR-safe.
    pub fn bsignal(&self) {
        sync::with(|_| unsafe {
            kernel::kernel_mut().bsem_give(&mut *self.state.get());
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t() {}

    /// Kernel with `n` equal-priority threads, running thread 0.
    fn kernel_with(n: usize) -> Kernel {
        let mut k = Kernel::new();
        for _ in 0..n {
            k.add_thread(t, 3).unwrap();
        }
        k
    }

    #[test]
    fn take_with_permits_does_not_block() {
        let mut k = kernel_with(1);
        let mut s = SemState::new(2);
        assert!(!k.sem_take(&mut s));
        assert_eq!(s.value, 1);
        assert_eq!(k.tcbs[0].state, ThreadState::Active);
    }

    #[test]
    fn negative_value_counts_waiters() {
        let mut k = kernel_with(3);
        let mut s = SemState::new(0);
        for run in 0..3 {
            k.run = run;
            assert!(k.sem_take(&mut s));
        }
        assert_eq!(s.value, -3);
        assert_eq!(s.waiter_count(), 3);
        for run in 0..3 {
            assert_eq!(k.tcbs[run].state, ThreadState::Blocked);
            assert_eq!(k.tcbs[run].blocked_on, &s as *const SemState);
        }
    }

    #[test]
    fn signals_release_in_fifo_order() {
        let mut k = kernel_with(4);
        let mut s = SemState::new(0);
        // A, B, C block in that order.
        for run in 0..3 {
            k.run = run;
            k.sem_take(&mut s);
        }

        k.sem_give(&mut s);
        assert_eq!(k.tcbs[0].state, ThreadState::Active);
        assert_eq!(k.tcbs[1].state, ThreadState::Blocked);

        k.sem_give(&mut s);
        assert_eq!(k.tcbs[1].state, ThreadState::Active);
        assert_eq!(k.tcbs[2].state, ThreadState::Blocked);

        k.sem_give(&mut s);
        assert_eq!(k.tcbs[2].state, ThreadState::Active);

        // A fourth signal leaves a spare permit and nobody queued.
        k.sem_give(&mut s);
        assert_eq!(s.value, 1);
        assert_eq!(s.waiter_count(), 0);
    }

    #[test]
    fn wait_signal_round_trip_is_identity() {
        let mut k = kernel_with(1);
        let mut s = SemState::new(1);
        assert!(!k.sem_take(&mut s));
        k.sem_give(&mut s);
        assert_eq!(s.value, 1);
        assert_eq!(s.waiter_count(), 0);
    }

    #[test]
    fn value_accounting_holds() {
        let mut k = kernel_with(4);
        let mut s = SemState::new(2);
        let initial = s.value;
        let (mut takes, mut gives) = (0, 0);

        for run in 0..4 {
            k.run = run;
            k.sem_take(&mut s);
            takes += 1;
        }
        k.sem_give(&mut s);
        gives += 1;

        assert_eq!(s.value, initial - takes + gives);
        assert_eq!(s.waiter_count() as i32, -s.value);
    }

    #[test]
    fn binary_take_consumes_flag() {
        let mut k = kernel_with(2);
        let mut s = SemState::new(1);
        assert!(!k.bsem_take(&mut s));
        assert_eq!(s.value, 0);
        // Second taker parks.
        k.run = 1;
        assert!(k.bsem_take(&mut s));
        assert_eq!(k.tcbs[1].state, ThreadState::Blocked);
    }

    #[test]
    fn binary_give_wakes_at_most_one() {
        let mut k = kernel_with(3);
        let mut s = SemState::new(0);
        k.run = 0;
        k.bsem_take(&mut s);
        k.run = 1;
        k.bsem_take(&mut s);

        k.bsem_give(&mut s);
        assert_eq!(s.value, 1);
        assert_eq!(k.tcbs[0].state, ThreadState::Active);
        assert_eq!(k.tcbs[1].state, ThreadState::Blocked);

        // Flag already set: no waiter is disturbed.
        k.bsem_give(&mut s);
        assert_eq!(k.tcbs[1].state, ThreadState::Blocked);
    }

    #[test]
    fn binary_give_on_empty_queue_only_sets_flag() {
        let mut k = kernel_with(1);
        let mut s = SemState::new(0);
        k.bsem_give(&mut s);
        assert_eq!(s.value, 1);
        assert_eq!(s.waiter_count(), 0);
        assert_eq!(k.tcbs[0].state, ThreadState::Active);
    }

    #[test]
    fn woken_thread_clears_back_reference() {
        let mut k = kernel_with(1);
        let mut s = SemState::new(0);
        k.sem_take(&mut s);
        assert!(!k.tcbs[0].blocked_on.is_null());
        k.sem_give(&mut s);
        assert!(k.tcbs[0].blocked_on.is_null());
    }
}
