//! # SPSC stream
//!
//! A single-producer, single-consumer circular buffer feeding samples
//! from one interrupt handler to one consuming thread.
//!
//! The producer side is lock-free: `put` never disables interrupts, it
//! either stores and publishes or reports the stream full so the ISR can
//! drop the sample and move on. The consumer side blocks on a counting
//! semaphore whose value is the number of unread elements. With exactly
//! one consumer there is no get-side mutex; the semaphore release is
//! what publishes a slot to the consumer, with compiler fences pinning
//! the slot write before the index publish.

use core::cell::UnsafeCell;
use core::sync::atomic::{compiler_fence, Ordering};

use crate::config::FIFO_CAPACITY;
use crate::sema::Semaphore;
use crate::sync;

// ---------------------------------------------------------------------------
// Ring state
// ---------------------------------------------------------------------------

/// Index arithmetic and storage. `put` and `get` are free-running
/// counters; `idx & mask` selects the slot, `put - get` is the
/// occupancy. Capacity is a power of two no larger than the backing
/// array.
pub(crate) struct FifoState {
    buf: [u32; FIFO_CAPACITY],
    put: usize,
    get: usize,
    mask: usize,
}

impl FifoState {
    pub(crate) const fn new() -> Self {
        Self {
            buf: [0; FIFO_CAPACITY],
            put: 0,
            get: 0,
            mask: FIFO_CAPACITY - 1,
        }
    }

    /// Empty the ring and select a capacity: `size` rounded up to a
    /// power of two and clamped to the backing array.
    pub(crate) fn reset(&mut self, size: usize) {
        let size = size.next_power_of_two().clamp(2, FIFO_CAPACITY);
        self.put = 0;
        self.get = 0;
        self.mask = size - 1;
    }

    pub(crate) fn capacity(&self) -> usize {
        self.mask + 1
    }

    pub(crate) fn len(&self) -> usize {
        self.put.wrapping_sub(self.get)
    }

    /// Producer side. Returns false (sample dropped) when full.
    pub(crate) fn try_put(&mut self, data: u32) -> bool {
        if self.len() == self.capacity() {
            return false;
        }
        self.buf[self.put & self.mask] = data;
        // Slot contents must be visible before the index moves.
        compiler_fence(Ordering::Release);
        self.put = self.put.wrapping_add(1);
        true
    }

    /// Read the slot at the head without consuming it. The caller must
    /// already hold a permit proving the slot is filled.
    pub(crate) fn front(&self) -> u32 {
        debug_assert!(self.len() > 0);
        compiler_fence(Ordering::Acquire);
        self.buf[self.get & self.mask]
    }

    /// Consume the head slot.
    pub(crate) fn advance_get(&mut self) {
        debug_assert!(self.len() > 0);
        self.get = self.get.wrapping_add(1);
    }
}

// ---------------------------------------------------------------------------
// Public stream
// ---------------------------------------------------------------------------

/// The kernel data stream: ISR producer, single thread consumer.
///
/// ```ignore
/// static SAMPLES: Fifo = Fifo::new();
///
/// // in main, before launch:
/// SAMPLES.init(32);
///
/// // in a sampling ISR:
/// let _ = SAMPLES.put(raw);
///
/// // in the consumer thread:
/// let sample = SAMPLES.get();
/// ```
pub struct Fifo {
    state: UnsafeCell<FifoState>,
    /// Counts unread elements; `get` blocks on it.
    available: Semaphore,
}

// One producer context, one consumer thread; index updates are
// fenced or inside critical sections.
unsafe impl Sync for Fifo {}

impl Fifo {
    pub const fn new() -> Self {
        Self {
            state: UnsafeCell::new(FifoState::new()),
            available: Semaphore::new(0),
        }
    }

    /// Empty the stream and set its capacity (rounded up to a power of
    /// two, clamped to `FIFO_CAPACITY`). Call before `launch`, or with
    /// both endpoints quiescent.
    pub fn init(&self, size: usize) {
        sync::with(|_| unsafe {
            (*self.state.get()).reset(size);
        });
        self.available.init(0);
    }

    /// Append one sample. ISR-safe and non-blocking: returns false and
    /// discards the sample when the stream is full.
    pub fn put(&self, data: u32) -> bool {
        let stored = unsafe { (*self.state.get()).try_put(data) };
        if stored {
            self.available.signal();
        }
        stored
    }

    /// Remove the oldest sample, blocking while the stream is empty.
    /// Thread-only; at most one consumer.
    pub fn get(&self) -> u32 {
        self.available.wait();
        let data = unsafe { (*self.state.get()).front() };
        sync::with(|_| unsafe {
            (*self.state.get()).advance_get();
        });
        data
    }

    /// Number of unread samples. Greater than zero means `get` returns
    /// without blocking.
    pub fn len(&self) -> usize {
        unsafe { (*self.state.get()).len() }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Fifo {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_rounds_size_to_power_of_two() {
        let mut f = FifoState::new();
        f.reset(16);
        assert_eq!(f.capacity(), 16);
        f.reset(20);
        assert_eq!(f.capacity(), 32);
        f.reset(0);
        assert_eq!(f.capacity(), 2);
        f.reset(10_000);
        assert_eq!(f.capacity(), FIFO_CAPACITY);
    }

    #[test]
    fn preserves_order() {
        let mut f = FifoState::new();
        f.reset(8);
        for v in 1..=5 {
            assert!(f.try_put(v));
        }
        for v in 1..=5 {
            assert_eq!(f.front(), v);
            f.advance_get();
        }
        assert_eq!(f.len(), 0);
    }

    #[test]
    fn drops_when_full() {
        let mut f = FifoState::new();
        f.reset(4);
        for v in 0..4 {
            assert!(f.try_put(v));
        }
        assert!(!f.try_put(99));
        assert_eq!(f.len(), 4);
        // Contents untouched by the failed put.
        assert_eq!(f.front(), 0);
    }

    #[test]
    fn put_after_drain_reuses_slots() {
        let mut f = FifoState::new();
        f.reset(2);
        assert!(f.try_put(1));
        assert!(f.try_put(2));
        f.advance_get();
        assert!(f.try_put(3));
        assert_eq!(f.front(), 2);
        f.advance_get();
        assert_eq!(f.front(), 3);
    }

    #[test]
    fn len_tracks_put_and_get() {
        let mut f = FifoState::new();
        f.reset(8);
        assert_eq!(f.len(), 0);
        f.try_put(7);
        f.try_put(8);
        assert_eq!(f.len(), 2);
        f.advance_get();
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn index_wrap_is_harmless() {
        let mut f = FifoState::new();
        f.reset(4);
        // Force the free-running counters close to the usize boundary.
        f.put = usize::MAX - 1;
        f.get = usize::MAX - 1;
        assert!(f.try_put(41));
        assert!(f.try_put(42));
        assert_eq!(f.len(), 2);
        assert_eq!(f.front(), 41);
        f.advance_get();
        assert_eq!(f.front(), 42);
    }
}
