//! # Thread Control Block
//!
//! Defines the per-thread record and its state machine. Threads live in a
//! fixed pool inside the kernel; a Free TCB is a slot waiting to be
//! reused, everything else is linked into the circular ready ring the
//! scheduler traverses.

use crate::config::{STACK_WORDS, NUM_PRIORITIES};
use crate::sema::SemState;

// ---------------------------------------------------------------------------
// Thread state machine
// ---------------------------------------------------------------------------

/// Execution state of a thread.
///
/// ```text
///   ┌──────┐  add_thread   ┌────────┐   sleep()    ┌───────┐
///   │ Free │ ────────────► │ Active │ ───────────► │ Sleep │
///   └──────┘               └────────┘ ◄─────────── └───────┘
///       ▲                    │    ▲     tick = 0
///       │ kill()             │    │
///       └────────────────────┤    │ signal()
///                     wait() ▼    │
///                          ┌─────────┐
///                          │ Blocked │
///                          └─────────┘
/// ```
///
/// A TCB is linked into the ring iff its state is not `Free`. Sleep and
/// Blocked threads stay in the ring; the scheduler just skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Unallocated slot; not in the ring.
    Free,
    /// Runnable (or currently running on the CPU).
    Active,
    /// Dormant until the tick service drains `sleep_ticks`.
    Sleep,
    /// Waiting in some semaphore's queue.
    Blocked,
}

// ---------------------------------------------------------------------------
// Per-thread stack
// ---------------------------------------------------------------------------

/// Private stack memory for one thread. Aligned to 8 bytes as required
/// by the AAPCS at exception entry.
#[repr(align(8))]
pub(crate) struct Stack(pub(crate) [u32; STACK_WORDS]);

/// Number of 32-bit words in the synthetic exception frame: R4–R11
/// (software-saved) below R0–R3, R12, LR, PC, xPSR (hardware-stacked).
const FRAME_WORDS: usize = 16;

/// xPSR seed value: Thumb bit set, everything else clear.
const PSR_THUMB: u32 = 0x0100_0000;

// ---------------------------------------------------------------------------
// Thread Control Block
// ---------------------------------------------------------------------------

/// The per-thread record: saved stack pointer, ring links, identity,
/// state, priority, and synchronization back-reference.
///
/// Ring links are indices into the kernel's TCB array rather than
/// pointers; splice and unsplice stay O(1) and the pool needs no heap.
/// `next`/`prev` are meaningless while the slot is Free.
pub struct Tcb {
    /// Saved process stack pointer. Written by the context-switch
    /// handler on save, read on restore; points into `stack`.
    pub(crate) sp: *mut u32,

    /// Index of the next TCB in the ring.
    pub(crate) next: usize,

    /// Index of the previous TCB in the ring.
    pub(crate) prev: usize,

    /// Monotonically increasing identifier, assigned at creation and
    /// never reused, even when the slot is.
    pub(crate) id: u32,

    /// Current state; `Free` marks the slot reusable.
    pub(crate) state: ThreadState,

    /// Scheduling priority, 0 (highest) to `NUM_PRIORITIES - 1`.
    pub(crate) priority: u8,

    /// Ticks left to sleep. Nonzero iff state is `Sleep`.
    pub(crate) sleep_ticks: u32,

    /// The semaphore this thread is queued on. Non-null iff state is
    /// `Blocked`.
    pub(crate) blocked_on: *const SemState,

    /// Inline stack memory.
    pub(crate) stack: Stack,
}

impl Tcb {
    /// An unallocated slot, used to build the kernel's static pool.
    pub(crate) const EMPTY: Tcb = Tcb {
        sp: core::ptr::null_mut(),
        next: 0,
        prev: 0,
        id: 0,
        state: ThreadState::Free,
        priority: 0,
        sleep_ticks: 0,
        blocked_on: core::ptr::null(),
        stack: Stack([0; STACK_WORDS]),
    };

    /// Claim this slot for a new thread and seed its stack.
    ///
    /// Ring links are the caller's job; this only fills the record and
    /// builds the synthetic exception frame.
    pub(crate) fn activate(&mut self, id: u32, priority: u8, entry: fn()) {
        debug_assert!(self.state == ThreadState::Free);
        debug_assert!(priority < NUM_PRIORITIES);
        self.id = id;
        self.priority = priority;
        self.state = ThreadState::Active;
        self.sleep_ticks = 0;
        self.blocked_on = core::ptr::null();
        self.seed_stack(entry);
    }

    /// Build the initial exception frame so the first context restore
    /// starts the thread at `entry` in Thumb state.
    ///
    /// ## Stack layout (top = high address, growing down)
    ///
    /// ```text
    ///   xPSR  (Thumb bit set)
    ///   PC    (entry)
    ///   LR    (thread_exit trampoline)
    ///   R12, R3, R2, R1, R0          hardware-stacked frame
    ///   R11 .. R4                    software-saved area
    ///                                ◄── sp after seeding
    /// ```
    fn seed_stack(&mut self, entry: fn()) {
        let top = STACK_WORDS;
        let frame = top - FRAME_WORDS;

        // Software-saved R4–R11 and the hardware frame's R0–R3, R12.
        for word in &mut self.stack.0[frame..top - 3] {
            *word = 0;
        }
        // A thread whose entry function returns lands in the exit
        // trampoline and is killed rather than running off into garbage.
        self.stack.0[top - 3] = crate::kernel::thread_exit as usize as u32; // LR
        self.stack.0[top - 2] = entry as usize as u32; // PC
        self.stack.0[top - 1] = PSR_THUMB; // xPSR

        self.sp = self.stack.0[frame..].as_mut_ptr();
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_stub() {}

    #[test]
    fn empty_slot_is_free() {
        let tcb = Tcb::EMPTY;
        assert_eq!(tcb.state, ThreadState::Free);
        assert!(tcb.sp.is_null());
        assert!(tcb.blocked_on.is_null());
    }

    #[test]
    fn activate_fills_record() {
        let mut tcb = Tcb::EMPTY;
        tcb.activate(42, 3, entry_stub);
        assert_eq!(tcb.id, 42);
        assert_eq!(tcb.priority, 3);
        assert_eq!(tcb.state, ThreadState::Active);
        assert_eq!(tcb.sleep_ticks, 0);
        assert!(tcb.blocked_on.is_null());
    }

    #[test]
    fn seeded_frame_shape() {
        let mut tcb = Tcb::EMPTY;
        tcb.activate(0, 0, entry_stub);

        // xPSR carries the Thumb bit, PC the entry address.
        assert_eq!(tcb.stack.0[STACK_WORDS - 1], PSR_THUMB);
        assert_eq!(
            tcb.stack.0[STACK_WORDS - 2],
            entry_stub as usize as u32
        );
        assert_eq!(
            tcb.stack.0[STACK_WORDS - 3],
            crate::kernel::thread_exit as usize as u32
        );
        // R0–R3, R12 and the software area are zeroed.
        for i in (STACK_WORDS - FRAME_WORDS)..(STACK_WORDS - 3) {
            assert_eq!(tcb.stack.0[i], 0);
        }
    }

    #[test]
    fn seeded_sp_is_aligned_and_in_bounds() {
        let mut tcb = Tcb::EMPTY;
        tcb.activate(0, 0, entry_stub);

        let base = tcb.stack.0.as_ptr() as usize;
        let sp = tcb.sp as usize;
        assert_eq!(sp % 8, 0);
        assert_eq!(sp, base + (STACK_WORDS - FRAME_WORDS) * 4);
    }
}
