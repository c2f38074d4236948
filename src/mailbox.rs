//! # Mailbox
//!
//! A one-slot rendezvous between two threads. Two binary semaphores
//! guarantee at most one value in flight: `box_free` gates the sender,
//! `data_valid` gates the receiver, and each side hands the baton to the
//! other. `send` blocks until the previous value has been drained;
//! `recv` blocks until a value has been stored.

use core::cell::UnsafeCell;

use crate::sema::Semaphore;

pub struct Mailbox {
    slot: UnsafeCell<u32>,
    /// 1 while the slot is empty and a sender may store.
    box_free: Semaphore,
    /// 1 while the slot holds a value not yet received.
    data_valid: Semaphore,
}

// The slot is only written between bwait(box_free) and
// bsignal(data_valid), and only read between the converse pair.
unsafe impl Sync for Mailbox {}

impl Mailbox {
    /// An empty mailbox, ready for a sender.
    pub const fn new() -> Self {
        Self {
            slot: UnsafeCell::new(0),
            box_free: Semaphore::new(1),
            data_valid: Semaphore::new(0),
        }
    }

    /// Reset to empty, discarding any in-flight value.
    pub fn init(&self) {
        self.box_free.init(1);
        self.data_valid.init(0);
    }

    /// Store a value, blocking until the previous one is drained.
    /// Thread-only.
    pub fn send(&self, data: u32) {
        self.box_free.bwait();
        unsafe {
            *self.slot.get() = data;
        }
        self.data_valid.bsignal();
    }

    /// Take the stored value, blocking until one arrives. Thread-only.
    pub fn recv(&self) -> u32 {
        self.data_valid.bwait();
        let data = unsafe { *self.slot.get() };
        self.box_free.bsignal();
        data
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
