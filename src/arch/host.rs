//! # Host stand-in port
//!
//! No-op stubs with the same surface as the target port, compiled on
//! anything that is not a bare-metal ARM target. The kernel's state
//! machines never learn the difference, which is what lets the unit
//! tests drive them on the host. Starting a thread is the one operation
//! with no sensible stand-in, so it panics.

pub(crate) fn disable_interrupts() {}

pub(crate) fn wait_for_interrupt() {}

pub(crate) fn yield_now() {}

pub(crate) fn restart_time_slice() {}

pub(crate) fn systick_init(_time_slice_cycles: u32) {}

pub(crate) fn set_exception_priorities() {}

pub(crate) unsafe fn start_first_thread(_sp: *mut u32) -> ! {
    unimplemented!("thread launch requires the Cortex-M target")
}

pub(crate) fn tick_timer_init() {}

pub(crate) fn tick_timer_remaining() -> u32 {
    0
}

pub(crate) fn tick_timer_restart() {}

pub(crate) fn periodic_timer_init(_slot: usize, _period: u32, _priority: u8) {}

pub(crate) fn switch_init(_line: usize, _priority: u8) {}

pub(crate) fn switch_level_high(_line: usize) -> bool {
    true
}

pub(crate) fn switch_mask(_line: usize) {}

pub(crate) fn switch_rearm(_line: usize) {}
