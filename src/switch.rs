//! # Switch tasks
//!
//! Edge-triggered background tasks for up to [`NUM_SWITCHES`] input
//! lines with internal pull-ups (negative logic: the line reads high
//! released, low pressed). The lines fire on both edges so a press and
//! its release each get a debounce pass.
//!
//! On an edge the port handler masks the line and hands over to
//! [`on_edge`]: the user task runs iff the last settled level was
//! released (so only press edges invoke it), then a short-lived
//! high-priority thread sleeps out the bounce, resamples the settled
//! level, rearms the line, and dies. Like periodic tasks, switch tasks
//! run at interrupt priority and must not block.

use core::ptr::addr_of_mut;

use crate::arch;
use crate::config::{DEBOUNCE_PRIORITY, DEBOUNCE_TICKS, NUM_SWITCHES, STACK_WORDS};
use crate::kernel;
use crate::sync;

// ---------------------------------------------------------------------------
// Line slots
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
struct SwitchSlot {
    task: Option<fn()>,
    /// Level observed after the last debounce settled. High means the
    /// switch was released, so the next edge is a press.
    released: bool,
}

const EMPTY: SwitchSlot = SwitchSlot {
    task: None,
    released: true,
};

static mut SLOTS: [SwitchSlot; NUM_SWITCHES] = [EMPTY; NUM_SWITCHES];

/// Whether a press edge (rather than a release edge) should invoke the
/// user task, given the last settled level.
fn is_press(released: bool) -> bool {
    released
}

/// Arm the next free switch line with a background task.
///
/// The first registration takes line 0, the second line 1; a third
/// fails with `Err(())` and disturbs nothing. `priority` is the NVIC
/// priority of the line's edge interrupt.
pub fn add_switch_task(task: fn(), priority: u8) -> Result<(), ()> {
    sync::with(|_| unsafe {
        let slots = &mut *addr_of_mut!(SLOTS);
        let line = slots.iter().position(|s| s.task.is_none()).ok_or(())?;
        slots[line].task = Some(task);
        arch::switch_init(line, priority);
        slots[line].released = arch::switch_level_high(line);
        Ok(())
    })
}

/// Edge interrupt body for one line. The port handler dispatches here
/// once per line whose masked status bit is set.
pub(crate) fn on_edge(line: usize) {
    arch::switch_mask(line);
    let slot = unsafe { (*addr_of_mut!(SLOTS))[line] };
    if is_press(slot.released) {
        if let Some(task) = slot.task {
            task();
        }
    }
    // The debounce thread owns clearing and rearming the line. If no
    // TCB is free for it, rearm immediately and live with the bounce.
    let debounce: fn() = match line {
        0 => debounce_line0,
        _ => debounce_line1,
    };
    if kernel::add_thread(debounce, STACK_WORDS * 4, DEBOUNCE_PRIORITY).is_err() {
        arch::switch_rearm(line);
    }
}

fn debounce_line0() {
    debounce(0)
}

fn debounce_line1() {
    debounce(1)
}

/// Body of the one-shot debounce thread: wait out the bounce, record
/// the settled level, rearm the line, die.
fn debounce(line: usize) -> ! {
    kernel::sleep(DEBOUNCE_TICKS);
    unsafe {
        (*addr_of_mut!(SLOTS))[line].released = arch::switch_level_high(line);
    }
    arch::switch_rearm(line);
    kernel::kill()
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn task() {}

    #[test]
    fn only_press_edges_invoke() {
        // Released line: the edge is a press.
        assert!(is_press(true));
        // Pressed line: the edge is the release, no invocation.
        assert!(!is_press(false));
    }

    #[test]
    fn lines_fill_in_order_then_exhaust() {
        // Host arch stubs make the hardware side a no-op.
        assert!(add_switch_task(task, 2).is_ok());
        assert!(add_switch_task(task, 2).is_ok());
        assert!(add_switch_task(task, 2).is_err());
        unsafe {
            let slots = &mut *addr_of_mut!(SLOTS);
            assert!(slots.iter().all(|s| s.task.is_some()));
            *slots = [EMPTY; NUM_SWITCHES];
        }
    }
}
