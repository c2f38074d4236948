//! # Kernel API
//!
//! The global kernel instance and the thread-facing entry points:
//! startup, thread creation, and the voluntary suspension points.
//!
//! ## Startup sequence
//!
//! ```text
//! reset handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()         ← interrupts off, tick timer armed
//!         ├─► kernel::add_thread()   ← register threads (×N)
//!         ├─► Fifo::init() / ...     ← prepare channels
//!         └─► kernel::launch(slice)  ← idle thread, SysTick, first thread
//! ```
//!
//! After `launch` the system is fully preemptive: SysTick expires the
//! time slice and pends the context-switch exception; `suspend`,
//! `sleep`, blocking semaphore operations, and `kill` pend it early.

use core::ptr::{addr_of, addr_of_mut};

use crate::arch;
use crate::config::IDLE_PRIORITY;
use crate::scheduler::Kernel;
use crate::sync;

// ---------------------------------------------------------------------------
// Global kernel instance
// ---------------------------------------------------------------------------

/// The kernel singleton. Statically initialized, so it is in a usable
/// (if empty) state from reset onward.
static mut KERNEL: Kernel = Kernel::new();

/// Access the kernel singleton.
///
/// # Safety
/// The caller must hold a critical section, or be the context-switch /
/// tick handler (which cannot be preempted by anything that touches the
/// kernel).
pub(crate) unsafe fn kernel_mut() -> &'static mut Kernel {
    &mut *addr_of_mut!(KERNEL)
}

/// Volatile read of the tick counter; callable from any context.
pub(crate) fn ticks_now() -> u32 {
    unsafe { core::ptr::read_volatile(addr_of!(KERNEL.ticks)) }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Initialize the kernel: interrupts stay disabled until [`launch`],
/// and the 1 ms tick timer is configured (it starts counting but cannot
/// fire yet).
///
/// Call exactly once, before any other kernel function.
pub fn init() {
    arch::disable_interrupts();
    arch::tick_timer_init();
}

/// Start preemptive scheduling. **Does not return.**
///
/// Installs the idle thread, configures the context-switch and SysTick
/// exception priorities, arms SysTick with the requested time slice (in
/// bus cycles, limited to the 24-bit SysTick range), and restores the
/// context of the best-priority thread. Interrupts come up with the
/// first thread.
///
/// At least one call to [`add_thread`] should precede this; with none,
/// the idle thread simply runs alone.
pub fn launch(time_slice_cycles: u32) -> ! {
    // The scheduler's fallback: always present, lowest priority, never
    // blocks, never killed.
    let _ = add_thread(idle_thread, 0, IDLE_PRIORITY);

    arch::set_exception_priorities();
    arch::systick_init(time_slice_cycles);

    let first_sp = sync::with(|_| unsafe {
        let k = kernel_mut();
        let first = k.schedule();
        k.tcbs[first].sp
    });
    unsafe { arch::start_first_thread(first_sp) }
}

fn idle_thread() {
    loop {
        arch::wait_for_interrupt();
    }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// Create a thread running `entry` at `priority` (0 highest, 7 lowest).
///
/// Stacks are fixed-size; `stack_bytes` is accepted for interface
/// compatibility and checked against the fixed capacity in debug
/// builds. Returns the new thread's id, or `Err(())` when every TCB is
/// taken. ISR-safe.
pub fn add_thread(entry: fn(), stack_bytes: usize, priority: u8) -> Result<u32, ()> {
    debug_assert!(stack_bytes <= crate::config::STACK_WORDS * 4);
    let _ = stack_bytes;
    sync::with(|_| unsafe { kernel_mut().add_thread(entry, priority) })
}

/// Id of the calling thread.
pub fn id() -> u32 {
    sync::with(|_| unsafe { kernel_mut().current_id() })
}

/// Give up the rest of the current time slice: restart the slice timer
/// and pend a context switch. The scheduler may well pick the caller
/// again if nothing better is runnable.
pub fn suspend() {
    arch::restart_time_slice();
    arch::yield_now();
}

/// Put the calling thread to sleep for `ticks` kernel ticks (1 ms
/// each). The thread becomes runnable again when the tick service
/// drains the counter — exactly `ticks` ticks later, never earlier.
/// `sleep(0)` degenerates to [`suspend`].
pub fn sleep(ticks: u32) {
    if ticks == 0 {
        suspend();
        return;
    }
    sync::with(|_| unsafe {
        kernel_mut().sleep_current(ticks);
    });
    suspend();
}

/// Kill the calling thread: unlink it from the ring, free its TCB, and
/// switch away. The slot may be reused by `add_thread` immediately.
pub fn kill() -> ! {
    sync::with(|_| unsafe {
        kernel_mut().kill_current();
    });
    suspend();
    // The pending switch fires at the next instruction boundary; this
    // thread's stack is only touched until then.
    loop {
        arch::wait_for_interrupt();
    }
}

/// Landing pad for threads whose entry function returns.
pub(crate) fn thread_exit() -> ! {
    kill()
}
