//! # Cortex-M4 core port
//!
//! Context switching via PendSV, time slicing via SysTick, and the
//! one-way shim that starts the first thread.
//!
//! ## Context switch mechanism
//!
//! Threads run on the process stack (PSP); exceptions and the kernel
//! run on the main stack (MSP). On exception entry the hardware stacks
//! R0–R3, R12, LR, PC, and xPSR onto the process stack; the PendSV
//! handler saves R4–R11 below them, records PSP in the outgoing TCB,
//! asks the scheduler for the next thread, and unwinds the same layout
//! from the incoming TCB's stack. FP context is not preserved — build
//! for the soft-float ABI.
//!
//! ## Exception priorities
//!
//! PendSV and SysTick both sit at priority 7, the lowest on this part,
//! so a context switch can never preempt an in-progress interrupt
//! handler and SysTick never delays the kernel tick timer.

use core::arch::{asm, naked_asm};

use crate::kernel;

// System control block registers.
const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;

// SysTick.
const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
const SYST_RVR: *mut u32 = 0xE000_E014 as *mut u32;
const SYST_CVR: *mut u32 = 0xE000_E018 as *mut u32;

/// ICSR bit that pends the PendSV exception.
const PENDSVSET: u32 = 1 << 28;

/// Enable | tick interrupt | core clock source.
const SYST_RUN: u32 = 0x7;

// ---------------------------------------------------------------------------
// Interrupt control
// ---------------------------------------------------------------------------

/// Mask interrupts until `launch` brings up the first thread.
pub(crate) fn disable_interrupts() {
    cortex_m::interrupt::disable();
}

/// Park the CPU until the next interrupt. Used by the idle thread and
/// by `kill` while its pending switch lands.
pub(crate) fn wait_for_interrupt() {
    cortex_m::asm::wfi();
}

// ---------------------------------------------------------------------------
// Yield / time slice
// ---------------------------------------------------------------------------

/// Request a context switch at the next instruction boundary.
#[inline]
pub(crate) fn yield_now() {
    unsafe {
        core::ptr::write_volatile(ICSR, PENDSVSET);
    }
}

/// Restart the current time slice. Any write to the SysTick current
/// value register clears it and the counter reloads.
#[inline]
pub(crate) fn restart_time_slice() {
    unsafe {
        core::ptr::write_volatile(SYST_CVR, 0);
    }
}

/// Arm SysTick to expire every `time_slice_cycles` bus cycles.
/// The reload register is 24 bits wide; slices beyond that are clipped.
pub(crate) fn systick_init(time_slice_cycles: u32) {
    let reload = time_slice_cycles.clamp(2, 1 << 24) - 1;
    unsafe {
        core::ptr::write_volatile(SYST_RVR, reload);
        core::ptr::write_volatile(SYST_CVR, 0);
        core::ptr::write_volatile(SYST_CSR, SYST_RUN);
    }
}

/// Drop PendSV and SysTick to priority 7, the lowest the TM4C's 3-bit
/// priority field can express.
pub(crate) fn set_exception_priorities() {
    unsafe {
        // SHPR3: bits 23:16 = PendSV, bits 31:24 = SysTick.
        let v = core::ptr::read_volatile(SHPR3);
        core::ptr::write_volatile(SHPR3, (v & 0x0000_FFFF) | 0xE0E0_0000);
    }
}

// ---------------------------------------------------------------------------
// First thread launch
// ---------------------------------------------------------------------------

/// Switch Thread mode onto the process stack and start the first
/// thread. Never returns.
///
/// `sp` points at a freshly seeded frame: R4–R11 below the hardware
/// frame. The software-saved words are skipped (their values do not
/// matter for a first start), the hardware frame is unwound by hand,
/// and execution branches to the thread's entry point with interrupts
/// enabled.
///
/// # Safety
/// Call once, from `launch`, with `sp` taken from a seeded TCB.
pub(crate) unsafe fn start_first_thread(sp: *mut u32) -> ! {
    asm!(
        "adds r0, #32",       // skip R4-R11 (8 words)
        "msr psp, r0",        // thread stack = PSP from here on
        "movs r0, #2",
        "msr control, r0",    // CONTROL.SPSEL = 1
        "isb",
        "pop {{r0-r3, r12}}", // hardware frame by hand
        "pop {{r4, r5, r6}}", // r4 = LR slot, r5 = PC slot, r6 = xPSR slot
        "mov lr, r4",         // a returning entry fn lands in thread_exit
        "cpsie i",
        "bx r5",
        in("r0") sp,
        options(noreturn)
    );
}

// ---------------------------------------------------------------------------
// PendSV — the context switch
// ---------------------------------------------------------------------------

/// PendSV handler: save the outgoing thread, schedule, restore the
/// incoming one.
///
/// Runs at the lowest exception priority, so it tail-chains after
/// whatever handler pended it and never interrupts another ISR. The
/// handler body is a few dozen cycles; its contribution to tick jitter
/// is well under a microsecond.
#[no_mangle]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",  // software-saved context below the HW frame
        "bl {save}",              // record PSP in the outgoing TCB
        "bl {schedule}",          // returns the incoming thread's SP in r0
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "ldr lr, =0xFFFFFFFD",    // thread mode, process stack
        "bx lr",
        save = sym save_outgoing,
        schedule = sym pick_incoming,
    );
}

/// Record the outgoing thread's stack pointer. Called from PendSV with
/// `psp` already wound down past R4–R11.
unsafe extern "C" fn save_outgoing(psp: *mut u32) {
    let k = kernel::kernel_mut();
    k.tcbs[k.run].sp = psp;
}

/// Run the scheduler and hand back the incoming thread's saved stack
/// pointer.
unsafe extern "C" fn pick_incoming() -> *mut u32 {
    let k = kernel::kernel_mut();
    let next = k.schedule();
    k.tcbs[next].sp
}

// ---------------------------------------------------------------------------
// SysTick — time slice expiry
// ---------------------------------------------------------------------------

/// SysTick handler: the time slice is up; pend the switch. The actual
/// scheduling happens in PendSV so this handler stays trivial.
#[no_mangle]
pub extern "C" fn SysTick() {
    yield_now();
}
