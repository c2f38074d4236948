//! # TM4C123 SoC port
//!
//! The device half of the port: general-purpose timers for the kernel
//! tick and the periodic-task slots, the port-F switch inputs, and the
//! device interrupt vector table.
//!
//! Hardware budget:
//! - TIMER3A — 1 ms kernel tick, NVIC priority 1 (highest the kernel
//!   uses), so the clock never starves behind periodic tasks.
//! - TIMER1A / TIMER0A — periodic-task slots 0 / 1, priority chosen at
//!   registration.
//! - GPIO port F, pins 4 and 0 — the two switch lines, both-edge
//!   sensitive with weak pull-ups.

use core::ptr::{read_volatile, write_volatile};

use crate::config::CYCLES_PER_TICK;
use crate::{kernel, periodic, switch, sync};

#[inline]
unsafe fn wr(addr: usize, value: u32) {
    write_volatile(addr as *mut u32, value);
}

#[inline]
unsafe fn rd(addr: usize) -> u32 {
    read_volatile(addr as *const u32)
}

#[inline]
unsafe fn set_bits(addr: usize, bits: u32) {
    wr(addr, rd(addr) | bits);
}

#[inline]
unsafe fn clear_bits(addr: usize, bits: u32) {
    wr(addr, rd(addr) & !bits);
}

// ---------------------------------------------------------------------------
// Register map
// ---------------------------------------------------------------------------

const SYSCTL_RCGCTIMER: usize = 0x400F_E604;
const SYSCTL_RCGCGPIO: usize = 0x400F_E608;

// General-purpose timer register offsets.
const TIMER_CFG: usize = 0x000;
const TIMER_TAMR: usize = 0x004;
const TIMER_CTL: usize = 0x00C;
const TIMER_IMR: usize = 0x018;
const TIMER_ICR: usize = 0x024;
const TIMER_TAILR: usize = 0x028;
const TIMER_TAPR: usize = 0x038;
const TIMER_TAR: usize = 0x048;
const TIMER_TAV: usize = 0x050;

const TIMER0_BASE: usize = 0x4003_0000;
const TIMER1_BASE: usize = 0x4003_1000;
const TIMER3_BASE: usize = 0x4003_3000;

/// GPTM timeout interrupt bit (TATOCINT / TATOIM / TATORIS).
const TIMER_TIMEOUT: u32 = 0x1;
/// Periodic mode, down-count.
const TIMER_PERIODIC: u32 = 0x2;

// GPIO port F.
const GPIOF_BASE: usize = 0x4002_5000;
const GPIO_DIR: usize = 0x400;
const GPIO_IS: usize = 0x404;
const GPIO_IBE: usize = 0x408;
const GPIO_IM: usize = 0x410;
const GPIO_MIS: usize = 0x418;
const GPIO_ICR: usize = 0x41C;
const GPIO_AFSEL: usize = 0x420;
const GPIO_PUR: usize = 0x510;
const GPIO_DEN: usize = 0x51C;
const GPIO_LOCK: usize = 0x520;
const GPIO_CR: usize = 0x524;
const GPIO_AMSEL: usize = 0x528;
const GPIO_PCTL: usize = 0x52C;
const GPIO_LOCK_KEY: u32 = 0x4C4F_434B;

// NVIC.
const NVIC_EN0: usize = 0xE000_E100;
const NVIC_EN1: usize = 0xE000_E104;
const NVIC_PRI4: usize = 0xE000_E410;
const NVIC_PRI5: usize = 0xE000_E414;
const NVIC_PRI7: usize = 0xE000_E41C;
const NVIC_PRI8: usize = 0xE000_E420;

const IRQ_TIMER0A: u32 = 19;
const IRQ_TIMER1A: u32 = 21;
const IRQ_GPIOF: u32 = 30;
const IRQ_TIMER3A: u32 = 35;

// ---------------------------------------------------------------------------
// Kernel tick timer (TIMER3A)
// ---------------------------------------------------------------------------

/// Arm TIMER3A as the 1 ms kernel tick at NVIC priority 1. The timer
/// starts counting immediately; its interrupt fires once `launch`
/// enables interrupts.
pub(crate) fn tick_timer_init() {
    unsafe {
        set_bits(SYSCTL_RCGCTIMER, 0x08);
        let _ = rd(SYSCTL_RCGCTIMER); // a few cycles for the clock gate
        wr(TIMER3_BASE + TIMER_CTL, 0);
        wr(TIMER3_BASE + TIMER_CFG, 0);
        wr(TIMER3_BASE + TIMER_TAMR, TIMER_PERIODIC);
        wr(TIMER3_BASE + TIMER_TAILR, CYCLES_PER_TICK - 1);
        wr(TIMER3_BASE + TIMER_TAPR, 0);
        wr(TIMER3_BASE + TIMER_ICR, TIMER_TIMEOUT);
        wr(TIMER3_BASE + TIMER_IMR, TIMER_TIMEOUT);
        // IRQ 35: PRI8 bits 31:29.
        wr(NVIC_PRI8, (rd(NVIC_PRI8) & 0x00FF_FFFF) | (1 << 29));
        wr(NVIC_EN1, 1 << (IRQ_TIMER3A - 32));
        wr(TIMER3_BASE + TIMER_CTL, 1);
    }
}

/// Current countdown of the tick timer, `CYCLES_PER_TICK - 1 ..= 0`.
pub(crate) fn tick_timer_remaining() -> u32 {
    unsafe { rd(TIMER3_BASE + TIMER_TAR) }
}

/// Restart the tick interval from its full reload value.
pub(crate) fn tick_timer_restart() {
    unsafe {
        wr(TIMER3_BASE + TIMER_TAV, CYCLES_PER_TICK - 1);
    }
}

/// TIMER3A interrupt: the kernel tick. Advances the clock and the
/// sleep counters; never yields — sleepers woken here get the CPU at
/// the next slice boundary.
#[no_mangle]
unsafe extern "C" fn TIMER3A() {
    wr(TIMER3_BASE + TIMER_ICR, TIMER_TIMEOUT);
    kernel::kernel_mut().tick();
}

// ---------------------------------------------------------------------------
// Periodic-task timers (TIMER1A / TIMER0A)
// ---------------------------------------------------------------------------

/// Clock-gate bit, base address, NVIC enable, and priority placement
/// for each periodic slot's timer.
struct SlotTimer {
    rcgc_bit: u32,
    base: usize,
    en_reg: usize,
    en_bit: u32,
    pri_reg: usize,
    pri_shift: u32,
    pri_mask: u32,
}

const SLOT_TIMERS: [SlotTimer; 2] = [
    // Slot 0: TIMER1A, IRQ 21, PRI5 bits 15:13.
    SlotTimer {
        rcgc_bit: 0x02,
        base: TIMER1_BASE,
        en_reg: NVIC_EN0,
        en_bit: 1 << IRQ_TIMER1A,
        pri_reg: NVIC_PRI5,
        pri_shift: 13,
        pri_mask: 0xFFFF_00FF,
    },
    // Slot 1: TIMER0A, IRQ 19, PRI4 bits 31:29.
    SlotTimer {
        rcgc_bit: 0x01,
        base: TIMER0_BASE,
        en_reg: NVIC_EN0,
        en_bit: 1 << IRQ_TIMER0A,
        pri_reg: NVIC_PRI4,
        pri_shift: 29,
        pri_mask: 0x00FF_FFFF,
    },
];

/// Program the hardware timer behind a periodic slot: periodic
/// down-count at `period` cycles, interrupt armed at the caller's NVIC
/// priority.
pub(crate) fn periodic_timer_init(slot: usize, period: u32, priority: u8) {
    let t = &SLOT_TIMERS[slot];
    unsafe {
        set_bits(SYSCTL_RCGCTIMER, t.rcgc_bit);
        let _ = rd(SYSCTL_RCGCTIMER);
        wr(t.base + TIMER_CTL, 0);
        wr(t.base + TIMER_CFG, 0);
        wr(t.base + TIMER_TAMR, TIMER_PERIODIC);
        wr(t.base + TIMER_TAILR, period - 1);
        wr(t.base + TIMER_TAPR, 0);
        wr(t.base + TIMER_ICR, TIMER_TIMEOUT);
        wr(t.base + TIMER_IMR, TIMER_TIMEOUT);
        let pri = (priority as u32 & 0x7) << t.pri_shift;
        wr(t.pri_reg, (rd(t.pri_reg) & t.pri_mask) | pri);
        wr(t.en_reg, t.en_bit);
        wr(t.base + TIMER_CTL, 1);
    }
}

#[no_mangle]
unsafe extern "C" fn TIMER1A() {
    wr(TIMER1_BASE + TIMER_ICR, TIMER_TIMEOUT);
    periodic::on_timer(0);
}

#[no_mangle]
unsafe extern "C" fn TIMER0A() {
    wr(TIMER0_BASE + TIMER_ICR, TIMER_TIMEOUT);
    periodic::on_timer(1);
}

// ---------------------------------------------------------------------------
// Switch inputs (GPIO port F)
// ---------------------------------------------------------------------------

/// Pin mask per switch line: SW1 = PF4, SW2 = PF0.
const SWITCH_PIN: [u32; 2] = [0x10, 0x01];

fn pin(line: usize) -> u32 {
    SWITCH_PIN[line]
}

/// Configure one switch line: digital input, weak pull-up, interrupt on
/// both edges at the caller's NVIC priority. PF0 is NMI-locked from
/// reset, so the port is unlocked before the commit register is set.
pub(crate) fn switch_init(line: usize, priority: u8) {
    let p = pin(line);
    unsafe {
        set_bits(SYSCTL_RCGCGPIO, 0x20);
        let _ = rd(SYSCTL_RCGCGPIO);
        wr(GPIOF_BASE + GPIO_LOCK, GPIO_LOCK_KEY);
        set_bits(GPIOF_BASE + GPIO_CR, p);
        clear_bits(GPIOF_BASE + GPIO_DIR, p);
        clear_bits(GPIOF_BASE + GPIO_AFSEL, p);
        set_bits(GPIOF_BASE + GPIO_DEN, p);
        clear_bits(GPIOF_BASE + GPIO_PCTL, pctl_mask(p));
        clear_bits(GPIOF_BASE + GPIO_AMSEL, p);
        set_bits(GPIOF_BASE + GPIO_PUR, p);
        clear_bits(GPIOF_BASE + GPIO_IS, p); // edge sensitive
        set_bits(GPIOF_BASE + GPIO_IBE, p); // both edges
        wr(GPIOF_BASE + GPIO_ICR, p);
        set_bits(GPIOF_BASE + GPIO_IM, p);
        // IRQ 30: PRI7 bits 23:21. Both lines share the port interrupt,
        // so the later registration's priority wins.
        let pri = (priority as u32 & 0x7) << 21;
        wr(NVIC_PRI7, (rd(NVIC_PRI7) & 0xFF00_FFFF) | pri);
        wr(NVIC_EN0, 1 << IRQ_GPIOF);
    }
}

/// PCTL uses a 4-bit field per pin.
fn pctl_mask(p: u32) -> u32 {
    match p {
        0x10 => 0x000F_0000,
        _ => 0x0000_000F,
    }
}

/// Sample the line level. True = high = released (negative logic).
pub(crate) fn switch_level_high(line: usize) -> bool {
    // Bit-banded data address: base + (mask << 2).
    let addr = GPIOF_BASE + ((pin(line) as usize) << 2);
    unsafe { rd(addr) != 0 }
}

/// Mask further edge interrupts from the line while it bounces.
pub(crate) fn switch_mask(line: usize) {
    unsafe {
        clear_bits(GPIOF_BASE + GPIO_IM, pin(line));
    }
}

/// Clear the pending edge and unmask the line.
pub(crate) fn switch_rearm(line: usize) {
    let p = pin(line);
    unsafe {
        wr(GPIOF_BASE + GPIO_ICR, p);
        set_bits(GPIOF_BASE + GPIO_IM, p);
    }
}

/// Port F edge interrupt: dispatch each line whose *masked* status bit
/// is set, so a line already masked for debounce cannot re-enter.
#[no_mangle]
unsafe extern "C" fn GPIOF() {
    sync::with(|_| {
        let mis = unsafe { rd(GPIOF_BASE + GPIO_MIS) };
        if mis & SWITCH_PIN[0] != 0 {
            switch::on_edge(0);
        }
        if mis & SWITCH_PIN[1] != 0 {
            switch::on_edge(1);
        }
    });
}

// ---------------------------------------------------------------------------
// Device vector table
// ---------------------------------------------------------------------------

extern "C" {
    fn DefaultHandler();
}

union Vector {
    handler: unsafe extern "C" fn(),
    reserved: u32,
}

const DEFAULT: Vector = Vector {
    handler: DefaultHandler,
};
const RESERVED: Vector = Vector { reserved: 0 };

/// Device interrupts 0..=35, enough to cover every IRQ the kernel uses.
/// `cortex-m-rt`'s `device` feature splices this into the vector table.
#[link_section = ".vector_table.interrupts"]
#[no_mangle]
static __INTERRUPTS: [Vector; 36] = [
    DEFAULT,                      // 0  GPIOA
    DEFAULT,                      // 1  GPIOB
    DEFAULT,                      // 2  GPIOC
    DEFAULT,                      // 3  GPIOD
    DEFAULT,                      // 4  GPIOE
    DEFAULT,                      // 5  UART0
    DEFAULT,                      // 6  UART1
    DEFAULT,                      // 7  SSI0
    DEFAULT,                      // 8  I2C0
    DEFAULT,                      // 9  PWM0 fault
    DEFAULT,                      // 10 PWM0 gen 0
    DEFAULT,                      // 11 PWM0 gen 1
    DEFAULT,                      // 12 PWM0 gen 2
    DEFAULT,                      // 13 QEI0
    DEFAULT,                      // 14 ADC0 seq 0
    DEFAULT,                      // 15 ADC0 seq 1
    DEFAULT,                      // 16 ADC0 seq 2
    DEFAULT,                      // 17 ADC0 seq 3
    DEFAULT,                      // 18 watchdog
    Vector { handler: TIMER0A },  // 19 periodic slot 1
    DEFAULT,                      // 20 TIMER0B
    Vector { handler: TIMER1A },  // 21 periodic slot 0
    DEFAULT,                      // 22 TIMER1B
    DEFAULT,                      // 23 TIMER2A
    DEFAULT,                      // 24 TIMER2B
    DEFAULT,                      // 25 comparator 0
    DEFAULT,                      // 26 comparator 1
    RESERVED,                     // 27
    DEFAULT,                      // 28 system control
    DEFAULT,                      // 29 flash control
    Vector { handler: GPIOF },    // 30 switch lines
    RESERVED,                     // 31
    RESERVED,                     // 32
    DEFAULT,                      // 33 UART2
    DEFAULT,                      // 34 SSI1
    Vector { handler: TIMER3A },  // 35 kernel tick
];
