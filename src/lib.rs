//! # Kestrel — a preemptive RTOS kernel
//!
//! A small real-time kernel for single-core ARM Cortex-M4
//! microcontrollers: fixed-priority preemptive scheduling with
//! round-robin among equals, timed sleep, blocking counting and binary
//! semaphores, a single-producer/single-consumer stream, a mailbox
//! rendezvous, hardware-timer-driven periodic tasks with jitter
//! accounting, and debounced edge-triggered switch tasks.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Application threads                     │
//! ├───────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                     │
//! │   init() · add_thread() · launch() · sleep() · kill()     │
//! ├──────────────┬───────────────────┬────────────────────────┤
//! │  Scheduler   │  Synchronization  │  Background tasks      │
//! │ scheduler.rs │  sema.rs          │  periodic.rs           │
//! │ ─ ring scan  │  fifo.rs          │  ─ jitter histograms   │
//! │ ─ sleep/kill │  mailbox.rs       │  switch.rs             │
//! │ ─ tick       │                   │  ─ debounce threads    │
//! ├──────────────┴───────────────────┴────────────────────────┤
//! │              Thread model (thread.rs)                      │
//! │        Tcb · ThreadState · synthetic stack frames          │
//! ├───────────────────────────────────────────────────────────┤
//! │        Port layer (arch/cortex_m4.rs, arch/tm4c123.rs)     │
//! │   PendSV · SysTick · tick timer · slot timers · switches   │
//! ├───────────────────────────────────────────────────────────┤
//! │               ARM Cortex-M4 (Thumb-2) hardware             │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution model
//!
//! Three kinds of context exist:
//!
//! 1. **Threads**, each on its own stack, preemptible at any instruction
//!    boundary. Threads may block: `sleep`, `Semaphore::wait`/`bwait`,
//!    `Fifo::get`, `Mailbox::send`/`recv`, `suspend`, `kill`.
//! 2. **Interrupt handlers** (the kernel tick, periodic-task timers,
//!    switch edges), which run to completion and never block. From an
//!    ISR only `Semaphore::signal`/`bsignal`, `Fifo::put`, and
//!    `kernel::add_thread` may be called.
//! 3. **PendSV**, the lowest-priority exception, where every context
//!    switch happens — after a time slice expires or as soon as a
//!    thread yields.
//!
//! ## Memory model
//!
//! - **No heap, no `alloc`**: every structure is statically sized.
//! - **Fixed TCB pool**: `[Tcb; NUM_THREADS]`, ring-linked by index.
//! - **Per-thread stacks inline in the TCB**, seeded with a synthetic
//!   exception frame.
//! - **Critical sections** via the `critical-section` crate: the
//!   single-core Cortex-M provider on the target, the `std` provider
//!   under host tests.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod config;
pub mod fifo;
pub mod kernel;
pub mod mailbox;
pub mod periodic;
pub mod scheduler;
pub mod sema;
pub mod switch;
pub mod sync;
pub mod thread;
pub mod time;

pub use fifo::Fifo;
pub use mailbox::Mailbox;
pub use sema::Semaphore;
