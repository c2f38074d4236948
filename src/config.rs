//! # Kestrel Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time — no dynamic allocation anywhere in the kernel.

/// Maximum number of threads the kernel can manage simultaneously.
/// This bounds the static TCB array. Increase with care — each thread
/// carries `STACK_WORDS * 4` bytes of RAM whether or not it is alive.
pub const NUM_THREADS: usize = 8;

/// Per-thread stack size in 32-bit words. Must leave room for the
/// hardware exception frame (8 words) plus the software-saved context
/// (8 words for R4–R11) on top of the deepest call chain.
pub const STACK_WORDS: usize = 256;

/// System clock frequency in Hz (80 MHz PLL on the TM4C123).
pub const SYSTEM_CLOCK_HZ: u32 = 80_000_000;

/// Kernel tick frequency in Hz. The tick drives the monotonic clock and
/// the sleep decrement; sleep durations are expressed in these ticks.
pub const TICK_HZ: u32 = 1000;

/// Bus cycles per kernel tick (12.5 ns units at 80 MHz).
pub const CYCLES_PER_TICK: u32 = SYSTEM_CLOCK_HZ / TICK_HZ;

/// Number of thread priority levels. 0 is the highest, 7 the lowest.
pub const NUM_PRIORITIES: u8 = 8;

/// Priority of the idle thread. The idle thread must stay the lowest
/// priority in the system so it only runs when nothing else is Active.
pub const IDLE_PRIORITY: u8 = NUM_PRIORITIES - 1;

/// Number of periodic background task slots, each backed by its own
/// hardware timer.
pub const NUM_PERIODIC: usize = 2;

/// Number of buckets in each periodic task's jitter histogram.
/// Bucket i counts invocations whose jitter was i × 0.1 µs; the last
/// bucket absorbs everything beyond the range.
pub const JITTER_BUCKETS: usize = 64;

/// Backing capacity of the SPSC stream in 32-bit words. `Fifo::init`
/// may select any power-of-two size up to this.
pub const FIFO_CAPACITY: usize = 64;

/// Number of edge-triggered switch task lines.
pub const NUM_SWITCHES: usize = 2;

/// Settling time for switch debounce, in kernel ticks.
pub const DEBOUNCE_TICKS: u32 = 10;

/// Priority of the short-lived debounce threads. High, so a debounce
/// thread is scheduled promptly and the switch line rearms on time.
pub const DEBOUNCE_PRIORITY: u8 = 1;
