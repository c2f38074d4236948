//! # Architecture port layer
//!
//! The hardware boundary of the kernel. Everything above this module is
//! plain Rust; everything below it touches registers or assembly.
//!
//! - `cortex_m4` — the processor-core port: PendSV context switch,
//!   SysTick time slicing, exception priorities, and the launch shim.
//! - `tm4c123` — the SoC port: the kernel tick timer, the two
//!   periodic-task timers, the switch inputs, and the device vector
//!   table.
//! - `host` — no-op stubs substituted on non-embedded targets so the
//!   kernel logic compiles and its unit tests run on the host.

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod cortex_m4;
#[cfg(all(target_arch = "arm", target_os = "none"))]
mod tm4c123;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub(crate) use self::{cortex_m4::*, tm4c123::*};

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
mod host;
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub(crate) use self::host::*;
