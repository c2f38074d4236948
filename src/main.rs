//! # Kestrel demo firmware
//!
//! Exercises the kernel end to end on a TM4C123 LaunchPad:
//!
//! | Thread / task        | Priority | Role                                   |
//! |----------------------|----------|----------------------------------------|
//! | `producer`           | 3        | mails 1, 2, 3, … to the consumer       |
//! | `consumer`           | 3        | drains the mailbox at 100 Hz           |
//! | `stream_reader`      | 2        | blocks on the sample stream            |
//! | `load`               | 5        | counts as fast as its slices allow     |
//! | `sampler` (periodic) | irq 2    | 1 kHz, feeds the stream                |
//! | switch task          | irq 2    | spawns a worker per button press       |
//!
//! The mailbox pair demonstrates the rendezvous (the producer blocks on
//! every send until the consumer drains it), the sampler/stream_reader
//! pair demonstrates ISR-to-thread data flow with drop-on-full, and the
//! switch task demonstrates thread spawning from interrupt context.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use kestrel::config::CYCLES_PER_TICK;
    use kestrel::{kernel, periodic, switch, time, Fifo, Mailbox};

    /// 2 ms time slice.
    const TIME_SLICE: u32 = 2 * CYCLES_PER_TICK;

    static CHANNEL: Mailbox = Mailbox::new();
    static SAMPLES: Fifo = Fifo::new();

    static mut CONSUMED: u32 = 0;
    static mut STREAMED: u32 = 0;
    static mut LOAD_COUNT: u32 = 0;
    static mut PRESSES: u32 = 0;

    /// Sends an incrementing sequence; each send blocks until the
    /// consumer has taken the previous value.
    fn producer() {
        let mut n: u32 = 0;
        loop {
            n = n.wrapping_add(1);
            CHANNEL.send(n);
        }
    }

    /// Drains the mailbox at 100 Hz.
    fn consumer() {
        loop {
            let _value = CHANNEL.recv();
            unsafe {
                CONSUMED = CONSUMED.wrapping_add(1);
            }
            kernel::sleep(10);
        }
    }

    /// Runs in the sampler's timer interrupt: must not block, so a full
    /// stream simply drops the sample.
    fn sampler() {
        let _ = SAMPLES.put(time::ms_now());
    }

    /// Blocks on the stream and accounts what arrives.
    fn stream_reader() {
        loop {
            let _sample = SAMPLES.get();
            unsafe {
                STREAMED = STREAMED.wrapping_add(1);
            }
        }
    }

    /// Low-priority busy work; only runs when everything above it is
    /// blocked or asleep.
    fn load() {
        loop {
            unsafe {
                LOAD_COUNT = LOAD_COUNT.wrapping_add(1);
            }
        }
    }

    /// One-shot worker spawned per button press.
    fn press_worker() {
        unsafe {
            PRESSES = PRESSES.wrapping_add(1);
        }
        kernel::kill()
    }

    /// Runs in the switch edge interrupt.
    fn on_press() {
        let _ = kernel::add_thread(press_worker, 512, 2);
    }

    #[entry]
    fn main() -> ! {
        kernel::init();

        CHANNEL.init();
        SAMPLES.init(16);

        kernel::add_thread(producer, 512, 3).unwrap();
        kernel::add_thread(consumer, 512, 3).unwrap();
        kernel::add_thread(stream_reader, 512, 2).unwrap();
        kernel::add_thread(load, 512, 5).unwrap();

        periodic::add_periodic(sampler, CYCLES_PER_TICK, 2).unwrap();
        switch::add_switch_task(on_press, 2).unwrap();

        kernel::launch(TIME_SLICE)
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
