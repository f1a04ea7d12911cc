//! Hardware seams of the scheduler
//!
//! The scheduler only needs a millisecond clock and a way to sleep. The AVR
//! backend drives real registers; the simulation backend lets the same code
//! run on the host.

use crate::rtos::time::Tick;

#[cfg(target_arch = "avr")]
pub mod avr;
#[cfg(not(target_arch = "avr"))]
pub mod sim;

/// Monotonic millisecond tick source
pub trait Clock {
    /// Current tick, wrapping at the counter width
    fn millis(&self) -> Tick;
}

/// Sleep states and peripheral gating of the MCU
pub trait LowPower {
    /// Idle sleep until the next interrupt, unless something is pending.
    ///
    /// `pending` runs with interrupts disabled. If it returns false,
    /// interrupts are re-enabled and the CPU goes to sleep in one sequence
    /// that an interrupt cannot split, so a wakeup raised after the check
    /// still ends the sleep. Returns whether the CPU slept.
    fn idle_unless<F: FnOnce() -> bool>(&mut self, pending: F) -> bool;

    /// Power down for about `ms` milliseconds on the coarse timer.
    ///
    /// `pending` is checked with interrupts disabled before every sleep
    /// step, the same way as in [`idle_unless`](Self::idle_unless). Returns
    /// false when it reported pending work or another interrupt cut the
    /// sleep short.
    fn sleep_for<F: Fn() -> bool>(&mut self, ms: Tick, pending: F) -> bool;

    /// Deepest sleep, only an external interrupt wakes the CPU
    fn power_down(&mut self);

    /// Switch the ADC off, returning whether it was on
    fn disable_adc(&mut self) -> bool;

    fn restore_adc(&mut self, was_enabled: bool);
}
