//! Priority-aware cooperative scheduler for battery-powered AVR nodes
//!
//! Callbacks are registered into a fixed table as one-shots or periodic
//! entries with one of four priorities. The main loop calls
//! [`Scheduler::dispatch_and_sleep`], which runs whatever is due and then
//! sleeps until the next deadline or an external interrupt.
//!
//! On the host the AVR backend is replaced by [`hal::sim`], so the
//! scheduling logic can be exercised by plain `cargo test`.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    target_arch = "avr",
    feature(abi_avr_interrupt, asm_experimental_arch)
)]

pub mod config;
pub mod error;
pub mod hal;
pub mod logger;
#[cfg(target_arch = "avr")]
pub mod os;
pub mod rtos;

pub use error::ScheduleError;
pub use hal::{Clock, LowPower};
pub use rtos::{
    Callback, Handle, InterruptFlag, Priority, ScheduleEntry, ScheduleType, Scheduler,
    SleepMode, TaskBuilder, Tick, IDLE,
};
