//! Configuration constants for the node scheduler

use crate::rtos::time::Tick;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate
pub const UART_BAUD: u32 = 57_600;

/// Number of slots in the schedule table
pub const MAX_SCHEDULE_ENTRIES: usize = 16;

/// Period of a one-shot entry, also "no start delay given"
pub const NO_REPEAT: Tick = 0xFFFF;

/// Largest `deadline - now` distance still read as "in the future".
///
/// Anything above it is a wrapped subtraction, i.e. a deadline in the past.
/// This leaves the top 5535 ticks of the 16-bit range to mean "overdue".
pub const DUE_WINDOW: Tick = 60_000;

/// Shortest timed power-down the watchdog can deliver
pub const MIN_POWER_DOWN_MS: Tick = 16;
