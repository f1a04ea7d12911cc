//! Cooperative scheduler core

pub mod interrupt;
pub mod scheduler;
pub mod sleep;
pub mod task;
pub mod time;

pub use interrupt::InterruptFlag;
pub use scheduler::{Scheduler, TaskBuilder};
pub use sleep::SleepMode;
pub use task::{Callback, Handle, Priority, ScheduleEntry, ScheduleType};
pub use time::{Tick, IDLE};
