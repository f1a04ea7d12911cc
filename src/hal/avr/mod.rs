//! ATmega328P backend

pub mod gpio;
pub mod power;
pub mod timer;
pub mod uart;
pub mod watchdog;

pub use gpio::StatusLed;
pub use power::{McuSleepMode, Sleepy};
pub use timer::Millis;
pub use uart::Usart0;
pub use watchdog::{Watchdog, WatchdogTimeout};
