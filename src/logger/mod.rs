//! Serial console logging
//!
//! Records are formatted with `ufmt` and written byte by byte to whatever
//! sink the build has:
//! - AVR: the serial console installed with [`init`]
//! - unit tests: a per-thread capture buffer, see [`take_captured`]
//! - other host builds: discarded
//!
//! Levels are filtered at compile time. `no_logs` removes every record,
//! `debug` enables Debug and Trace on top of the default Error/Warn/Info.

use embedded_hal::serial;
use ufmt::uWrite;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    pub const fn prefix(self) -> &'static str {
        match self {
            Level::Error => "[ERRO] ",
            Level::Warn => "[WARN] ",
            Level::Info => "[INFO] ",
            Level::Debug => "[DEBG] ",
            Level::Trace => "[TRAC] ",
        }
    }
}

/// Most verbose level compiled in
pub const MAX_LEVEL: Option<Level> = if cfg!(feature = "no_logs") {
    None
} else if cfg!(any(feature = "debug", test)) {
    Some(Level::Trace)
} else {
    Some(Level::Info)
};

#[inline(always)]
pub const fn enabled(level: Level) -> bool {
    match MAX_LEVEL {
        Some(max) => level as u8 <= max as u8,
        None => false,
    }
}

/// Line-oriented text console over any non-blocking serial writer
pub struct Console<S> {
    serial: S,
}

impl<S: serial::Write<u8>> Console<S> {
    pub fn new(serial: S) -> Self {
        Self { serial }
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), S::Error> {
        nb::block!(self.serial.write(byte))
    }

    pub fn write_line(&mut self, s: &str) -> Result<(), S::Error> {
        self.write_str(s)?;
        self.write_str("\r\n")
    }

    pub fn flush(&mut self) -> Result<(), S::Error> {
        nb::block!(self.serial.flush())
    }

    pub fn release(self) -> S {
        self.serial
    }
}

impl<S: serial::Write<u8>> uWrite for Console<S> {
    type Error = S::Error;

    fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
        for byte in s.bytes() {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

/// Write one record: level prefix, body, CRLF
#[doc(hidden)]
pub fn emit<F>(level: Level, body: F)
where
    F: FnOnce(&mut Sink) -> Result<(), <Sink as uWrite>::Error>,
{
    if !enabled(level) {
        return;
    }
    with_sink(|sink| {
        if sink.write_str(level.prefix()).is_ok() && body(sink).is_ok() {
            let _ = sink.write_str("\r\n");
        }
    });
}

#[cfg(target_arch = "avr")]
mod sink {
    use super::Console;
    use crate::hal::avr::uart::Usart0;
    use avr_device::interrupt::{self, Mutex};
    use core::cell::RefCell;

    pub type Sink = Console<Usart0>;

    static CONSOLE: Mutex<RefCell<Option<Sink>>> = Mutex::new(RefCell::new(None));

    /// Route log records to `console`
    pub fn init(console: Sink) {
        interrupt::free(|cs| {
            CONSOLE.borrow(cs).replace(Some(console));
        });
    }

    pub(super) fn with_sink(f: impl FnOnce(&mut Sink)) {
        // Writing blocks on a full ring buffer until the UDRE interrupt
        // drains it, so the console is borrowed out with interrupts on.
        // Records logged from an ISR meanwhile are dropped.
        let taken = interrupt::free(|cs| CONSOLE.borrow(cs).borrow_mut().take());
        if let Some(mut console) = taken {
            f(&mut console);
            interrupt::free(|cs| {
                CONSOLE.borrow(cs).replace(Some(console));
            });
        }
    }
}

#[cfg(all(not(target_arch = "avr"), test))]
mod sink {
    use std::cell::RefCell;
    use std::string::String;
    use ufmt::uWrite;

    /// Captured log text of the current test thread
    #[derive(Default)]
    pub struct Sink {
        text: String,
    }

    impl uWrite for Sink {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, s: &str) -> Result<(), Self::Error> {
            self.text.push_str(s);
            Ok(())
        }
    }

    std::thread_local! {
        static CAPTURE: RefCell<Sink> = RefCell::new(Sink::default());
    }

    pub(super) fn with_sink(f: impl FnOnce(&mut Sink)) {
        CAPTURE.with(|sink| f(&mut sink.borrow_mut()));
    }

    /// Drain everything logged on this thread so far
    pub fn take_captured() -> String {
        CAPTURE.with(|sink| core::mem::take(&mut sink.borrow_mut().text))
    }
}

#[cfg(all(not(target_arch = "avr"), not(test)))]
mod sink {
    use ufmt::uWrite;

    /// Drops everything
    pub struct Sink;

    impl uWrite for Sink {
        type Error = core::convert::Infallible;

        fn write_str(&mut self, _s: &str) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    pub(super) fn with_sink(f: impl FnOnce(&mut Sink)) {
        f(&mut Sink);
    }
}

#[cfg(target_arch = "avr")]
pub use sink::init;
#[cfg(all(not(target_arch = "avr"), test))]
pub use sink::take_captured;
pub use sink::Sink;
use sink::with_sink;

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Error, |w| ::ufmt::uwrite!(w, $($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Warn, |w| ::ufmt::uwrite!(w, $($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Info, |w| ::ufmt::uwrite!(w, $($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Debug, |w| ::ufmt::uwrite!(w, $($arg)*))
    };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::logger::emit($crate::logger::Level::Trace, |w| ::ufmt::uwrite!(w, $($arg)*))
    };
}
