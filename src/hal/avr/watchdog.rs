//! Watchdog in interrupt mode, the only timer left running in power-down

use avr_device::atmega328p::{self, CPU};
use core::sync::atomic::{AtomicBool, Ordering};

const WDIE: u8 = 1 << 6;
const WDP3: u8 = 1 << 5;
const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;
const WDRF: u8 = 1 << 3;

static FIRED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WatchdogTimeout {
    Ms16 = 0,
    Ms32 = 1,
    Ms64 = 2,
    Ms125 = 3,
    Ms250 = 4,
    Ms500 = 5,
    Ms1000 = 6,
    Ms2000 = 7,
    Ms4000 = 8,
    Ms8000 = 9,
}

impl WatchdogTimeout {
    const ALL: [WatchdogTimeout; 10] = [
        WatchdogTimeout::Ms8000,
        WatchdogTimeout::Ms4000,
        WatchdogTimeout::Ms2000,
        WatchdogTimeout::Ms1000,
        WatchdogTimeout::Ms500,
        WatchdogTimeout::Ms250,
        WatchdogTimeout::Ms125,
        WatchdogTimeout::Ms64,
        WatchdogTimeout::Ms32,
        WatchdogTimeout::Ms16,
    ];

    /// Nominal length. The oscillator is ±10 %, close enough for sleeping.
    pub const fn ms(self) -> u16 {
        16 << (self as u8)
    }

    /// Longest timeout not exceeding `ms`
    pub fn fitting(ms: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|timeout| timeout.ms() <= ms)
    }

    const fn prescaler_bits(self) -> u8 {
        let p = self as u8;
        (p & 0x07) | if p & 0x08 != 0 { WDP3 } else { 0 }
    }
}

pub struct Watchdog {
    _private: (),
}

impl Watchdog {
    #[inline]
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Interrupt (no reset) after `timeout`
    #[inline]
    pub fn start_interrupt(&mut self, timeout: WatchdogTimeout) {
        FIRED.store(false, Ordering::Release);
        avr_device::interrupt::free(|_| unsafe {
            let p = atmega328p::WDT::ptr();
            // Timed sequence: change enable, then the new setting
            (*p).wdtcsr.write(|w| w.bits(WDCE | WDE));
            (*p).wdtcsr.write(|w| w.bits(WDIE | timeout.prescaler_bits()));
        });
    }

    #[inline]
    pub fn disable(&mut self) {
        avr_device::interrupt::free(|_| unsafe {
            (*CPU::ptr()).mcusr.modify(|r, w| w.bits(r.bits() & !WDRF));
            let p = atmega328p::WDT::ptr();
            // Timed sequence to disable watchdog
            (*p).wdtcsr.write(|w| w.bits(WDCE | WDE));
            (*p).wdtcsr.write(|w| w.bits(0x00));
        });
    }

    /// Did the last armed timeout expire?
    #[inline]
    pub fn fired(&self) -> bool {
        FIRED.load(Ordering::Acquire)
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

#[avr_device::interrupt(atmega328p)]
fn WDT() {
    FIRED.store(true, Ordering::Release);
}
