use avr_device::atmega328p::{ADC, CPU};

use super::timer::Millis;
use super::watchdog::{Watchdog, WatchdogTimeout};
use crate::hal::LowPower;
use crate::rtos::time::Tick;

const SE: u8 = 1 << 0;
const ADEN: u8 = 1 << 7;

/// SM2..0 encodings of SMCR
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum McuSleepMode {
    Idle = 0,
    PowerDown = 2,
}

/// Sleep control of the ATmega328P
pub struct Sleepy {
    watchdog: Watchdog,
}

impl Sleepy {
    pub fn new() -> Self {
        Self {
            watchdog: Watchdog::new(),
        }
    }

    #[inline]
    pub fn set_sleep_mode(&mut self, mode: McuSleepMode) {
        unsafe {
            let p = CPU::ptr();
            (*p).smcr.modify(|r, w| w.bits((r.bits() & SE) | ((mode as u8) << 1)));
        }
    }

    #[inline]
    pub fn enable_sleep(&mut self) {
        unsafe {
            let p = CPU::ptr();
            (*p).smcr.modify(|r, w| w.bits(r.bits() | SE));
        }
    }

    #[inline]
    pub fn disable_sleep(&mut self) {
        unsafe {
            let p = CPU::ptr();
            (*p).smcr.modify(|r, w| w.bits(r.bits() & !SE));
        }
    }

    /// Enable interrupts and sleep, with no instruction in between.
    ///
    /// An interrupt that is already pending fires after `sleep` has been
    /// entered and wakes the CPU right away, so it cannot be missed.
    #[inline(always)]
    fn sei_and_sleep(&mut self) {
        unsafe { core::arch::asm!("sei", "sleep") };
    }

    /// Sleep in `mode` unless `pending`, checked with interrupts off
    fn enter_unless<F: FnOnce() -> bool>(&mut self, mode: McuSleepMode, pending: F) -> bool {
        self.set_sleep_mode(mode);
        avr_device::interrupt::disable();
        if pending() {
            unsafe { avr_device::interrupt::enable() };
            return false;
        }
        self.enable_sleep();
        self.sei_and_sleep();
        self.disable_sleep();
        true
    }
}

impl Default for Sleepy {
    fn default() -> Self {
        Self::new()
    }
}

impl LowPower for Sleepy {
    fn idle_unless<F: FnOnce() -> bool>(&mut self, pending: F) -> bool {
        self.enter_unless(McuSleepMode::Idle, pending)
    }

    fn sleep_for<F: Fn() -> bool>(&mut self, ms: Tick, pending: F) -> bool {
        let mut left = ms;
        while let Some(timeout) = WatchdogTimeout::fitting(left) {
            self.watchdog.start_interrupt(timeout);
            let slept = self.enter_unless(McuSleepMode::PowerDown, &pending);
            self.watchdog.disable();

            if !slept {
                return false;
            }

            if !self.watchdog.fired() {
                // Some other interrupt, the elapsed part is unknown
                return false;
            }
            Millis::adjust(timeout.ms() as u32);
            left -= timeout.ms();
        }
        true
    }

    fn power_down(&mut self) {
        self.enter_unless(McuSleepMode::PowerDown, || false);
    }

    fn disable_adc(&mut self) -> bool {
        unsafe {
            let p = ADC::ptr();
            let was_enabled = (*p).adcsra.read().bits() & ADEN != 0;
            (*p).adcsra.modify(|r, w| w.bits(r.bits() & !ADEN));
            was_enabled
        }
    }

    fn restore_adc(&mut self, was_enabled: bool) {
        if was_enabled {
            unsafe {
                let p = ADC::ptr();
                (*p).adcsra.modify(|r, w| w.bits(r.bits() | ADEN));
            }
        }
    }
}
