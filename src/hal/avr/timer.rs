//! Millisecond tick on Timer/Counter0
//!
//! CTC mode, prescaler 64, 250 counts: one compare interrupt per ms at
//! 16 MHz. The same interrupt is what wakes the CPU from idle sleep.

use avr_device::atmega328p::TC0;
use avr_device::interrupt::{self, Mutex};
use core::cell::Cell;

use crate::config::CPU_FREQ_HZ;
use crate::hal::Clock;
use crate::rtos::time::Tick;

const PRESCALER: u32 = 64;
const TIMER_COUNTS: u32 = CPU_FREQ_HZ / PRESCALER / 1000;

static MILLIS_COUNTER: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

/// The global millisecond counter as a [`Clock`]
#[derive(Clone, Copy)]
pub struct Millis;

impl Millis {
    /// Start the 1 ms compare interrupt and reset the counter
    pub fn init(tc0: TC0) {
        tc0.tccr0a.write(|w| w.wgm0().ctc());
        tc0.ocr0a.write(|w| w.bits((TIMER_COUNTS - 1) as u8));
        tc0.tccr0b.write(|w| w.cs0().prescale_64());
        tc0.timsk0.write(|w| w.ocie0a().set_bit());

        interrupt::free(|cs| MILLIS_COUNTER.borrow(cs).set(0));
    }

    /// Full-width counter
    pub fn now_u32() -> u32 {
        interrupt::free(|cs| MILLIS_COUNTER.borrow(cs).get())
    }

    /// Account for time that passed while Timer0 was stopped
    pub fn adjust(ms: u32) {
        interrupt::free(|cs| {
            let counter = MILLIS_COUNTER.borrow(cs);
            counter.set(counter.get().wrapping_add(ms));
        });
    }
}

impl Clock for Millis {
    #[inline]
    fn millis(&self) -> Tick {
        Self::now_u32() as Tick
    }
}

#[avr_device::interrupt(atmega328p)]
fn TIMER0_COMPA() {
    interrupt::free(|cs| {
        let counter = MILLIS_COUNTER.borrow(cs);
        counter.set(counter.get().wrapping_add(1));
    });
}
