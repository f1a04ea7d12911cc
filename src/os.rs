//! The node's scheduler instance and the wakeup interrupt that feeds it

use avr_device::atmega328p::EXINT;

use crate::hal::avr::Millis;
use crate::rtos::Scheduler;

/// Global scheduler, clocked by the Timer0 millisecond counter
pub static SCHEDULE: Scheduler<Millis> = Scheduler::new(Millis);

const INT0_BIT: u8 = 1 << 0;
const ISC0_MASK: u8 = 0b11;

/// Wake on a low level on INT0 (PD2), a button to ground or a radio IRQ.
///
/// Only a level interrupt wakes the CPU from power-down. The handler masks
/// itself, call [`rearm_wakeup_pin`] once the line has been dealt with.
pub fn enable_wakeup_pin(exint: &EXINT) {
    exint
        .eicra
        .modify(|r, w| unsafe { w.bits(r.bits() & !ISC0_MASK) });
    rearm_wakeup_pin();
}

pub fn rearm_wakeup_pin() {
    avr_device::interrupt::free(|_| unsafe {
        let p = EXINT::ptr();
        (*p).eifr.write(|w| w.bits(INT0_BIT));
        (*p).eimsk.modify(|r, w| w.bits(r.bits() | INT0_BIT));
    });
}

#[avr_device::interrupt(atmega328p)]
fn INT0() {
    unsafe {
        (*EXINT::ptr())
            .eimsk
            .modify(|r, w| w.bits(r.bits() & !INT0_BIT));
    }
    SCHEDULE.interrupt();
}
