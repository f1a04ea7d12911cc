use avr_device::atmega328p::PORTB;
use core::convert::Infallible;
use embedded_hal::digital::v2::OutputPin;

/// On-board LED on PB5 (Arduino pin 13)
pub struct StatusLed {
    lit: bool,
}

const PB5: u8 = 1 << 5;

impl StatusLed {
    pub fn new() -> Self {
        unsafe {
            (*PORTB::ptr()).ddrb.modify(|r, w| w.bits(r.bits() | PB5));
        }
        Self { lit: false }
    }

    pub fn toggle(&mut self) {
        let _ = if self.lit { self.set_low() } else { self.set_high() };
    }
}

impl OutputPin for StatusLed {
    type Error = Infallible;

    fn set_high(&mut self) -> Result<(), Self::Error> {
        unsafe {
            (*PORTB::ptr()).portb.modify(|r, w| w.bits(r.bits() | PB5));
        }
        self.lit = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        unsafe {
            (*PORTB::ptr()).portb.modify(|r, w| w.bits(r.bits() & !PB5));
        }
        self.lit = false;
        Ok(())
    }
}
