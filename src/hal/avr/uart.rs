//! Interrupt-driven transmitter on USART0

use avr_device::atmega328p::USART0;
use avr_device::interrupt::{self, Mutex};
use core::cell::RefCell;
use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::serial;

use crate::config::{CPU_FREQ_HZ, UART_BAUD};

// Power of 2 for masking
const BUFFER_SIZE: usize = 64;
const BUFFER_MASK: usize = BUFFER_SIZE - 1;

// Double speed: 16 MHz / (8 * 57600) - 1 rounds to 34, 0.8 % off
const UBRR: u16 = ((CPU_FREQ_HZ / 4 / UART_BAUD - 1) / 2) as u16;

const U2X0: u8 = 1 << 1;
const UDRE0: u8 = 1 << 5;
const TXC0: u8 = 1 << 6;
const TXEN0: u8 = 1 << 3;
const UDRIE0: u8 = 1 << 5;
// 8 data bits, no parity, 1 stop bit
const UCSZ_8N1: u8 = 0b11 << 1;

struct Buffer {
    data: [u8; BUFFER_SIZE],
    write_idx: usize,
    read_idx: usize,
}

impl Buffer {
    const fn new() -> Self {
        Self {
            data: [0; BUFFER_SIZE],
            write_idx: 0,
            read_idx: 0,
        }
    }

    fn write(&mut self, byte: u8) -> bool {
        let next_write = (self.write_idx + 1) & BUFFER_MASK;
        if next_write == self.read_idx {
            return false;
        }
        self.data[self.write_idx] = byte;
        self.write_idx = next_write;
        true
    }

    fn read(&mut self) -> Option<u8> {
        if self.read_idx == self.write_idx {
            return None;
        }
        let byte = self.data[self.read_idx];
        self.read_idx = (self.read_idx + 1) & BUFFER_MASK;
        Some(byte)
    }

    fn is_empty(&self) -> bool {
        self.read_idx == self.write_idx
    }
}

static TX_BUFFER: Mutex<RefCell<Buffer>> = Mutex::new(RefCell::new(Buffer::new()));
// A byte went to UDR0 and TXC0 has not been seen since
static IN_FLIGHT: AtomicBool = AtomicBool::new(false);

/// Transmit-only serial port at [`UART_BAUD`]
pub struct Usart0 {
    _private: (),
}

impl Usart0 {
    pub fn new(_usart: USART0) -> Self {
        unsafe {
            let p = USART0::ptr();
            (*p).ubrr0.write(|w| w.bits(UBRR));
            (*p).ucsr0a.write(|w| w.bits(U2X0));
            (*p).ucsr0c.write(|w| w.bits(UCSZ_8N1));
            (*p).ucsr0b.write(|w| w.bits(TXEN0));
        }
        Self { _private: () }
    }

    #[inline]
    fn enable_udre_interrupt() {
        unsafe {
            (*USART0::ptr())
                .ucsr0b
                .modify(|r, w| w.bits(r.bits() | UDRIE0));
        }
    }
}

impl serial::Write<u8> for Usart0 {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        let queued = interrupt::free(|cs| TX_BUFFER.borrow(cs).borrow_mut().write(byte));
        // Kick the transmitter either way, a full buffer drains meanwhile
        Self::enable_udre_interrupt();
        if queued {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        let empty = interrupt::free(|cs| TX_BUFFER.borrow(cs).borrow().is_empty());
        if !empty {
            return Err(nb::Error::WouldBlock);
        }
        if !IN_FLIGHT.load(Ordering::Acquire) {
            return Ok(());
        }
        let status = unsafe { (*USART0::ptr()).ucsr0a.read().bits() };
        if status & UDRE0 != 0 && status & TXC0 != 0 {
            IN_FLIGHT.store(false, Ordering::Release);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

#[avr_device::interrupt(atmega328p)]
fn USART_UDRE() {
    interrupt::free(|cs| {
        let next = TX_BUFFER.borrow(cs).borrow_mut().read();
        unsafe {
            let p = USART0::ptr();
            match next {
                Some(byte) => {
                    // Writing TXC0 as one clears it, so flush can wait for it
                    (*p).ucsr0a.modify(|r, w| w.bits(r.bits() | TXC0));
                    (*p).udr0.write(|w| w.bits(byte));
                    IN_FLIGHT.store(true, Ordering::Release);
                }
                None => {
                    (*p).ucsr0b.modify(|r, w| w.bits(r.bits() & !UDRIE0));
                }
            }
        }
    });
}
