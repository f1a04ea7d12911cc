//! Deferred interrupt signalling
//!
//! Interrupt handlers never touch the schedule table. They raise this flag
//! and the next dispatch pass, running in main context, does the actual
//! rescheduling.

use core::sync::atomic::{AtomicBool, Ordering};

/// Single-writer flag: raised from interrupt context, consumed by dispatch
pub struct InterruptFlag {
    raised: AtomicBool,
}

impl InterruptFlag {
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Safe to call from an interrupt handler
    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    ///
    /// Clearing before the rescan means an interrupt arriving during the
    /// rescan is kept for the following pass.
    #[inline]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }
}

impl Default for InterruptFlag {
    fn default() -> Self {
        Self::new()
    }
}
