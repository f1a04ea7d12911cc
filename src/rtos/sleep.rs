//! Sleeping between dispatch passes

use super::scheduler::Scheduler;
use super::time::Tick;
use crate::config::MIN_POWER_DOWN_MS;
use crate::hal::{Clock, LowPower};
use crate::log_trace;

/// How deeply `dispatch_and_sleep` sleeps while waiting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SleepMode {
    /// CPU halted, clocks and timers running. The 1 ms tick interrupt wakes
    /// it, so deadlines and the interrupt flag are checked every tick.
    #[default]
    Idle,
    /// Oscillator stopped, one long sleep on the watchdog. Peripherals that
    /// need a clock (PWM) stop too.
    PowerDown,
}

impl<C: Clock, const N: usize> Scheduler<C, N> {
    /// Dispatch once, then sleep until the next deadline or an interrupt.
    ///
    /// Returns what the dispatch pass reported. Call it again after it
    /// returns.
    pub fn dispatch_and_sleep<P: LowPower>(&self, power: &mut P) -> Tick {
        let next = self.dispatch();
        if next == 0 {
            return next;
        }

        match self.sleep_mode() {
            SleepMode::PowerDown if next >= MIN_POWER_DOWN_MS => {
                log_trace!("sleep: power down {}ms", next);
                let was_enabled = power.disable_adc();
                let completed = power.sleep_for(next, || self.interrupt_flag().is_raised());
                power.restore_adc(was_enabled);
                if !completed {
                    // Woken by something else or never slept, rescan
                    self.interrupt();
                }
            }
            _ => self.idle_for(power, next),
        }
        next
    }

    /// Sleep in the deepest state until an external interrupt.
    ///
    /// The tick counter may have stood still meanwhile, so the next pass
    /// treats the wakeup as an interrupt.
    pub fn power_down<P: LowPower>(&self, power: &mut P) {
        log_trace!("sleep: power down until interrupt");
        let was_enabled = power.disable_adc();
        power.power_down();
        power.restore_adc(was_enabled);
        self.interrupt();
    }

    fn idle_for<P: LowPower>(&self, power: &mut P, ms: Tick) {
        let start = self.now();
        while self.now().wrapping_sub(start) < ms {
            let slept = power.idle_unless(|| self.interrupt_flag().is_raised());
            if !slept {
                break;
            }
        }
    }
}
