//! Host-side stand-ins for the tick counter and the sleep hardware

use core::cell::Cell;

use super::{Clock, LowPower};
use crate::rtos::interrupt::InterruptFlag;
use crate::rtos::time::Tick;

/// Tick counter that only moves when told to
pub struct SimClock {
    now: Cell<Tick>,
}

impl SimClock {
    pub const fn new(start: Tick) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: Tick) {
        self.now.set(now);
    }

    pub fn advance(&self, ms: Tick) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for SimClock {
    fn millis(&self) -> Tick {
        self.now.get()
    }
}

/// Sleep hardware that spends simulated time instead of sleeping.
///
/// Idle sleep lasts exactly one tick, like the 1 ms timer interrupt that
/// wakes the real CPU.
pub struct SimPower<'a> {
    clock: &'a SimClock,
    irq: Option<(&'a InterruptFlag, u32)>,
    wake_early_after: Option<Tick>,
    power_down_ms: Tick,
    adc_enabled: bool,
    adc_during_power_down: Option<bool>,
    idle_ticks: u32,
    timed_sleeps: u32,
    power_downs: u32,
}

impl<'a> SimPower<'a> {
    pub fn new(clock: &'a SimClock) -> Self {
        Self {
            clock,
            irq: None,
            wake_early_after: None,
            power_down_ms: 1000,
            adc_enabled: true,
            adc_during_power_down: None,
            idle_ticks: 0,
            timed_sleeps: 0,
            power_downs: 0,
        }
    }

    /// Raise `flag` after `ticks` idle ticks, as an external interrupt would
    pub fn interrupt_after(&mut self, flag: &'a InterruptFlag, ticks: u32) {
        self.irq = Some((flag, ticks));
    }

    /// Cut the next timed sleep short after `ms`
    pub fn wake_early_after(&mut self, ms: Tick) {
        self.wake_early_after = Some(ms);
    }

    /// Time that passes during an untimed power-down
    pub fn set_power_down_ms(&mut self, ms: Tick) {
        self.power_down_ms = ms;
    }

    pub fn idle_ticks(&self) -> u32 {
        self.idle_ticks
    }

    pub fn timed_sleeps(&self) -> u32 {
        self.timed_sleeps
    }

    pub fn power_downs(&self) -> u32 {
        self.power_downs
    }

    pub fn adc_enabled(&self) -> bool {
        self.adc_enabled
    }

    /// ADC state seen by the last power-down
    pub fn adc_during_power_down(&self) -> Option<bool> {
        self.adc_during_power_down
    }

    fn tick_irq(&mut self) {
        if let Some((flag, left)) = self.irq.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                flag.raise();
                self.irq = None;
            }
        }
    }
}

impl LowPower for SimPower<'_> {
    fn idle_unless<F: FnOnce() -> bool>(&mut self, pending: F) -> bool {
        if pending() {
            return false;
        }
        self.clock.advance(1);
        self.idle_ticks += 1;
        self.tick_irq();
        true
    }

    fn sleep_for<F: Fn() -> bool>(&mut self, ms: Tick, pending: F) -> bool {
        if pending() {
            return false;
        }
        self.timed_sleeps += 1;
        match self.wake_early_after.take() {
            Some(after) if after < ms => {
                self.clock.advance(after);
                false
            }
            _ => {
                self.clock.advance(ms);
                true
            }
        }
    }

    fn power_down(&mut self) {
        self.power_downs += 1;
        self.adc_during_power_down = Some(self.adc_enabled);
        self.clock.advance(self.power_down_ms);
    }

    fn disable_adc(&mut self) -> bool {
        core::mem::replace(&mut self.adc_enabled, false)
    }

    fn restore_adc(&mut self, was_enabled: bool) {
        self.adc_enabled = was_enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_spends_one_tick() {
        let clock = SimClock::new(10);
        let mut power = SimPower::new(&clock);
        assert!(power.idle_unless(|| false));
        assert_eq!(clock.millis(), 11);
        assert!(!power.idle_unless(|| true));
        assert_eq!(clock.millis(), 11);
        assert_eq!(power.idle_ticks(), 1);
    }

    #[test]
    fn scripted_interrupt() {
        let clock = SimClock::new(0);
        let flag = InterruptFlag::new();
        let mut power = SimPower::new(&clock);
        power.interrupt_after(&flag, 2);
        power.idle_unless(|| false);
        assert!(!flag.is_raised());
        power.idle_unless(|| false);
        assert!(flag.is_raised());
    }

    #[test]
    fn early_wake_is_reported() {
        let clock = SimClock::new(0);
        let mut power = SimPower::new(&clock);
        power.wake_early_after(30);
        assert!(!power.sleep_for(100, || false));
        assert_eq!(clock.millis(), 30);
        assert!(power.sleep_for(100, || false));
        assert_eq!(clock.millis(), 130);
    }

    #[test]
    fn timed_sleep_skipped_when_pending() {
        let clock = SimClock::new(0);
        let mut power = SimPower::new(&clock);
        assert!(!power.sleep_for(100, || true));
        assert_eq!(clock.millis(), 0);
        assert_eq!(power.timed_sleeps(), 0);
    }
}
