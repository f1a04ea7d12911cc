//! Priority-aware cooperative scheduler
//!
//! A fixed table of slots, each holding a one-shot or periodic callback.
//! Every dispatch pass runs all due High/Interrupt entries, at most one due
//! Normal-or-Background entry, and reports how long the caller may sleep.
//!
//! All methods take `&self`: slots are `Cell`s, so a callback may reach the
//! scheduler that is running it (to remove or re-arm itself) without any
//! re-entrant borrow.

use core::cell::Cell;

use super::interrupt::InterruptFlag;
use super::sleep::SleepMode;
use super::task::{Callback, Handle, Priority, ScheduleEntry, ScheduleType};
use super::time::{deadline_after, is_due, remaining, start_delay, until_due, Tick, IDLE};
use crate::config::{MAX_SCHEDULE_ENTRIES, NO_REPEAT};
use crate::error::ScheduleError;
use crate::hal::Clock;
use crate::{log_debug, log_trace, log_warn};

#[allow(clippy::declare_interior_mutable_const)]
const FREE_SLOT: Cell<ScheduleEntry> = Cell::new(ScheduleEntry::FREE);

/// Best Normal or Background entry seen during a scan
#[derive(Clone, Copy)]
struct Candidate {
    index: usize,
    generation: u8,
    remaining: Tick,
}

pub struct Scheduler<C, const N: usize = MAX_SCHEDULE_ENTRIES> {
    entries: [Cell<ScheduleEntry>; N],
    /// First slot looked at by the next scan
    offset: Cell<usize>,
    interrupt: InterruptFlag,
    sleep_mode: Cell<SleepMode>,
    clock: C,
}

// SAFETY: the AVR target is single core and has no threads. Interrupt
// handlers only ever call `interrupt()`, which touches nothing but the atomic
// flag; every `Cell` is read and written from main context alone.
#[cfg(target_arch = "avr")]
unsafe impl<C, const N: usize> Sync for Scheduler<C, N> {}

impl<C: Clock, const N: usize> Scheduler<C, N> {
    const CAPACITY_CHECK: () = assert!(N > 0 && N < u8::MAX as usize, "1..=254 slots");

    pub const fn new(clock: C) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;
        Self {
            entries: [FREE_SLOT; N],
            offset: Cell::new(0),
            interrupt: InterruptFlag::new(),
            sleep_mode: Cell::new(SleepMode::Idle),
            clock,
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.clock.millis()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.interrupt
    }

    /// Ask the next pass to force every Interrupt-class periodic entry due.
    ///
    /// The only operation meant for interrupt context.
    #[inline]
    pub fn interrupt(&self) {
        self.interrupt.raise();
    }

    pub fn set_sleep_mode(&self, mode: SleepMode) {
        self.sleep_mode.set(mode);
    }

    pub fn sleep_mode(&self) -> SleepMode {
        self.sleep_mode.get()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots
    pub fn pending(&self) -> usize {
        self.entries.iter().filter(|slot| !slot.get().is_free()).count()
    }

    pub fn is_active(&self, handle: Handle) -> bool {
        self.slot(handle).map_or(false, |slot| !slot.get().is_free())
    }

    /// Snapshot of the entry behind `handle`
    pub fn entry(&self, handle: Handle) -> Option<ScheduleEntry> {
        self.slot(handle).map(Cell::get).filter(|entry| !entry.is_free())
    }

    /// First free slot, `None` when the table is full
    pub fn find_free_handle(&self) -> Option<Handle> {
        self.entries
            .iter()
            .position(|slot| slot.get().is_free())
            .and_then(Handle::from_index)
    }

    /// Run `event` once, on the next pass
    pub fn run(&self, event: Callback, priority: Priority) -> Result<Handle, ScheduleError> {
        self.after(0, event, priority)
    }

    /// Run `event` once, `ms` milliseconds from now
    pub fn after(
        &self,
        ms: Tick,
        event: Callback,
        priority: Priority,
    ) -> Result<Handle, ScheduleError> {
        self.every(NO_REPEAT, event, priority, Some(ms))
    }

    /// Run `event` every `period` milliseconds.
    ///
    /// The first run comes after `delay`, or after one period when no delay
    /// is given. A period of [`NO_REPEAT`] makes this a one-shot.
    pub fn every(
        &self,
        period: Tick,
        event: Callback,
        priority: Priority,
        delay: Option<Tick>,
    ) -> Result<Handle, ScheduleError> {
        let Some(handle) = self.find_free_handle() else {
            log_warn!("sched: table full ({} slots)", N);
            return Err(ScheduleError::TableFull);
        };

        let slot = &self.entries[handle.index()];
        let generation = slot.get().generation.wrapping_add(1);
        slot.set(ScheduleEntry {
            period,
            next: deadline_after(self.now(), start_delay(period, delay)),
            kind: Some(ScheduleType::for_period(period, priority)),
            event: Some(event),
            generation,
        });

        log_debug!("sched: {} {} period={}", handle, priority, period);
        Ok(handle)
    }

    /// Move the deadline of a live entry, and its period if it repeats.
    ///
    /// Identity and priority stay the same. Fails on a free slot: a one-shot
    /// that already fired has to be registered again.
    pub fn update(
        &self,
        handle: Handle,
        period: Tick,
        delay: Option<Tick>,
    ) -> Result<Handle, ScheduleError> {
        let slot = self.slot(handle).ok_or(ScheduleError::StaleHandle)?;
        let mut entry = slot.get();
        let Some(kind) = entry.kind else {
            log_debug!("sched: update of free slot {}", handle);
            return Err(ScheduleError::StaleHandle);
        };

        if kind.repeats {
            entry.period = period;
            entry.kind = Some(ScheduleType::for_period(period, kind.priority));
        }
        entry.next = deadline_after(self.now(), start_delay(period, delay));
        slot.set(entry);
        Ok(handle)
    }

    /// Free the slot behind `handle`
    pub fn remove(&self, handle: Handle) {
        let Some(slot) = self.slot(handle) else {
            return;
        };
        let mut entry = slot.get();
        if !entry.is_free() {
            entry.release();
            slot.set(entry);
            log_debug!("sched: removed {}", handle);
        }
    }

    /// [`remove`](Self::remove) for a raw handle, 0 is ignored
    pub fn remove_raw(&self, raw: u8) {
        if let Some(handle) = Handle::new(raw) {
            self.remove(handle);
        }
    }

    /// One scheduler pass. Returns the milliseconds until the next entry
    /// becomes due, 0 when another pass is needed right away, or [`IDLE`]
    /// when nothing is scheduled.
    pub fn dispatch(&self) -> Tick {
        if self.interrupt.take() {
            self.force_interrupt_entries();
        }

        let offset = self.offset.get();
        self.offset.set((offset + 1) % N);

        let mut next_event = [IDLE; Priority::COUNT];
        let mut normal: Option<Candidate> = None;
        let mut background: Option<Candidate> = None;
        let mut more_work = false;

        for step in 0..N {
            let index = (offset + step) % N;
            let entry = self.entries[index].get();
            let Some(kind) = entry.kind else {
                continue;
            };
            let class = kind.priority as usize;

            let now = self.now();
            if !is_due(now, entry.next) {
                next_event[class] = next_event[class].min(until_due(now, entry.next));
                continue;
            }

            if kind.priority.is_immediate() {
                let hint = self.execute_entry(index);
                next_event[class] = next_event[class].min(hint);
                continue;
            }

            let best = match kind.priority {
                Priority::Normal => &mut normal,
                _ => &mut background,
            };
            let candidate = Candidate {
                index,
                generation: entry.generation,
                remaining: remaining(now, entry.next),
            };
            // A second due entry in the class means another pass is needed
            more_work |= best.is_some();
            // Smaller wrapped distance is further overdue
            if best.map_or(true, |current| candidate.remaining < current.remaining) {
                *best = Some(candidate);
            }
        }

        if normal.is_some() && background.is_some() {
            more_work = true;
        }
        if let Some(chosen) = normal.or(background) {
            let entry = self.entries[chosen.index].get();
            let now = self.now();
            match entry.kind {
                // A High callback earlier in this pass may have freed, reused
                // or re-armed it
                Some(kind) if entry.generation == chosen.generation => {
                    let class = kind.priority as usize;
                    let hint = if is_due(now, entry.next) {
                        self.execute_entry(chosen.index)
                    } else {
                        until_due(now, entry.next)
                    };
                    next_event[class] = next_event[class].min(hint);
                }
                _ => {}
            }
        }

        if more_work {
            return 0;
        }
        next_event.iter().copied().min().unwrap_or(IDLE)
    }

    /// Fire the entry in slot `index` and re-arm or free it.
    ///
    /// Returns the period for a periodic entry, [`IDLE`] otherwise.
    fn execute_entry(&self, index: usize) -> Tick {
        let slot = &self.entries[index];
        let before = slot.get();
        let (Some(event), Some(handle)) = (before.event, Handle::from_index(index)) else {
            return IDLE;
        };

        event.invoke(handle);

        let mut entry = slot.get();
        if entry.is_free() {
            // Removed itself
            return IDLE;
        }
        if entry.generation != before.generation {
            // Removed itself and something new took the slot
            return 0;
        }

        match entry.kind {
            Some(kind) if kind.repeats => {
                entry.next = deadline_after(self.now(), entry.period);
                slot.set(entry);
                entry.period
            }
            _ => {
                entry.release();
                slot.set(entry);
                IDLE
            }
        }
    }

    fn force_interrupt_entries(&self) {
        log_trace!("sched: interrupt rescan");
        let now = self.now();
        for slot in &self.entries {
            let mut entry = slot.get();
            let forced = matches!(
                entry.kind,
                Some(ScheduleType {
                    priority: Priority::Interrupt,
                    repeats: true,
                })
            );
            if forced {
                entry.next = deadline_after(now, 0);
                slot.set(entry);
            }
        }
    }

    #[inline]
    fn slot(&self, handle: Handle) -> Option<&Cell<ScheduleEntry>> {
        self.entries.get(handle.index())
    }
}

/// Fluent registration with the defaults of the plain API
pub struct TaskBuilder {
    event: Callback,
    priority: Priority,
    start_delay: Option<Tick>,
}

impl TaskBuilder {
    pub fn new(function: fn()) -> Self {
        Self::from_callback(Callback::Plain(function))
    }

    /// The callback receives its own handle
    pub fn with_handle(function: fn(Handle)) -> Self {
        Self::from_callback(Callback::WithHandle(function))
    }

    pub fn from_callback(event: Callback) -> Self {
        Self {
            event,
            priority: Priority::Normal,
            start_delay: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Delay before the first run of a periodic task
    pub fn start_delay(mut self, ms: Tick) -> Self {
        self.start_delay = Some(ms);
        self
    }

    pub fn run<C: Clock, const N: usize>(
        self,
        scheduler: &Scheduler<C, N>,
    ) -> Result<Handle, ScheduleError> {
        scheduler.run(self.event, self.priority)
    }

    pub fn after<C: Clock, const N: usize>(
        self,
        scheduler: &Scheduler<C, N>,
        ms: Tick,
    ) -> Result<Handle, ScheduleError> {
        scheduler.after(ms, self.event, self.priority)
    }

    pub fn every<C: Clock, const N: usize>(
        self,
        scheduler: &Scheduler<C, N>,
        period: Tick,
    ) -> Result<Handle, ScheduleError> {
        scheduler.every(period, self.event, self.priority, self.start_delay)
    }
}
