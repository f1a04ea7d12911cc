//! Schedule table entries and the types that describe them

use core::fmt;
use core::num::NonZeroU8;
use ufmt::{uDisplay, uWrite, Formatter};

use super::time::Tick;
use crate::config::NO_REPEAT;

/// Identifies a registered entry: slot index + 1.
///
/// Zero is reserved for "no entry", so `Option<Handle>` is still one byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(NonZeroU8);

impl Handle {
    /// Wrap a raw handle, `None` for 0
    #[inline]
    pub const fn new(raw: u8) -> Option<Self> {
        match NonZeroU8::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// Handle for table slot `index`
    #[inline]
    pub(crate) const fn from_index(index: usize) -> Option<Self> {
        if index >= u8::MAX as usize {
            return None;
        }
        Self::new(index as u8 + 1)
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0.get()
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.get())
    }
}

impl uDisplay for Handle {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_char('#')?;
        uDisplay::fmt(&self.get(), f)
    }
}

/// Priority class of an entry.
///
/// High and Interrupt entries run as soon as they are due. Normal and
/// Background entries compete for a single execution per dispatch pass,
/// Normal first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Priority {
    #[default]
    Normal = 0,
    Background = 1,
    High = 2,
    /// Like High, and forced due whenever the interrupt flag is raised
    Interrupt = 3,
}

impl Priority {
    pub const COUNT: usize = 4;

    /// Due entries of this class run immediately instead of competing
    #[inline]
    pub const fn is_immediate(self) -> bool {
        matches!(self, Priority::High | Priority::Interrupt)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::Background => "background",
            Priority::High => "high",
            Priority::Interrupt => "interrupt",
        }
    }
}

impl uDisplay for Priority {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

/// Function invoked when an entry fires
#[derive(Clone, Copy)]
pub enum Callback {
    Plain(fn()),
    /// Receives the entry's own handle, e.g. to re-arm or remove itself
    WithHandle(fn(Handle)),
}

impl Callback {
    #[inline]
    pub const fn wants_handle(&self) -> bool {
        matches!(self, Callback::WithHandle(_))
    }

    #[inline]
    pub(crate) fn invoke(&self, handle: Handle) {
        match self {
            Callback::Plain(f) => f(),
            Callback::WithHandle(f) => f(handle),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Plain(_) => f.write_str("Callback::Plain"),
            Callback::WithHandle(_) => f.write_str("Callback::WithHandle"),
        }
    }
}

/// What kind of entry occupies a slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduleType {
    pub priority: Priority,
    /// Periodic entries re-arm after firing, one-shots free their slot
    pub repeats: bool,
}

impl ScheduleType {
    #[inline]
    pub const fn for_period(period: Tick, priority: Priority) -> Self {
        Self {
            priority,
            repeats: period != NO_REPEAT,
        }
    }
}

/// One slot of the schedule table
#[derive(Clone, Copy, Debug)]
pub struct ScheduleEntry {
    /// Milliseconds between firings, [`NO_REPEAT`] for one-shots
    pub period: Tick,
    /// Absolute deadline, only meaningful while the slot is in use
    pub next: Tick,
    /// `None` marks a free slot
    pub kind: Option<ScheduleType>,
    pub event: Option<Callback>,
    /// Bumped on every allocation of this slot
    pub generation: u8,
}

impl ScheduleEntry {
    pub const FREE: Self = Self {
        period: 0,
        next: 0,
        kind: None,
        event: None,
        generation: 0,
    };

    #[inline]
    pub const fn is_free(&self) -> bool {
        self.kind.is_none()
    }

    /// Priority of an occupied slot
    #[inline]
    pub fn priority(&self) -> Option<Priority> {
        self.kind.map(|kind| kind.priority)
    }

    /// Clear the slot, keeping its generation count
    #[inline]
    pub(crate) fn release(&mut self) {
        *self = Self {
            generation: self.generation,
            ..Self::FREE
        };
    }
}

impl Default for ScheduleEntry {
    fn default() -> Self {
        Self::FREE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::size_of;

    #[test]
    fn handle_zero_is_invalid() {
        assert!(Handle::new(0).is_none());
        assert_eq!(Handle::new(3).map(Handle::get), Some(3));
        assert_eq!(size_of::<Option<Handle>>(), 1);
    }

    #[test]
    fn handle_maps_to_index() {
        let handle = Handle::from_index(0).unwrap();
        assert_eq!(handle.get(), 1);
        assert_eq!(handle.index(), 0);
        assert_eq!(Handle::from_index(254).map(Handle::get), Some(255));
        assert!(Handle::from_index(255).is_none());
    }

    #[test]
    fn immediate_classes() {
        assert!(Priority::High.is_immediate());
        assert!(Priority::Interrupt.is_immediate());
        assert!(!Priority::Normal.is_immediate());
        assert!(!Priority::Background.is_immediate());
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn one_shot_is_sentinel_period() {
        assert!(!ScheduleType::for_period(NO_REPEAT, Priority::High).repeats);
        assert!(ScheduleType::for_period(100, Priority::High).repeats);
    }

    #[test]
    fn release_keeps_generation() {
        fn noop() {}
        let mut entry = ScheduleEntry {
            period: 10,
            next: 20,
            kind: Some(ScheduleType::for_period(10, Priority::Normal)),
            event: Some(Callback::Plain(noop)),
            generation: 7,
        };
        assert!(!entry.is_free());
        entry.release();
        assert!(entry.is_free());
        assert!(entry.event.is_none());
        assert_eq!(entry.generation, 7);
    }

    #[test]
    fn callback_flags() {
        fn plain() {}
        fn with_handle(_: Handle) {}
        assert!(!Callback::Plain(plain).wants_handle());
        assert!(Callback::WithHandle(with_handle).wants_handle());
    }
}
