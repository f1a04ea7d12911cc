//! Scheduler error type

use core::fmt;
use ufmt::{uDisplay, uWrite, Formatter};

/// Why a schedule operation did not take effect.
///
/// Neither case leaves any resource held; callers either free a slot or
/// register again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// Every slot is in use
    TableFull,
    /// The handle's slot is free, the entry already fired or was removed
    StaleHandle,
}

impl ScheduleError {
    pub const fn as_str(self) -> &'static str {
        match self {
            ScheduleError::TableFull => "schedule table full",
            ScheduleError::StaleHandle => "stale schedule handle",
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl uDisplay for ScheduleError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}
