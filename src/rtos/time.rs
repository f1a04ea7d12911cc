//! Wraparound-safe millisecond deadline arithmetic
//!
//! Deadlines live in the same 16-bit domain as the tick counter and are never
//! compared with `<` or `>`. Instead `deadline - now` is taken with wrapping
//! subtraction: a small result means "due in that many ticks", a result above
//! [`DUE_WINDOW`] can only come from a wrap and therefore means "already due".

use crate::config::{DUE_WINDOW, NO_REPEAT};

/// Monotonic millisecond tick, wraps every 65.536 s
pub type Tick = u16;

/// Returned by a dispatch pass when nothing at all is pending
pub const IDLE: Tick = Tick::MAX;

/// Ticks left until `deadline`, as an unsigned wrapped difference
#[inline]
pub const fn remaining(now: Tick, deadline: Tick) -> Tick {
    deadline.wrapping_sub(now)
}

/// Has `deadline` passed at `now`?
#[inline]
pub const fn is_due(now: Tick, deadline: Tick) -> bool {
    remaining(now, deadline) > DUE_WINDOW
}

/// Ticks until a not-yet-due `deadline` becomes due.
///
/// Due means strictly past, so a deadline equal to `now` is one tick away.
#[inline]
pub const fn until_due(now: Tick, deadline: Tick) -> Tick {
    remaining(now, deadline) + 1
}

/// Deadline for something that should run `delay` ticks from `now`.
///
/// The `-1` absorbs the overhead of the dispatch pass itself so periodic
/// entries do not drift late.
#[inline]
pub const fn deadline_after(now: Tick, delay: Tick) -> Tick {
    now.wrapping_add(delay).wrapping_sub(1)
}

/// First delay for a registration: the explicit start delay, or one period
#[inline]
pub const fn start_delay(period: Tick, delay: Option<Tick>) -> Tick {
    match delay {
        Some(d) if d != NO_REPEAT => d,
        _ => period,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn future_deadline_is_not_due() {
        assert!(!is_due(100, 105));
        assert!(!is_due(100, 100));
        assert_eq!(remaining(100, 105), 5);
        assert_eq!(until_due(100, 105), 6);
        assert_eq!(until_due(100, 100), 1);
    }

    #[test]
    fn past_deadline_is_due() {
        assert!(is_due(100, 99));
        assert!(is_due(100, 0));
        assert_eq!(remaining(100, 99), Tick::MAX);
    }

    #[test]
    fn due_check_survives_counter_wrap() {
        // Deadline just past the wrap, clock just before it
        assert!(!is_due(65_530, 4));
        assert_eq!(remaining(65_530, 4), 10);
        // Clock wrapped past the deadline
        assert!(is_due(5, 4));
        assert!(is_due(2, 65_534));
    }

    #[test]
    fn window_edge() {
        assert!(!is_due(0, DUE_WINDOW));
        assert!(is_due(0, DUE_WINDOW + 1));
    }

    #[test]
    fn deadline_bias() {
        assert_eq!(deadline_after(10, 5), 14);
        assert_eq!(deadline_after(0, 0), Tick::MAX);
        assert!(is_due(10, deadline_after(10, 0)));
        assert!(!is_due(10, deadline_after(10, 1)));
        assert!(is_due(11, deadline_after(10, 1)));
    }

    #[test]
    fn start_delay_defaults_to_period() {
        assert_eq!(start_delay(250, None), 250);
        assert_eq!(start_delay(250, Some(NO_REPEAT)), 250);
        assert_eq!(start_delay(250, Some(0)), 0);
        assert_eq!(start_delay(NO_REPEAT, Some(40)), 40);
    }
}
