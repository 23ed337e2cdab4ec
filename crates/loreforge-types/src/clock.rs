//! Wall-clock abstraction for the game backend.
//!
//! All temporal decisions in the core (simulation gating, memory decay,
//! schedule replay) go through [`Clock`] rather than calling
//! `Utc::now()` directly, so tests can pin time exactly. The contract is
//! a monotonically nondecreasing `now()` with second resolution or
//! better.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current instant. Never decreases between calls.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to an explicit instant, advanced manually.
///
/// Used by tests to make decay math and simulation gating deterministic.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock pinned to `instant`.
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(instant),
        }
    }

    /// Move the clock forward (or to any later instant).
    ///
    /// Attempts to move backwards are ignored, preserving the
    /// nondecreasing contract.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock()
            && instant > *guard
        {
            *guard = instant;
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, delta: chrono::TimeDelta) {
        if let Ok(mut guard) = self.now.lock() {
            let next = guard.checked_add_signed(delta).unwrap_or(*guard);
            if next > *guard {
                *guard = next;
            }
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn instant() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    #[test]
    fn fixed_clock_returns_pinned_instant() {
        let clock = FixedClock::new(instant());
        assert_eq!(clock.now(), instant());
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(instant());
        clock.advance(TimeDelta::hours(2));
        assert_eq!(clock.now(), instant() + TimeDelta::hours(2));
    }

    #[test]
    fn fixed_clock_never_goes_backwards() {
        let clock = FixedClock::new(instant());
        clock.set(instant() - TimeDelta::hours(1));
        assert_eq!(clock.now(), instant());
        clock.advance(TimeDelta::hours(-3));
        assert_eq!(clock.now(), instant());
    }

    #[test]
    fn system_clock_is_nondecreasing() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
