//! Millisecond clock helpers.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating at zero on clock skew.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Deterministic, manually advanced clock for tests and simulations.
///
/// Single-threaded by design, like the scheduler it usually drives.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    /// Creates a clock starting at `start`.
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Current reading.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now.get()
    }

    /// Advances by `delta` and returns the new reading.
    pub fn advance(&self, delta: u64) -> u64 {
        let next = self.now.get() + delta;
        self.now.set(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        assert_eq!(clock.advance(50), 150);
        assert_eq!(clock.now(), 150);
    }

    #[test]
    fn now_ms_is_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
    }
}
