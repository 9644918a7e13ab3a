//! Frame clocks
//!
//! A [`FrameClock`] is the per-frame tick source: it reports monotonic time
//! in milliseconds and the scheduler derives elapsed real time from
//! consecutive reads. Production hosts use [`SystemClock`]; tests inject a
//! [`ManualClock`] and advance it by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source read once per frame
pub trait FrameClock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> f64;
}

/// Wall-clock time from [`Instant`]
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock
///
/// Clones share the same time cell, so a test can keep one handle and give
/// another to the scheduler under test.
///
/// ```
/// use itinera_core::clock::{FrameClock, ManualClock};
///
/// let clock = ManualClock::new();
/// let shared = clock.clone();
/// clock.advance(16.0);
/// assert_eq!(shared.now_ms(), 16.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `ms` (negative values are ignored)
    pub fn advance(&self, ms: f64) {
        if ms > 0.0 {
            self.now.set(self.now.get() + ms);
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms.max(self.now.get()));
    }
}

impl FrameClock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl<C: FrameClock + ?Sized> FrameClock for Rc<C> {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_monotonic() {
        let clock = ManualClock::new();
        clock.advance(10.0);
        clock.advance(-5.0);
        clock.set(3.0);
        assert_eq!(clock.now_ms(), 10.0);
        clock.set(25.0);
        assert_eq!(clock.now_ms(), 25.0);
    }

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
