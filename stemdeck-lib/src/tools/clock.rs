//! Time sources for the transport.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A monotonic time source in seconds with an arbitrary epoch.
///
/// Readings must never decrease.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock backed by [`Instant`], with its epoch at construction.
#[derive(Debug, Clone)]
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

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Virtual clock advanced explicitly by its owner.
///
/// Clones share the same reading, so a host can keep one handle while the
/// engine holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at `time` seconds.
    pub fn starting_at(time: f64) -> Self {
        Self {
            time: Arc::new(Mutex::new(time.max(0.0))),
        }
    }

    /// Move forward by `seconds`. Negative or non-finite steps are ignored.
    pub fn advance(&self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        let mut time = self.time.lock().unwrap();
        *time += seconds;
    }

    /// Jump to `time`; requests to move backwards are ignored.
    pub fn set(&self, time: f64) {
        let mut current = self.time.lock().unwrap();
        if time.is_finite() && time > *current {
            *current = time;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.time.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_and_monotonic() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(1.5);
        assert_eq!(clock.now(), 1.5);
        handle.set(1.0);
        assert_eq!(clock.now(), 1.5);
        handle.advance(-3.0);
        assert_eq!(clock.now(), 1.5);
        handle.set(4.0);
        assert_eq!(clock.now(), 4.0);
    }

    #[test]
    fn system_clock_does_not_go_backwards() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
