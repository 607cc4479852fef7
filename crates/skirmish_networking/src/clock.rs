//! # Clocks
//!
//! The core never reads wall time itself. It asks a [`NetClock`] for:
//!
//! - the authoritative clock estimate (seconds, roughly synchronized across
//!   peers), used for snapshot render time and event send stamps;
//! - local monotonic time (milliseconds), used for throttling.

use std::time::Instant;

use parking_lot::{Mutex, RwLock};

/// Source of authoritative and local time.
pub trait NetClock: Send + Sync {
    /// Authoritative clock estimate (seconds).
    fn network_time(&self) -> f64;

    /// Local monotonic time (milliseconds).
    fn local_time_ms(&self) -> f64;
}

/// Monotonic clock with an adjustable offset to the authoritative clock.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
    offset: RwLock<f64>,
}

impl SystemClock {
    /// Creates a clock reading zero now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: RwLock::new(0.0),
        }
    }

    /// Sets the offset from local elapsed time to the authoritative clock.
    pub fn set_offset(&self, offset: f64) {
        *self.offset.write() = offset;
    }

    /// Current offset (seconds).
    #[must_use]
    pub fn offset(&self) -> f64 {
        *self.offset.read()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl NetClock for SystemClock {
    fn network_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64() + self.offset()
    }

    fn local_time_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualTime>,
}

#[derive(Debug, Default, Clone, Copy)]
struct ManualTime {
    network: f64,
    local_ms: f64,
}

impl ManualClock {
    /// Creates a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves both clocks forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        let mut state = self.state.lock();
        state.network += seconds;
        state.local_ms += seconds * 1000.0;
    }

    /// Sets the authoritative clock.
    pub fn set_network_time(&self, seconds: f64) {
        self.state.lock().network = seconds;
    }

    /// Sets the local clock.
    pub fn set_local_time_ms(&self, ms: f64) {
        self.state.lock().local_ms = ms;
    }
}

impl NetClock for ManualClock {
    fn network_time(&self) -> f64 {
        self.state.lock().network
    }

    fn local_time_ms(&self) -> f64 {
        self.state.lock().local_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        clock.advance(0.5);
        assert!((clock.network_time() - 0.5).abs() < 1e-12);
        assert!((clock.local_time_ms() - 500.0).abs() < 1e-9);

        clock.set_network_time(10.0);
        clock.set_local_time_ms(3.0);
        assert_eq!(clock.network_time(), 10.0);
        assert_eq!(clock.local_time_ms(), 3.0);
    }

    #[test]
    fn test_system_clock_offset() {
        let clock = SystemClock::new();
        clock.set_offset(100.0);
        assert!(clock.network_time() >= 100.0);
        assert!(clock.local_time_ms() < 100_000.0);
    }
}
