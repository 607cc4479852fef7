//! Fixed-rate replication on the authoritative side.
//!
//! The owner of an entity samples its state every frame but only publishes
//! at [`PUBLISH_RATE_HZ`](skirmish_shared::PUBLISH_RATE_HZ). Leftover time is
//! carried over so the long-run rate is exact regardless of frame pacing.

use skirmish_shared::{ReplicationMessage, Vec2, PUBLISH_RATE_HZ};

/// Publish gate for one owned entity.
#[derive(Clone, Debug)]
pub struct ReplicationPublisher {
    interval: f64,
    accumulator: f64,
    published: u64,
}

impl ReplicationPublisher {
    /// Creates a publisher for `rate_hz` messages per second (minimum 1).
    #[must_use]
    pub fn new(rate_hz: u32) -> Self {
        Self {
            interval: 1.0 / f64::from(rate_hz.max(1)),
            // Publish on the very first poll.
            accumulator: f64::INFINITY,
            published: 0,
        }
    }

    /// Advances by `dt` seconds and returns a message if one is due.
    ///
    /// At most one message is produced per call. Carry-over is capped at one
    /// interval, so after a long frame the next call may publish again but
    /// the backlog never grows beyond that single catch-up message.
    pub fn poll(
        &mut self,
        dt: f64,
        now: f64,
        position: Vec2,
        velocity: Vec2,
        grounded: bool,
    ) -> Option<ReplicationMessage> {
        self.accumulator += dt.max(0.0);
        if self.accumulator < self.interval {
            return None;
        }

        self.accumulator = if self.accumulator.is_finite() {
            (self.accumulator - self.interval).min(self.interval)
        } else {
            0.0
        };
        self.published += 1;
        Some(ReplicationMessage::new(position, velocity, grounded, now))
    }

    /// Seconds between messages.
    #[must_use]
    pub const fn interval(&self) -> f64 {
        self.interval
    }

    /// Messages produced so far.
    #[must_use]
    pub const fn published(&self) -> u64 {
        self.published
    }
}

impl Default for ReplicationPublisher {
    fn default() -> Self {
        Self::new(PUBLISH_RATE_HZ)
    }
}
