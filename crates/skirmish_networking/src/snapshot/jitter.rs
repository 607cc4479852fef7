//! # Jitter Estimation
//!
//! Running mean and variance of the spacing between replication arrivals.
//!
//! Deltas outside `(0.5ms, 500ms)` are measurement artifacts (bursts coalesced
//! by the transport, or a stall) and are not used as jitter signal.

/// Smallest inter-arrival delta treated as signal (seconds).
pub const MIN_VALID_DELTA: f64 = 0.0005;

/// Largest inter-arrival delta treated as signal (seconds).
pub const MAX_VALID_DELTA: f64 = 0.5;

/// Default EWMA weight for new samples.
pub const DEFAULT_ALPHA: f64 = 0.10;

/// Mean interval assumed before the first observation (one 30Hz publish).
pub const INITIAL_MEAN_INTERVAL: f64 = 0.033;

/// Snapshot of the estimator's statistics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JitterStats {
    /// Mean inter-arrival spacing (seconds).
    pub mean_interval: f64,
    /// Variance of the spacing (seconds squared).
    pub variance: f64,
}

impl JitterStats {
    /// Standard deviation of the spacing (seconds).
    #[must_use]
    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Exponentially weighted inter-arrival estimator.
#[derive(Clone, Debug)]
pub struct JitterEstimator {
    alpha: f64,
    stats: JitterStats,
    initialized: bool,
    /// Observations used.
    accepted: u64,
    /// Observations discarded as artifacts.
    rejected: u64,
}

impl JitterEstimator {
    /// Creates an estimator with the given EWMA weight.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::MIN_POSITIVE, 1.0),
            stats: JitterStats {
                mean_interval: INITIAL_MEAN_INTERVAL,
                variance: 0.0,
            },
            initialized: false,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Feeds one inter-arrival delta (seconds).
    ///
    /// Returns `false` if the delta was outside the valid range and ignored.
    pub fn observe(&mut self, delta: f64) -> bool {
        if !(delta > MIN_VALID_DELTA && delta < MAX_VALID_DELTA) {
            self.rejected += 1;
            return false;
        }
        self.accepted += 1;

        if !self.initialized {
            self.stats = JitterStats {
                mean_interval: delta,
                variance: 0.0,
            };
            self.initialized = true;
            return true;
        }

        let diff = delta - self.stats.mean_interval;
        self.stats.mean_interval += self.alpha * diff;
        self.stats.variance = ((1.0 - self.alpha) * (self.stats.variance + self.alpha * diff * diff)).max(0.0);
        true
    }

    /// Current statistics.
    #[must_use]
    pub const fn stats(&self) -> JitterStats {
        self.stats
    }

    /// Mean inter-arrival spacing (seconds).
    #[must_use]
    pub const fn mean_interval(&self) -> f64 {
        self.stats.mean_interval
    }

    /// Standard deviation of the spacing (seconds).
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.stats.std_dev()
    }

    /// True once a valid delta has been observed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of deltas used and ignored, in that order.
    #[must_use]
    pub const fn counts(&self) -> (u64, u64) {
        (self.accepted, self.rejected)
    }
}

impl Default for JitterEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
