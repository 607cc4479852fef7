//! # Adaptive Render Delay
//!
//! Turns jitter and round-trip estimates into the render delay the
//! reconciler lags behind the authoritative clock.
//!
//! ```text
//! tick   = clamp(mean_interval, 16ms, 100ms)
//! target = 3.5·tick + 2·std_dev + 0.25·clamp(rtt, 0, 250ms)
//!          clamped to [min_delay, max_delay]
//! ```
//!
//! The active delay chases the target asymmetrically: it rises fast so a
//! latency spike never drains the buffer, and falls slowly so the buffer
//! does not visibly breathe once the spike is over.

use crate::config::SyncConfig;

/// Lower clamp for the per-sample interval fed into the target.
pub const MIN_TICK: f64 = 0.016;
/// Upper clamp for the per-sample interval fed into the target.
pub const MAX_TICK: f64 = 0.100;
/// Round-trip estimates above this are treated as this.
pub const MAX_RTT: f64 = 0.250;
/// Lower clamp for the dynamic extrapolation window.
pub const MIN_EXTRAPOLATION: f64 = 0.060;

const TICK_FACTOR: f64 = 3.5;
const STD_DEV_FACTOR: f64 = 2.0;
const RTT_FACTOR: f64 = 0.25;

/// Active and target render delay (seconds).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelayState {
    /// Delay actually used for rendering.
    pub active_delay: f64,
    /// Delay the active value is moving toward.
    pub target_delay: f64,
}

/// Asymmetric render-delay controller.
#[derive(Clone, Debug)]
pub struct AdaptiveDelayController {
    state: DelayState,
    min_delay: f64,
    max_delay: f64,
    rise_rate: f64,
    fall_rate: f64,
}

impl AdaptiveDelayController {
    /// Creates a controller starting at `min_delay`.
    #[must_use]
    pub fn new(min_delay: f64, max_delay: f64, rise_rate: f64, fall_rate: f64) -> Self {
        Self {
            state: DelayState {
                active_delay: min_delay,
                target_delay: min_delay,
            },
            min_delay,
            max_delay: max_delay.max(min_delay),
            rise_rate: rise_rate.max(0.0),
            fall_rate: fall_rate.max(0.0),
        }
    }

    /// Creates a controller from validated configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.min_delay, config.max_delay, config.rise_rate, config.fall_rate)
    }

    /// Target delay for the given link estimates, before smoothing.
    ///
    /// Non-finite inputs count as "no information": the tick falls back to
    /// its lower clamp, the deviation and the round trip to zero.
    #[must_use]
    pub fn compute_target(&self, mean_interval: f64, std_dev: f64, rtt: f64) -> f64 {
        let tick = finite_or(mean_interval, MIN_TICK).clamp(MIN_TICK, MAX_TICK);
        let std_dev = finite_or(std_dev, 0.0).max(0.0);
        let rtt = finite_or(rtt, 0.0).clamp(0.0, MAX_RTT);
        let target = TICK_FACTOR * tick + STD_DEV_FACTOR * std_dev + RTT_FACTOR * rtt;
        target.clamp(self.min_delay, self.max_delay)
    }

    /// Recomputes the target and moves the active delay toward it.
    ///
    /// `dt` is the unscaled frame time in seconds. Returns the new active delay.
    pub fn update(&mut self, mean_interval: f64, std_dev: f64, rtt: f64, dt: f64) -> f64 {
        let target = self.compute_target(mean_interval, std_dev, rtt);
        self.step_toward(target, dt)
    }

    /// Moves the active delay toward an explicit target.
    ///
    /// The target is clamped to the configured bounds first. A NaN target or
    /// frame time leaves the active delay where it is.
    pub fn step_toward(&mut self, target: f64, dt: f64) -> f64 {
        if target.is_nan() || dt.is_nan() {
            return self.state.active_delay;
        }
        let target = target.clamp(self.min_delay, self.max_delay);
        let dt = dt.max(0.0);
        let current = self.state.active_delay;
        let rate = if target > current { self.rise_rate } else { self.fall_rate };

        self.state.target_delay = target;
        self.state.active_delay = move_towards(current, target, rate * dt);
        self.state.active_delay
    }

    /// Forces the active delay, clamped to bounds. Used by tests and tools.
    /// NaN is ignored.
    pub fn set_active_delay(&mut self, delay: f64) {
        if !delay.is_nan() {
            self.state.active_delay = delay.clamp(self.min_delay, self.max_delay);
        }
    }

    /// Longest extrapolation allowed at the current delay.
    #[must_use]
    pub fn dynamic_max_extrapolation(&self, max_extrapolation: f64) -> f64 {
        dynamic_max_extrapolation(self.state.active_delay, max_extrapolation)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DelayState {
        self.state
    }

    /// Delay used for rendering.
    #[must_use]
    pub const fn active_delay(&self) -> f64 {
        self.state.active_delay
    }

    /// Most recent target.
    #[must_use]
    pub const fn target_delay(&self) -> f64 {
        self.state.target_delay
    }
}

impl Default for AdaptiveDelayController {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Extrapolation window for a given active delay:
/// `clamp(2·active_delay, 60ms, max_extrapolation)`.
#[must_use]
pub fn dynamic_max_extrapolation(active_delay: f64, max_extrapolation: f64) -> f64 {
    (2.0 * active_delay).clamp(MIN_EXTRAPOLATION.min(max_extrapolation), max_extrapolation)
}

#[inline]
fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[inline]
fn move_towards(current: f64, target: f64, max_step: f64) -> f64 {
    if (target - current).abs() <= max_step {
        target
    } else {
        current + (target - current).signum() * max_step
    }
}
