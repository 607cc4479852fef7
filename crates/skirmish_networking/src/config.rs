//! # Network Configuration
//!
//! Tuning for entity reconciliation and event transport, loaded once at
//! startup. Every key is optional; anything omitted keeps its default.
//!
//! ```toml
//! [sync]
//! min_delay = 0.08
//! max_delay = 0.15
//! fall_rate = 0.02
//! log_stats = true
//!
//! [events]
//! channel_count = 4
//!
//! [events.throttle_overrides]
//! PlayVfx = 250.0
//! ```
//!
//! Invalid values are rejected by [`NetConfig::validate`], which every
//! loader calls before returning.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skirmish_shared::{EventKind, DEFAULT_CHANNEL_COUNT};

use crate::error::{NetError, NetResult};

/// Complete network configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Remote entity reconciliation.
    pub sync: SyncConfig,
    /// Event channels and throttling.
    pub events: EventConfig,
}

impl NetConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(text: &str) -> NetResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> NetResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> NetResult<()> {
        self.sync.validate()?;
        self.events.validate()
    }
}

/// Reconciliation tuning. All times are seconds on the authoritative clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Lower clamp for the render delay.
    pub min_delay: f64,
    /// Upper clamp for the render delay.
    pub max_delay: f64,
    /// Hard cap on how far past the newest snapshot we extrapolate.
    pub max_extrapolation: f64,
    /// Snapshots kept per entity.
    pub buffer_capacity: usize,
    /// How fast the active delay rises toward a larger target (seconds per second).
    pub rise_rate: f64,
    /// How fast the active delay falls toward a smaller target (seconds per second).
    pub fall_rate: f64,
    /// Distance beyond which the entity snaps instead of gliding.
    pub teleport_threshold: f32,
    /// Exponential smoothing rate for the rendered position. Zero disables it.
    pub position_smoothing: f32,
    /// EWMA weight for new inter-arrival samples.
    pub jitter_alpha: f64,
    /// Emit periodic per-entity statistics at debug level.
    pub log_stats: bool,
    /// Seconds between statistics lines.
    pub log_interval: f64,
    /// Pending inbound replication messages before new ones are dropped.
    pub inbox_capacity: usize,
}

impl SyncConfig {
    /// Default lower delay clamp (80ms).
    pub const DEFAULT_MIN_DELAY: f64 = 0.08;
    /// Default upper delay clamp (150ms).
    pub const DEFAULT_MAX_DELAY: f64 = 0.15;
    /// Default extrapolation cap (250ms).
    pub const DEFAULT_MAX_EXTRAPOLATION: f64 = 0.25;
    /// Default snapshots per entity.
    pub const DEFAULT_BUFFER_CAPACITY: usize = 24;

    /// Checks ranges and orderings.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> NetResult<()> {
        if !(self.min_delay > 0.0 && self.min_delay <= self.max_delay) {
            return Err(NetError::InvalidDelayBounds {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        if self.max_extrapolation.is_nan() || self.max_extrapolation < 0.0 {
            return Err(invalid("max_extrapolation", "must be non-negative"));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid("buffer_capacity", "must be at least 1"));
        }
        if self.rise_rate.is_nan() || self.rise_rate < 0.0 {
            return Err(invalid("rise_rate", "must be non-negative"));
        }
        if self.fall_rate.is_nan() || self.fall_rate < 0.0 {
            return Err(invalid("fall_rate", "must be non-negative"));
        }
        if self.teleport_threshold.is_nan() || self.teleport_threshold <= 0.0 {
            return Err(invalid("teleport_threshold", "must be positive"));
        }
        if self.position_smoothing.is_nan() || self.position_smoothing < 0.0 {
            return Err(invalid("position_smoothing", "must be non-negative"));
        }
        if !(self.jitter_alpha > 0.0 && self.jitter_alpha <= 1.0) {
            return Err(invalid("jitter_alpha", "must be in (0, 1]"));
        }
        if self.log_interval.is_nan() || self.log_interval <= 0.0 {
            return Err(invalid("log_interval", "must be positive"));
        }
        if self.inbox_capacity == 0 {
            return Err(invalid("inbox_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            min_delay: Self::DEFAULT_MIN_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            max_extrapolation: Self::DEFAULT_MAX_EXTRAPOLATION,
            buffer_capacity: Self::DEFAULT_BUFFER_CAPACITY,
            rise_rate: 3.0,
            fall_rate: 0.01,
            teleport_threshold: 5.0,
            position_smoothing: 0.0,
            jitter_alpha: 0.10,
            log_stats: false,
            log_interval: 1.0,
            inbox_capacity: 1024,
        }
    }
}

/// Event transport tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Number of transport channels. Descriptor channels at or beyond this are coerced to 0.
    pub channel_count: u8,
    /// Minimum resend interval (ms) per event kind name, layered over the built-in table.
    /// A value of zero removes throttling for that kind.
    pub throttle_overrides: BTreeMap<String, f64>,
}

impl EventConfig {
    /// Checks ranges and resolves override names.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> NetResult<()> {
        if self.channel_count == 0 {
            return Err(invalid("channel_count", "must be at least 1"));
        }
        self.resolved_overrides().map(|_| ())
    }

    /// Throttle overrides keyed by event kind.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown kind names or negative intervals.
    pub fn resolved_overrides(&self) -> NetResult<Vec<(EventKind, f64)>> {
        self.throttle_overrides
            .iter()
            .map(|(name, &interval)| {
                let kind = EventKind::from_name(name)
                    .ok_or_else(|| NetError::UnknownEventName(name.clone()))?;
                if interval.is_nan() || interval < 0.0 {
                    return Err(invalid("throttle_overrides", format!("{name} must be non-negative")));
                }
                Ok((kind, interval))
            })
            .collect()
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_count: DEFAULT_CHANNEL_COUNT,
            throttle_overrides: BTreeMap::new(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> NetError {
    NetError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = NetConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.sync.min_delay - 0.08).abs() < 1e-12);
        assert!((config.sync.max_delay - 0.15).abs() < 1e-12);
        assert_eq!(config.sync.buffer_capacity, 24);
        assert_eq!(config.events.channel_count, 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = NetConfig::from_toml_str(
            r#"
            [sync]
            fall_rate = 0.05

            [events.throttle_overrides]
            PlayVfx = 250.0
            "#,
        )
        .unwrap();

        assert!((config.sync.fall_rate - 0.05).abs() < 1e-12);
        assert!((config.sync.rise_rate - 3.0).abs() < 1e-12);
        assert_eq!(
            config.events.resolved_overrides().unwrap(),
            vec![(EventKind::PlayVfx, 250.0)]
        );
    }

    #[test]
    fn test_inverted_delay_bounds_rejected() {
        let result = NetConfig::from_toml_str("[sync]\nmin_delay = 0.2\nmax_delay = 0.1\n");
        assert!(matches!(result, Err(NetError::InvalidDelayBounds { .. })));
    }

    #[test]
    fn test_unknown_override_name_rejected() {
        let result = NetConfig::from_toml_str("[events.throttle_overrides]\nNotAnEvent = 10.0\n");
        assert!(matches!(result, Err(NetError::UnknownEventName(name)) if name == "NotAnEvent"));
    }

    #[test]
    fn test_zero_channels_rejected() {
        let result = NetConfig::from_toml_str("[events]\nchannel_count = 0\n");
        assert!(matches!(result, Err(NetError::InvalidValue { field: "channel_count", .. })));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let result = NetConfig::from_toml_str("[sync\nmin_delay = ");
        assert!(matches!(result, Err(NetError::ConfigParse(_))));
    }
}
