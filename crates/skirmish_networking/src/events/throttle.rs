//! Per-kind minimum resend interval.
//!
//! A send that comes too soon after the last allowed one is refused and does
//! not move the schedule, so the next attempt is judged against the original
//! send time.

use std::collections::HashMap;

use skirmish_shared::EventKind;

use crate::error::{NetError, NetResult};

/// Built-in throttle table: event kind and minimum interval (ms).
pub const DEFAULT_THROTTLES: &[(EventKind, f64)] = &[
    // Visual & effect
    (EventKind::PlayVfx, 200.0),
    (EventKind::PlayVfxAttached, 100.0),
    (EventKind::ShowEffectText, 200.0),
    (EventKind::ShowStaticEffectText, 200.0),
    (EventKind::PlaySfx, 200.0),
    (EventKind::PlayEndGameSound, 500.0),
    (EventKind::CameraShake, 200.0),
    (EventKind::PlayAnimation, 100.0),
    // State & position
    (EventKind::UpdateGroundState, 100.0),
    (EventKind::DropThrough, 100.0),
    (EventKind::ResetPlatformCollision, 100.0),
    (EventKind::ExplosionKnockback, 100.0),
    (EventKind::DuckKnockback, 100.0),
    (EventKind::RewindSync, 50.0),
    (EventKind::BulletFire, 50.0),
    (EventKind::BulletActivate, 200.0),
    (EventKind::BulletDeactivate, 200.0),
    (EventKind::OsokSetVisibility, 100.0),
    (EventKind::UpdateHealth, 50.0),
    (EventKind::UpdateAim, 50.0),
    // Wind
    (EventKind::ApplyWindEvent, 200.0),
    (EventKind::StopWindEvent, 200.0),
];

/// Throttle state for one event kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThrottleEntry {
    /// Event kind.
    pub kind: EventKind,
    /// Minimum spacing between allowed sends (ms).
    pub min_interval_ms: f64,
    /// Time of the last allowed send (ms), if any.
    pub last_sent_ms: Option<f64>,
}

/// Minimum-interval gate keyed by event kind.
#[derive(Clone, Debug, Default)]
pub struct RateThrottle {
    entries: HashMap<EventKind, ThrottleEntry>,
    suppressed: u64,
}

impl RateThrottle {
    /// Builds a throttle from `(kind, min_interval_ms)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a kind appears twice or an interval is negative.
    pub fn new(intervals: &[(EventKind, f64)]) -> NetResult<Self> {
        let mut entries = HashMap::with_capacity(intervals.len());
        for &(kind, min_interval_ms) in intervals {
            check_interval(kind, min_interval_ms)?;
            let entry = ThrottleEntry {
                kind,
                min_interval_ms,
                last_sent_ms: None,
            };
            if entries.insert(kind, entry).is_some() {
                return Err(NetError::DuplicateThrottle(kind));
            }
        }
        Ok(Self { entries, suppressed: 0 })
    }

    /// Throttle over [`DEFAULT_THROTTLES`] with `overrides` layered on top.
    /// An override of zero removes the entry.
    ///
    /// # Errors
    ///
    /// Returns an error if an override interval is negative.
    pub fn with_overrides(overrides: &[(EventKind, f64)]) -> NetResult<Self> {
        let mut throttle = Self::new(DEFAULT_THROTTLES)?;
        for &(kind, min_interval_ms) in overrides {
            check_interval(kind, min_interval_ms)?;
            if min_interval_ms == 0.0 {
                throttle.entries.remove(&kind);
            } else {
                throttle.entries.insert(
                    kind,
                    ThrottleEntry {
                        kind,
                        min_interval_ms,
                        last_sent_ms: None,
                    },
                );
            }
        }
        Ok(throttle)
    }

    /// Returns `true` if `kind` may be sent at `now_ms`, recording the send.
    ///
    /// Unthrottled kinds always pass. A refused attempt leaves the schedule
    /// untouched.
    pub fn should_send(&mut self, kind: EventKind, now_ms: f64) -> bool {
        let Some(entry) = self.entries.get_mut(&kind) else {
            return true;
        };
        if let Some(last) = entry.last_sent_ms {
            if now_ms - last < entry.min_interval_ms {
                self.suppressed += 1;
                return false;
            }
        }
        entry.last_sent_ms = Some(now_ms);
        true
    }

    /// Entry for `kind`, if throttled.
    #[must_use]
    pub fn entry(&self, kind: EventKind) -> Option<&ThrottleEntry> {
        self.entries.get(&kind)
    }

    /// Number of throttled kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is throttled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sends refused so far.
    #[must_use]
    pub const fn suppressed(&self) -> u64 {
        self.suppressed
    }

    /// Forgets every last-sent time.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.last_sent_ms = None;
        }
    }
}

fn check_interval(kind: EventKind, min_interval_ms: f64) -> NetResult<()> {
    if min_interval_ms.is_nan() || min_interval_ms < 0.0 {
        return Err(NetError::InvalidValue {
            field: "min_interval_ms",
            reason: format!("{kind} has {min_interval_ms}"),
        });
    }
    Ok(())
}
