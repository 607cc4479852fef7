//! # Render-Time Reconciliation
//!
//! Every render frame, decide where a remote entity should appear:
//!
//! ```text
//!            render_time
//!                 │
//!   ──[s0]──[s1]──┼──[s2]──[s3]──────────▶ authoritative time
//!                 │
//!   before s0     → Hold         (oldest pose verbatim)
//!   inside s_i    → Interpolate  (newest bracketing pair)
//!   after s_last  → Extrapolate  (bounded by the dynamic window)
//! ```
//!
//! The resolved target then passes a teleport check against where the entity
//! is currently drawn. Large discontinuities (respawns, level transitions)
//! snap instead of sliding across the arena.
//!
//! ## Usage:
//! ```ignore
//! let mut reconciler = Reconciler::from_config(&config);
//!
//! // Each render frame:
//! let window = dynamic_max_extrapolation(active_delay, config.max_extrapolation);
//! if let Some(pose) = reconciler.reconcile(&mut buffer, clock - active_delay, window, dt) {
//!     draw(pose.position);
//! }
//! ```

use skirmish_shared::Vec2;

use crate::config::SyncConfig;
use crate::snapshot::{Snapshot, SnapshotBuffer};

/// Spans shorter than this are treated as a single instant.
const MIN_SPAN: f64 = 1e-6;

/// Which policy produced a pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconcileMode {
    /// Render time precedes the oldest snapshot; the buffer ran dry.
    Hold,
    /// Render time is bracketed by two snapshots.
    Interpolate,
    /// Render time is past the newest snapshot.
    Extrapolate,
}

/// Target pose computed from the buffer alone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedPose {
    /// Position to move toward.
    pub position: Vec2,
    /// Velocity to report.
    pub velocity: Vec2,
    /// Grounded flag of the governing snapshot.
    pub grounded: bool,
    /// Policy used.
    pub mode: ReconcileMode,
    /// Interpolation weight in `[0, 1]` (zero unless interpolating).
    pub weight: f64,
    /// Time projected forward (zero unless extrapolating).
    pub extrapolated: f64,
}

/// Resolves the target pose for `render_time`.
///
/// Returns `None` if the buffer is empty.
#[must_use]
pub fn resolve(buffer: &SnapshotBuffer, render_time: f64, max_extrapolation: f64) -> Option<ResolvedPose> {
    let first = buffer.first()?;

    if render_time <= first.timestamp {
        return Some(pose_from(first, ReconcileMode::Hold));
    }

    // Newest bracketing pair wins.
    for i in (0..buffer.len().saturating_sub(1)).rev() {
        let (Some(a), Some(b)) = (buffer.get(i), buffer.get(i + 1)) else {
            continue;
        };
        if a.timestamp <= render_time && render_time <= b.timestamp {
            let span = b.timestamp - a.timestamp;
            let weight = if span > MIN_SPAN {
                ((render_time - a.timestamp) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            #[allow(clippy::cast_possible_truncation)]
            let t = weight as f32;
            return Some(ResolvedPose {
                position: a.position.lerp(b.position, t),
                velocity: a.velocity.lerp(b.velocity, t),
                grounded: if weight < 0.5 { a.grounded } else { b.grounded },
                mode: ReconcileMode::Interpolate,
                weight,
                extrapolated: 0.0,
            });
        }
    }

    let last = buffer.latest()?;
    let ahead = (render_time - last.timestamp).clamp(0.0, max_extrapolation.max(0.0));
    #[allow(clippy::cast_possible_truncation)]
    let position = last.position + last.velocity * (ahead as f32);
    Some(ResolvedPose {
        position,
        velocity: last.velocity,
        grounded: last.grounded,
        mode: ReconcileMode::Extrapolate,
        weight: 0.0,
        extrapolated: ahead,
    })
}

fn pose_from(snapshot: &Snapshot, mode: ReconcileMode) -> ResolvedPose {
    ResolvedPose {
        position: snapshot.position,
        velocity: snapshot.velocity,
        grounded: snapshot.grounded,
        mode,
        weight: 0.0,
        extrapolated: 0.0,
    }
}

/// Pose handed to the rendering layer for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPose {
    /// Where to draw the entity.
    pub position: Vec2,
    /// Velocity for animation and effects.
    pub velocity: Vec2,
    /// Grounded flag.
    pub grounded: bool,
    /// Policy that produced the target.
    pub mode: ReconcileMode,
    /// Time projected past the newest snapshot (zero unless extrapolating).
    pub extrapolated: f64,
    /// True if the entity snapped this frame.
    pub teleported: bool,
}

/// Exponential position damping.
///
/// `smoothed += (target − smoothed)·(1 − e^{−k·dt})`. A rate of zero passes
/// the target straight through.
#[derive(Clone, Debug)]
pub struct PositionSmoother {
    rate: f32,
    smoothed: Option<Vec2>,
}

impl PositionSmoother {
    /// Creates a smoother. Negative rates are treated as zero.
    #[must_use]
    pub fn new(rate: f32) -> Self {
        Self {
            rate: rate.max(0.0),
            smoothed: None,
        }
    }

    /// Advances toward `target` and returns the damped position.
    ///
    /// The first call after creation or [`Self::snap`] starts at the target.
    pub fn update(&mut self, target: Vec2, dt: f32) -> Vec2 {
        let next = match self.smoothed {
            Some(current) if self.rate > 0.0 => {
                let k = 1.0 - (-self.rate * dt.max(0.0)).exp();
                current + (target - current) * k
            }
            _ => target,
        };
        self.smoothed = Some(next);
        next
    }

    /// Jumps straight to `position`, discarding any damping in progress.
    pub fn snap(&mut self, position: Vec2) {
        self.smoothed = Some(position);
    }

    /// Current damped position.
    #[must_use]
    pub const fn current(&self) -> Option<Vec2> {
        self.smoothed
    }

    /// True if damping is active.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.rate > 0.0
    }
}

/// Per-entity render-time state: where the entity is drawn, teleport
/// detection and optional smoothing.
#[derive(Clone, Debug)]
pub struct Reconciler {
    teleport_threshold: f32,
    smoother: PositionSmoother,
    rendered: Option<Vec2>,
    /// Total snaps performed.
    pub total_teleports: u64,
}

impl Reconciler {
    /// Creates a reconciler.
    #[must_use]
    pub fn new(teleport_threshold: f32, position_smoothing: f32) -> Self {
        Self {
            teleport_threshold,
            smoother: PositionSmoother::new(position_smoothing),
            rendered: None,
            total_teleports: 0,
        }
    }

    /// Creates a reconciler from validated configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.teleport_threshold, config.position_smoothing)
    }

    /// Seeds the drawn position, e.g. with the spawn point.
    #[must_use]
    pub fn with_initial_position(mut self, position: Vec2) -> Self {
        self.rendered = Some(position);
        self.smoother.snap(position);
        self
    }

    /// Computes this frame's pose.
    ///
    /// Returns `None` (caller keeps the previous pose) if the buffer is empty.
    /// On a teleport the buffer is reset, including its arrival ordering.
    pub fn reconcile(
        &mut self,
        buffer: &mut SnapshotBuffer,
        render_time: f64,
        max_extrapolation: f64,
        dt: f32,
    ) -> Option<RenderPose> {
        let target = resolve(buffer, render_time, max_extrapolation)?;

        if let Some(current) = self.rendered {
            if current.distance(target.position) > self.teleport_threshold {
                buffer.reset();
                self.snap_to(target.position);
                self.total_teleports += 1;
                tracing::debug!(
                    "Teleport: {:.2} units ({:?} -> {:?})",
                    current.distance(target.position),
                    current,
                    target.position
                );
                return Some(RenderPose {
                    position: target.position,
                    velocity: target.velocity,
                    grounded: target.grounded,
                    mode: target.mode,
                    extrapolated: target.extrapolated,
                    teleported: true,
                });
            }
        }

        let position = self.smoother.update(target.position, dt);
        self.rendered = Some(position);
        Some(RenderPose {
            position,
            velocity: target.velocity,
            grounded: target.grounded,
            mode: target.mode,
            extrapolated: target.extrapolated,
            teleported: false,
        })
    }

    /// Places the entity at `position` with no smoothing carried over.
    pub fn snap_to(&mut self, position: Vec2) {
        self.rendered = Some(position);
        self.smoother.snap(position);
    }

    /// Where the entity was last drawn.
    #[must_use]
    pub const fn rendered_position(&self) -> Option<Vec2> {
        self.rendered
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moving_right() -> SnapshotBuffer {
        let mut buffer = SnapshotBuffer::default();
        for (t, x) in [(0.0, 0.0), (0.033, 0.033), (0.066, 0.066)] {
            buffer.ingest(t, Vec2::new(x, 0.0), Vec2::X);
        }
        buffer
    }

    #[test]
    fn test_empty_buffer_is_noop() {
        let mut buffer = SnapshotBuffer::default();
        let mut reconciler = Reconciler::default();
        assert!(resolve(&buffer, 1.0, 0.1).is_none());
        assert!(reconciler.reconcile(&mut buffer, 1.0, 0.1, 0.016).is_none());
        assert!(reconciler.rendered_position().is_none());
    }

    #[test]
    fn test_hold_before_first() {
        let buffer = moving_right();
        let pose = resolve(&buffer, -0.5, 0.1).unwrap();
        assert_eq!(pose.mode, ReconcileMode::Hold);
        assert_eq!(pose.position, Vec2::ZERO);

        let at_first = resolve(&buffer, 0.0, 0.1).unwrap();
        assert_eq!(at_first.mode, ReconcileMode::Hold);
    }

    #[test]
    fn test_interpolation() {
        let buffer = moving_right();
        let pose = resolve(&buffer, 0.030, 0.1).unwrap();
        assert_eq!(pose.mode, ReconcileMode::Interpolate);
        assert!((pose.weight - 0.030 / 0.033).abs() < 1e-9);
        assert!((pose.position.x - 0.030).abs() < 1e-5);
        assert!(pose.position.y.abs() < 1e-6);
    }

    #[test]
    fn test_interpolation_uses_newest_bracket() {
        let mut buffer = SnapshotBuffer::default();
        buffer.ingest(0.0, Vec2::ZERO, Vec2::ZERO);
        buffer.ingest(1.0, Vec2::new(10.0, 0.0), Vec2::ZERO);
        buffer.ingest(2.0, Vec2::new(20.0, 0.0), Vec2::ZERO);

        // Exactly on a shared boundary: both pairs bracket it, the newer one wins.
        let pose = resolve(&buffer, 1.0, 0.1).unwrap();
        assert_eq!(pose.mode, ReconcileMode::Interpolate);
        assert!(pose.weight.abs() < 1e-12);
        assert!((pose.position.x - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_extrapolation_clamped() {
        let buffer = moving_right();

        let near = resolve(&buffer, 0.1, 0.1).unwrap();
        assert_eq!(near.mode, ReconcileMode::Extrapolate);
        assert!((near.extrapolated - 0.034).abs() < 1e-9);
        assert!((near.position.x - 0.1).abs() < 1e-5);

        let far = resolve(&buffer, 5.0, 0.1).unwrap();
        assert!((far.extrapolated - 0.1).abs() < 1e-12);
        assert!((far.position.x - 0.166).abs() < 1e-5);
    }

    #[test]
    fn test_first_pose_sets_rendered() {
        let mut buffer = moving_right();
        let mut reconciler = Reconciler::default();
        let pose = reconciler.reconcile(&mut buffer, 0.03, 0.1, 0.016).unwrap();
        assert!(!pose.teleported);
        assert_eq!(reconciler.rendered_position(), Some(pose.position));
    }

    #[test]
    fn test_teleport_snaps_and_clears() {
        let mut buffer = moving_right();
        let mut reconciler = Reconciler::default().with_initial_position(Vec2::new(100.0, 0.0));

        let pose = reconciler.reconcile(&mut buffer, 0.03, 0.1, 0.016).unwrap();
        assert!(pose.teleported);
        assert!((pose.position.x - 0.030).abs() < 1e-5);
        assert!(buffer.is_empty());
        assert_eq!(buffer.last_accepted_timestamp(), None);
        assert_eq!(reconciler.total_teleports, 1);

        // No new data: nothing to do, and certainly no second snap.
        assert!(reconciler.reconcile(&mut buffer, 0.03, 0.1, 0.016).is_none());
        assert_eq!(reconciler.total_teleports, 1);
    }

    #[test]
    fn test_teleport_skips_smoothing() {
        let mut buffer = SnapshotBuffer::default();
        buffer.ingest(1.0, Vec2::new(50.0, 0.0), Vec2::ZERO);

        let mut reconciler = Reconciler::new(5.0, 10.0).with_initial_position(Vec2::ZERO);
        let pose = reconciler.reconcile(&mut buffer, 1.0, 0.1, 0.016).unwrap();
        assert!(pose.teleported);
        assert_eq!(pose.position, Vec2::new(50.0, 0.0));

        buffer.ingest(2.0, Vec2::new(51.0, 0.0), Vec2::ZERO);
        let pose = reconciler.reconcile(&mut buffer, 2.0, 0.1, 0.016).unwrap();
        assert!(!pose.teleported);
        // Smoothing starts from the snapped point, not from the origin.
        assert!(pose.position.x > 50.0 && pose.position.x < 51.0);
    }

    #[test]
    fn test_small_moves_do_not_teleport() {
        let mut buffer = moving_right();
        let mut reconciler = Reconciler::default().with_initial_position(Vec2::new(4.9, 0.0));
        let pose = reconciler.reconcile(&mut buffer, 0.0, 0.1, 0.016).unwrap();
        assert!(!pose.teleported);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_smoother_converges() {
        let mut smoother = PositionSmoother::new(10.0);
        assert_eq!(smoother.update(Vec2::ZERO, 0.016), Vec2::ZERO);

        let target = Vec2::new(1.0, 0.0);
        let first = smoother.update(target, 0.1);
        // 1 - e^-1
        assert!((first.x - 0.632_120_6).abs() < 1e-5);

        for _ in 0..100 {
            smoother.update(target, 0.1);
        }
        assert!((smoother.current().unwrap().x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_smoother_disabled_passes_through() {
        let mut smoother = PositionSmoother::new(0.0);
        assert!(!smoother.is_enabled());
        smoother.update(Vec2::ZERO, 0.016);
        assert_eq!(smoother.update(Vec2::new(3.0, 4.0), 0.016), Vec2::new(3.0, 4.0));
    }
}
