//! Per-entity synchronization state.
//!
//! One [`EntitySync`] exists per remote entity for as long as the session
//! tracks it. It owns the entity's snapshot buffer, jitter estimate, delay
//! controller and reconciler, and keeps diagnostics about how frames were
//! resolved.

use skirmish_shared::ReplicationMessage;

use crate::config::SyncConfig;
use crate::delay::AdaptiveDelayController;
use crate::interpolation::{ReconcileMode, Reconciler, RenderPose};
use crate::snapshot::{IngestOutcome, JitterEstimator, Snapshot, SnapshotBuffer};

/// Identifier of a replicated entity (network view id).
pub type EntityId = u32;

/// How frames and arrivals were handled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SyncStats {
    /// Frames resolved by interpolation.
    pub interpolated: u64,
    /// Frames resolved by extrapolation.
    pub extrapolated: u64,
    /// Frames held on the oldest snapshot.
    pub held: u64,
    /// Snapshots dropped as stale or duplicate.
    pub out_of_order: u64,
    /// Snapshots accepted.
    pub accepted: u64,
    /// Snaps performed.
    pub teleports: u64,
    /// Sum of extrapolated spans (seconds).
    pub extrapolated_sum: f64,
    /// Longest extrapolated span (seconds).
    pub extrapolated_max: f64,
}

impl SyncStats {
    /// Frames that produced a pose.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.interpolated + self.extrapolated + self.held
    }

    /// Share of frames that had to extrapolate, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn extrapolation_percent(&self) -> f64 {
        let frames = self.frames();
        if frames == 0 {
            0.0
        } else {
            self.extrapolated as f64 * 100.0 / frames as f64
        }
    }

    /// Mean extrapolated span (seconds).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_extrapolation(&self) -> f64 {
        if self.extrapolated == 0 {
            0.0
        } else {
            self.extrapolated_sum / self.extrapolated as f64
        }
    }

    fn record_mode(&mut self, mode: ReconcileMode, extrapolated: f64) {
        match mode {
            ReconcileMode::Interpolate => self.interpolated += 1,
            ReconcileMode::Hold => self.held += 1,
            ReconcileMode::Extrapolate => {
                self.extrapolated += 1;
                self.extrapolated_sum += extrapolated;
                self.extrapolated_max = self.extrapolated_max.max(extrapolated);
            }
        }
    }
}

/// Synchronization triple for one remote entity.
#[derive(Clone, Debug)]
pub struct EntitySync {
    entity_id: EntityId,
    buffer: SnapshotBuffer,
    jitter: JitterEstimator,
    delay: AdaptiveDelayController,
    reconciler: Reconciler,
    max_extrapolation: f64,
    last_pose: Option<RenderPose>,
    /// Since creation.
    totals: SyncStats,
    /// Since the last statistics line.
    window: SyncStats,
    log_stats: bool,
    log_interval: f64,
    since_log: f64,
}

impl EntitySync {
    /// Creates the triple for `entity_id`.
    #[must_use]
    pub fn new(entity_id: EntityId, config: &SyncConfig) -> Self {
        Self {
            entity_id,
            buffer: SnapshotBuffer::new(config.buffer_capacity),
            jitter: JitterEstimator::new(config.jitter_alpha),
            delay: AdaptiveDelayController::from_config(config),
            reconciler: Reconciler::from_config(config),
            max_extrapolation: config.max_extrapolation,
            last_pose: None,
            totals: SyncStats::default(),
            window: SyncStats::default(),
            log_stats: config.log_stats,
            log_interval: config.log_interval,
            since_log: 0.0,
        }
    }

    /// Stores a replication message.
    ///
    /// Accepted samples also feed the jitter estimate with the spacing to the
    /// previous accepted sample.
    pub fn ingest(&mut self, message: &ReplicationMessage) -> IngestOutcome {
        let previous = self.buffer.last_accepted_timestamp();
        let outcome = self.buffer.ingest_snapshot(Snapshot::from(message));

        match outcome {
            IngestOutcome::Accepted => {
                self.totals.accepted += 1;
                self.window.accepted += 1;
                if let Some(previous) = previous {
                    self.jitter.observe(message.server_timestamp - previous);
                }
            }
            IngestOutcome::Rejected(reason) => {
                self.totals.out_of_order += 1;
                self.window.out_of_order += 1;
                tracing::trace!(
                    "Entity {} dropped snapshot t={:.3} ({:?}, last={:?})",
                    self.entity_id,
                    message.server_timestamp,
                    reason,
                    previous
                );
            }
        }
        outcome
    }

    /// Computes this frame's pose.
    ///
    /// `clock` is the authoritative clock estimate, `rtt` the round-trip
    /// estimate and `dt` the unscaled frame time, all in seconds. Returns
    /// `None` while nothing is buffered; the caller keeps the previous pose.
    pub fn render(&mut self, clock: f64, rtt: f64, dt: f64) -> Option<RenderPose> {
        if self.buffer.is_empty() {
            return None;
        }

        let active = self
            .delay
            .update(self.jitter.mean_interval(), self.jitter.std_dev(), rtt, dt);
        let window = self.delay.dynamic_max_extrapolation(self.max_extrapolation);
        let render_time = clock - active;

        #[allow(clippy::cast_possible_truncation)]
        let pose = self
            .reconciler
            .reconcile(&mut self.buffer, render_time, window, dt as f32)?;

        self.totals.record_mode(pose.mode, pose.extrapolated);
        self.window.record_mode(pose.mode, pose.extrapolated);
        if pose.teleported {
            self.totals.teleports += 1;
            self.window.teleports += 1;
        }

        self.last_pose = Some(pose);
        self.maybe_log(rtt, dt);
        Some(pose)
    }

    fn maybe_log(&mut self, rtt: f64, dt: f64) {
        if !self.log_stats {
            return;
        }
        self.since_log += dt.max(0.0);
        if self.since_log < self.log_interval {
            return;
        }
        self.since_log = 0.0;

        let w = &self.window;
        tracing::debug!(
            "[NetStats] entity={} ping={:.0}ms | tick(mean/std)={:.1}/{:.1}ms | BUF={}/{} | \
             interp={} extrap={} hold={} ooo={} tp={} | extrap%={:.1} avg/max={:.1}/{:.1}ms | \
             buffer target/current={:.0}/{:.0}ms",
            self.entity_id,
            rtt * 1000.0,
            self.jitter.mean_interval() * 1000.0,
            self.jitter.std_dev() * 1000.0,
            self.buffer.len(),
            self.buffer.capacity(),
            w.interpolated,
            w.extrapolated,
            w.held,
            w.out_of_order,
            w.teleports,
            w.extrapolation_percent(),
            w.mean_extrapolation() * 1000.0,
            w.extrapolated_max * 1000.0,
            self.delay.target_delay() * 1000.0,
            self.delay.active_delay() * 1000.0,
        );
        self.window = SyncStats::default();
    }

    /// Entity this triple belongs to.
    #[must_use]
    pub const fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Snapshot history.
    #[must_use]
    pub const fn buffer(&self) -> &SnapshotBuffer {
        &self.buffer
    }

    /// Inter-arrival estimate.
    #[must_use]
    pub const fn jitter(&self) -> &JitterEstimator {
        &self.jitter
    }

    /// Render delay controller.
    #[must_use]
    pub const fn delay(&self) -> &AdaptiveDelayController {
        &self.delay
    }

    /// Mutable render delay controller, for tools that pin the delay.
    pub fn delay_mut(&mut self) -> &mut AdaptiveDelayController {
        &mut self.delay
    }

    /// Render-time state.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Last pose produced, if any.
    #[must_use]
    pub const fn last_pose(&self) -> Option<RenderPose> {
        self.last_pose
    }

    /// Counters since creation.
    #[must_use]
    pub const fn stats(&self) -> &SyncStats {
        &self.totals
    }
}
