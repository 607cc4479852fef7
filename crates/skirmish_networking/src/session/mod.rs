//! # Sync Session
//!
//! Owns the synchronization triple of every remote entity for the lifetime
//! of a network session.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────┐   ReplicationSender    ┌─────────────────────────┐
//! │ Network receive    │ ─────(bounded inbox)──▶│ SyncSession             │
//! │ (any thread)       │                        │                         │
//! └────────────────────┘                        │  drain_inbox()  ◀─ tick │
//!                                               │  render_frame() ◀─ tick │
//!                                               │                         │
//!                                               │  id → EntitySync        │
//!                                               └─────────────────────────┘
//! ```
//!
//! Arrivals never touch a buffer directly. They are queued and applied at
//! the next tick boundary, so the render path never races the receive path
//! and each buffer has exactly one writer and one reader.

mod entity;
mod publisher;

pub use entity::{EntityId, EntitySync, SyncStats};
pub use publisher::ReplicationPublisher;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use skirmish_shared::{ReplicationMessage, ReplicationPacket};

use crate::config::SyncConfig;
use crate::error::NetResult;
use crate::interpolation::RenderPose;
use crate::snapshot::IngestOutcome;

/// A replication message waiting for the next tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InboundReplication {
    /// Target entity.
    pub entity_id: EntityId,
    /// Sample.
    pub message: ReplicationMessage,
}

/// Cloneable handle the network receive path uses to queue arrivals.
#[derive(Clone, Debug)]
pub struct ReplicationSender {
    tx: Sender<InboundReplication>,
    dropped: Arc<AtomicU64>,
}

impl ReplicationSender {
    /// Queues a message. Returns `false` if the inbox is full or closed.
    pub fn send(&self, entity_id: EntityId, message: ReplicationMessage) -> bool {
        match self.tx.try_send(InboundReplication { entity_id, message }) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Decodes a wire packet and queues it. Returns `false` if the bytes are
    /// not a packet or the inbox is full.
    pub fn send_packet(&self, bytes: &[u8]) -> bool {
        let Some(packet) = ReplicationPacket::from_bytes(bytes) else {
            tracing::trace!("Dropped malformed replication packet ({} bytes)", bytes.len());
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        self.send(packet.entity_id, packet.message())
    }
}

/// What one inbox drain did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages stored.
    pub accepted: u32,
    /// Messages rejected as stale or duplicate.
    pub rejected: u32,
    /// Messages for entities the session does not track.
    pub unknown_entity: u32,
}

/// Session-wide owner of every remote entity's synchronization state.
pub struct SyncSession {
    config: SyncConfig,
    entities: BTreeMap<EntityId, EntitySync>,
    inbox_tx: Sender<InboundReplication>,
    inbox_rx: Receiver<InboundReplication>,
    dropped: Arc<AtomicU64>,
}

impl SyncSession {
    /// Creates a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: SyncConfig) -> NetResult<Self> {
        config.validate()?;
        let (inbox_tx, inbox_rx) = bounded(config.inbox_capacity);
        Ok(Self {
            config,
            entities: BTreeMap::new(),
            inbox_tx,
            inbox_rx,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Handle for queuing arrivals from the network receive path.
    #[must_use]
    pub fn sender(&self) -> ReplicationSender {
        ReplicationSender {
            tx: self.inbox_tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Starts tracking `entity_id`. Returns `false` if it was already tracked.
    pub fn create_sync(&mut self, entity_id: EntityId) -> bool {
        if self.entities.contains_key(&entity_id) {
            return false;
        }
        self.entities.insert(entity_id, EntitySync::new(entity_id, &self.config));
        tracing::info!("Sync attached: entity {}", entity_id);
        true
    }

    /// Stops tracking `entity_id` and drops its state. Returns `false` if it
    /// was not tracked.
    pub fn destroy_sync(&mut self, entity_id: EntityId) -> bool {
        let removed = self.entities.remove(&entity_id);
        if let Some(sync) = &removed {
            let stats = sync.stats();
            tracing::info!(
                "Sync detached: entity {} (accepted={}, ooo={}, teleports={})",
                entity_id,
                stats.accepted,
                stats.out_of_order,
                stats.teleports
            );
        }
        removed.is_some()
    }

    /// Applies every queued arrival. Call once per tick, before rendering.
    pub fn drain_inbox(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        while let Ok(inbound) = self.inbox_rx.try_recv() {
            match self.ingest(inbound.entity_id, &inbound.message) {
                Some(IngestOutcome::Accepted) => report.accepted += 1,
                Some(IngestOutcome::Rejected(_)) => report.rejected += 1,
                None => report.unknown_entity += 1,
            }
        }
        report
    }

    /// Applies one arrival immediately. Only for single-threaded loops that
    /// already run at the tick boundary.
    ///
    /// Returns `None` if the entity is not tracked.
    pub fn ingest(&mut self, entity_id: EntityId, message: &ReplicationMessage) -> Option<IngestOutcome> {
        let Some(sync) = self.entities.get_mut(&entity_id) else {
            tracing::trace!("Replication for untracked entity {} dropped", entity_id);
            return None;
        };
        Some(sync.ingest(message))
    }

    /// Computes one entity's pose for this frame.
    pub fn render(&mut self, entity_id: EntityId, clock: f64, rtt: f64, dt: f64) -> Option<RenderPose> {
        self.entities.get_mut(&entity_id)?.render(clock, rtt, dt)
    }

    /// Computes every entity's pose for this frame. Entities with nothing
    /// buffered are skipped; they keep their previous pose.
    pub fn render_frame(&mut self, clock: f64, rtt: f64, dt: f64, mut apply: impl FnMut(EntityId, &RenderPose)) {
        for (&id, sync) in &mut self.entities {
            if let Some(pose) = sync.render(clock, rtt, dt) {
                apply(id, &pose);
            }
        }
    }

    /// Drains the inbox then renders every entity.
    pub fn tick(&mut self, clock: f64, rtt: f64, dt: f64, apply: impl FnMut(EntityId, &RenderPose)) -> DrainReport {
        let report = self.drain_inbox();
        self.render_frame(clock, rtt, dt, apply);
        report
    }

    /// State of one entity.
    #[must_use]
    pub fn entity(&self, entity_id: EntityId) -> Option<&EntitySync> {
        self.entities.get(&entity_id)
    }

    /// Mutable state of one entity.
    pub fn entity_mut(&mut self, entity_id: EntityId) -> Option<&mut EntitySync> {
        self.entities.get_mut(&entity_id)
    }

    /// True if `entity_id` is tracked.
    #[must_use]
    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.entities.contains_key(&entity_id)
    }

    /// Tracked entity ids, ascending.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entity is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Arrivals lost because the inbox was full or the packet malformed.
    #[must_use]
    pub fn dropped_arrivals(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Configuration every new entity is created with.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_shared::Vec2;

    fn msg(t: f64) -> ReplicationMessage {
        ReplicationMessage::new(Vec2::ZERO, Vec2::ZERO, false, t)
    }

    #[test]
    fn test_create_and_destroy() {
        let mut session = SyncSession::new(SyncConfig::default()).unwrap();
        assert!(session.create_sync(7));
        assert!(!session.create_sync(7));
        assert!(session.contains(7));
        assert_eq!(session.len(), 1);

        assert!(session.destroy_sync(7));
        assert!(!session.destroy_sync(7));
        assert!(session.is_empty());
    }

    #[test]
    fn test_arrivals_wait_for_drain() {
        let mut session = SyncSession::new(SyncConfig::default()).unwrap();
        session.create_sync(1);
        let sender = session.sender();

        assert!(sender.send(1, msg(1.0)));
        assert!(sender.send(1, msg(0.5)));
        assert!(sender.send(2, msg(1.0)));
        assert!(session.entity(1).unwrap().buffer().is_empty());

        let report = session.drain_inbox();
        assert_eq!(
            report,
            DrainReport {
                accepted: 1,
                rejected: 1,
                unknown_entity: 1
            }
        );
        assert_eq!(session.entity(1).unwrap().buffer().len(), 1);
    }

    #[test]
    fn test_full_inbox_drops() {
        let config = SyncConfig {
            inbox_capacity: 2,
            ..SyncConfig::default()
        };
        let session = SyncSession::new(config).unwrap();
        let sender = session.sender();

        assert!(sender.send(1, msg(1.0)));
        assert!(sender.send(1, msg(2.0)));
        assert!(!sender.send(1, msg(3.0)));
        assert_eq!(session.dropped_arrivals(), 1);
    }

    #[test]
    fn test_send_packet() {
        let mut session = SyncSession::new(SyncConfig::default()).unwrap();
        session.create_sync(9);
        let sender = session.sender();

        let packet = ReplicationPacket::new(9, &ReplicationMessage::new(Vec2::X, Vec2::ZERO, true, 4.0));
        assert!(sender.send_packet(packet.as_bytes()));
        assert!(!sender.send_packet(&[1, 2, 3]));

        session.drain_inbox();
        let latest = *session.entity(9).unwrap().buffer().latest().unwrap();
        assert_eq!(latest.position, Vec2::X);
        assert!(latest.grounded);
        assert_eq!(session.dropped_arrivals(), 1);
    }

    #[test]
    fn test_tick_renders_tracked_entities() {
        let mut session = SyncSession::new(SyncConfig::default()).unwrap();
        session.create_sync(1);
        session.create_sync(2);
        let sender = session.sender();
        sender.send(1, msg(1.0));

        let mut rendered = Vec::new();
        session.tick(1.0, 0.0, 0.016, |id, pose| rendered.push((id, *pose)));

        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].0, 1);
    }

    #[test]
    fn test_nan_round_trip_estimate_recovers() {
        let mut session = SyncSession::new(SyncConfig::default()).unwrap();
        session.create_sync(1);
        for i in 0..8u8 {
            let t = f64::from(i) / 30.0;
            let message = ReplicationMessage::new(Vec2::new(f32::from(i), 0.0), Vec2::X, true, t);
            session.ingest(1, &message);
        }

        let pose = session.render(1, 0.21, f64::NAN, 0.016).unwrap();
        assert!(pose.position.x.is_finite());

        for frame in 1..600u32 {
            let clock = 0.21 + f64::from(frame) / 60.0;
            session.render(1, clock, 0.05, 1.0 / 60.0);
        }
        let last = session.render(1, 10.21, 0.05, 1.0 / 60.0).unwrap();
        let delay = session.entity(1).unwrap().delay().active_delay();
        assert!(delay.is_finite());
        assert!(last.position.x.is_finite() && last.position.y.is_finite());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SyncConfig {
            buffer_capacity: 0,
            ..SyncConfig::default()
        };
        assert!(SyncSession::new(config).is_err());
    }
}
