//! # Snapshot System
//!
//! Per-entity history of authoritative samples, consumed by the reconciler.
//!
//! ## Ordering
//!
//! The buffer only ever grows at the newest end. A sample whose timestamp is
//! not strictly newer than the last accepted one is dropped, never reordered
//! in place: once a newer sample exists, older data is worthless.
//!
//! ```text
//! Arrivals:      t=1   t=2   t=4   t=3 (late)   t=5
//!                 │     │     │     ✗            │
//! Buffer:        [1]   [1,2] [1,2,4]            [1,2,4,5]
//! ```

pub mod jitter;

pub use jitter::{JitterEstimator, JitterStats};

use std::collections::VecDeque;

use skirmish_shared::{ReplicationMessage, Vec2};

/// One timestamped authoritative state sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Authoritative clock time (seconds).
    pub timestamp: f64,
    /// Position.
    pub position: Vec2,
    /// Velocity.
    pub velocity: Vec2,
    /// Grounded flag at sample time.
    pub grounded: bool,
}

impl Snapshot {
    /// Creates a new snapshot.
    #[must_use]
    pub const fn new(timestamp: f64, position: Vec2, velocity: Vec2) -> Self {
        Self {
            timestamp,
            position,
            velocity,
            grounded: false,
        }
    }
}

impl From<&ReplicationMessage> for Snapshot {
    fn from(msg: &ReplicationMessage) -> Self {
        Self {
            timestamp: msg.server_timestamp,
            position: msg.position,
            velocity: msg.velocity,
            grounded: msg.grounded,
        }
    }
}

/// Why an ingest was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Timestamp not newer than the last accepted one.
    OutOfOrder,
}

/// Result of offering a sample to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Sample appended.
    Accepted,
    /// Sample dropped.
    Rejected(RejectReason),
}

impl IngestOutcome {
    /// True if the sample was stored.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Capacity-bounded, strictly time-ordered snapshot history.
#[derive(Clone, Debug)]
pub struct SnapshotBuffer {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
    last_accepted: Option<f64>,
}

impl SnapshotBuffer {
    /// Default number of snapshots kept.
    pub const DEFAULT_CAPACITY: usize = 24;

    /// Creates an empty buffer. A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshots: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_accepted: None,
        }
    }

    /// Offers a sample.
    ///
    /// Rejected without side effects if `timestamp` is not strictly newer
    /// than the last accepted one. On acceptance the oldest entry is evicted
    /// once capacity is exceeded.
    pub fn ingest(&mut self, timestamp: f64, position: Vec2, velocity: Vec2) -> IngestOutcome {
        self.ingest_snapshot(Snapshot::new(timestamp, position, velocity))
    }

    /// Offers a full snapshot (see [`Self::ingest`]).
    pub fn ingest_snapshot(&mut self, snapshot: Snapshot) -> IngestOutcome {
        // NaN compares false against everything, so test for "newer" rather than "stale".
        let newer = match self.last_accepted {
            Some(last) => snapshot.timestamp > last,
            None => !snapshot.timestamp.is_nan(),
        };
        if !newer {
            return IngestOutcome::Rejected(RejectReason::OutOfOrder);
        }

        self.snapshots.push_back(snapshot);
        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.last_accepted = Some(snapshot.timestamp);
        IngestOutcome::Accepted
    }

    /// Oldest stored snapshot.
    #[must_use]
    pub fn first(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    /// Newest stored snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Snapshot at `index`, oldest first.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot> + ExactSizeIterator {
        self.snapshots.iter()
    }

    /// Timestamp of the last accepted sample, if any since the last reset.
    #[must_use]
    pub const fn last_accepted_timestamp(&self) -> Option<f64> {
        self.last_accepted
    }

    /// Returns the number of buffered snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// True if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Maximum number of snapshots kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clears all snapshots and forgets the arrival ordering, so the next
    /// sample is accepted whatever its timestamp.
    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.last_accepted = None;
    }
}

impl Default for SnapshotBuffer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(t: f64) -> (f64, Vec2, Vec2) {
        (t, Vec2::new(t as f32, 0.0), Vec2::X)
    }

    #[test]
    fn test_snapshot_buffer() {
        let mut buffer = SnapshotBuffer::new(4);

        for i in 1..=5 {
            let (t, p, v) = at(f64::from(i));
            assert_eq!(buffer.ingest(t, p, v), IngestOutcome::Accepted);
        }

        // Should have 4 snapshots (buffer size)
        assert_eq!(buffer.len(), 4);

        // Latest should be t=5, oldest t=2 (t=1 evicted)
        assert_eq!(buffer.latest().unwrap().timestamp, 5.0);
        assert_eq!(buffer.first().unwrap().timestamp, 2.0);
    }

    #[test]
    fn test_stale_and_duplicate_rejected() {
        let mut buffer = SnapshotBuffer::default();
        let (t, p, v) = at(1.0);
        assert!(buffer.ingest(t, p, v).is_accepted());

        let stale = buffer.ingest(0.5, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(stale, IngestOutcome::Rejected(RejectReason::OutOfOrder));

        let dup = buffer.ingest(1.0, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(dup, IngestOutcome::Rejected(RejectReason::OutOfOrder));

        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.last_accepted_timestamp(), Some(1.0));
    }

    #[test]
    fn test_nan_timestamp_rejected() {
        let mut buffer = SnapshotBuffer::default();
        assert!(!buffer.ingest(f64::NAN, Vec2::ZERO, Vec2::ZERO).is_accepted());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reset_forgets_ordering() {
        let mut buffer = SnapshotBuffer::default();
        let (t, p, v) = at(10.0);
        buffer.ingest(t, p, v);
        buffer.reset();

        assert!(buffer.is_empty());
        assert_eq!(buffer.last_accepted_timestamp(), None);
        assert!(buffer.ingest(1.0, Vec2::ZERO, Vec2::ZERO).is_accepted());
    }

    #[test]
    fn test_zero_capacity_raised() {
        let mut buffer = SnapshotBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.ingest(1.0, Vec2::ZERO, Vec2::ZERO);
        buffer.ingest(2.0, Vec2::ZERO, Vec2::ZERO);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest().unwrap().timestamp, 2.0);
    }

    #[test]
    fn test_from_replication_message() {
        let msg = ReplicationMessage::new(Vec2::new(1.0, 2.0), Vec2::Y, true, 3.5);
        let snap = Snapshot::from(&msg);
        assert_eq!(snap.timestamp, 3.5);
        assert_eq!(snap.position, Vec2::new(1.0, 2.0));
        assert!(snap.grounded);
    }
}
