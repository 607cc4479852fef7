//! Replication protocol types shared between sender and receiver.
//!
//! The authoritative owner of an entity publishes a [`ReplicationMessage`]
//! at a fixed rate. On the wire it travels as a fixed-size
//! [`ReplicationPacket`] that can be cast straight from the datagram bytes.

use crate::math::Vec2;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Size of one replication packet on the wire (bytes)
pub const REPLICATION_PACKET_SIZE: usize = std::mem::size_of::<ReplicationPacket>();

/// Flag bit: entity was standing on ground when sampled
const FLAG_GROUNDED: u32 = 1;

/// One authoritative state sample for a replicated entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicationMessage {
    /// World position
    pub position: Vec2,
    /// Linear velocity (units per second)
    pub velocity: Vec2,
    /// Whether the entity was grounded
    pub grounded: bool,
    /// Authoritative clock time the sample was taken at (seconds)
    pub server_timestamp: f64,
}

impl ReplicationMessage {
    /// Creates a new message
    #[must_use]
    pub const fn new(position: Vec2, velocity: Vec2, grounded: bool, server_timestamp: f64) -> Self {
        Self {
            position,
            velocity,
            grounded,
            server_timestamp,
        }
    }
}

/// Wire layout of a replication message, addressed to one entity.
///
/// ```text
/// 0        8        16       24   28   32
/// | stamp  | pos    | vel    | id | fl |
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ReplicationPacket {
    /// Authoritative timestamp (seconds)
    pub server_timestamp: f64,
    /// Position
    pub position: Vec2,
    /// Velocity
    pub velocity: Vec2,
    /// Entity the sample belongs to
    pub entity_id: u32,
    /// Flags (grounded)
    pub flags: u32,
}

impl ReplicationPacket {
    /// Packs a message for the given entity
    #[must_use]
    pub fn new(entity_id: u32, message: &ReplicationMessage) -> Self {
        Self {
            server_timestamp: message.server_timestamp,
            position: message.position,
            velocity: message.velocity,
            entity_id,
            flags: if message.grounded { FLAG_GROUNDED } else { 0 },
        }
    }

    /// Unpacks the message carried by this packet
    #[must_use]
    pub fn message(&self) -> ReplicationMessage {
        ReplicationMessage {
            position: self.position,
            velocity: self.velocity,
            grounded: self.flags & FLAG_GROUNDED != 0,
            server_timestamp: self.server_timestamp,
        }
    }

    /// Raw bytes of this packet
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    /// Reads a packet from raw bytes.
    ///
    /// Returns `None` if the slice is not exactly one packet long.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != REPLICATION_PACKET_SIZE {
            return None;
        }
        bytemuck::try_pod_read_unaligned(bytes).ok()
    }
}
