//! # Skirmish Shared
//!
//! Common types used by the authoritative sender and every observer.
//!
//! ## CRITICAL RULE
//!
//! This crate is plain data. It must NEVER depend on:
//! - sockets or any transport
//! - clocks or timers
//! - logging backends
//!
//! Anything with behaviour over time lives in `skirmish_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod math;
pub mod protocol;

pub use constants::{DEFAULT_CHANNEL_COUNT, PUBLISH_RATE_HZ, PUBLISH_INTERVAL};
pub use events::{EventKind, EventPayload, ReceiverGroup};
pub use math::Vec2;
pub use protocol::{ReplicationMessage, ReplicationPacket, REPLICATION_PACKET_SIZE};
