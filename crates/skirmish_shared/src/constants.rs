//! # Network Constants
//!
//! Values both peers must agree on.
//!
//! **CRITICAL:** These values are baked into every client binary.
//! Changes require a client rebuild.

// =============================================================================
// REPLICATION
// =============================================================================

/// Rate at which an authoritative sender publishes entity state (Hz)
pub const PUBLISH_RATE_HZ: u32 = 30;

/// Nominal spacing between replication messages (seconds)
pub const PUBLISH_INTERVAL: f64 = 1.0 / PUBLISH_RATE_HZ as f64;

// =============================================================================
// EVENT TRANSPORT
// =============================================================================

/// Number of independent transport channels events are spread across
pub const DEFAULT_CHANNEL_COUNT: u8 = 4;

/// Channel that unclassified event kinds fall back to
pub const DEFAULT_CHANNEL: u8 = 0;
