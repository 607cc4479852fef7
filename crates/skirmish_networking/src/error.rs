//! # Networking Error Types
//!
//! Only configuration problems are fatal. Everything that can go wrong per
//! frame or per packet (stale snapshots, running dry, throttled sends,
//! failing handlers) degrades gracefully and is reported through outcome
//! values, counters and logs instead.

use skirmish_shared::EventKind;
use thiserror::Error;

/// Errors that can occur while configuring or decoding network traffic.
#[derive(Error, Debug)]
pub enum NetError {
    /// Delay bounds are inverted or non-positive.
    #[error("invalid delay bounds: min {min}s, max {max}s")]
    InvalidDelayBounds {
        /// Configured minimum delay.
        min: f64,
        /// Configured maximum delay.
        max: f64,
    },

    /// A tuning value is out of range.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// The same event kind appears twice in the descriptor table.
    #[error("duplicate descriptor for event kind {0}")]
    DuplicateDescriptor(EventKind),

    /// The same event kind appears twice in the throttle table.
    #[error("duplicate throttle entry for event kind {0}")]
    DuplicateThrottle(EventKind),

    /// A configuration file names an event kind that does not exist.
    #[error("unknown event kind name: {0}")]
    UnknownEventName(String),

    /// A frame carried a code outside the event table.
    #[error("unknown event kind code: {0}")]
    UnknownEventKind(u8),

    /// A frame's code disagrees with the payload it carries.
    #[error("frame code {code} does not match payload kind {payload}")]
    KindMismatch {
        /// Code the frame was sent under.
        code: u8,
        /// Kind of the decoded payload.
        payload: EventKind,
    },

    /// Envelope could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// Configuration file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The transport refused a frame.
    #[error("transport rejected frame: {0}")]
    Transport(String),
}

/// Result type for networking operations.
pub type NetResult<T> = Result<T, NetError>;
