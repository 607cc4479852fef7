//! # Event Multiplexing
//!
//! Discrete gameplay events, decoupled from per-frame replication:
//!
//! - [`channel`]: which lane and reliability each kind uses
//! - [`throttle`]: per-kind minimum resend interval
//! - [`codec`]: envelope wire format
//! - [`bus`]: send path and handler dispatch

pub mod bus;
pub mod channel;
pub mod codec;
pub mod throttle;

pub use bus::{
    DispatchReport, EventBus, HandlerId, HandlerResult, LatencyStats, ReceivedEvent, SendOutcome, SendStats,
};
pub use channel::{ChannelRouter, EventDescriptor, Route, DEFAULT_DESCRIPTORS};
pub use codec::EventEnvelope;
pub use throttle::{RateThrottle, ThrottleEntry, DEFAULT_THROTTLES};
