//! # Skirmish Networking
//!
//! Network-synchronization core for remote entities and gameplay events.
//!
//! ## Remote entities
//!
//! ```text
//! network receive ──► ReplicationSender ──► inbox (bounded)
//!                                             │ drained at tick boundary
//!                                             ▼
//!                        ┌─────────── EntitySync (one per entity) ───────────┐
//!                        │ SnapshotBuffer ─► JitterEstimator                 │
//!                        │       │                 │ mean / std              │
//!                        │       │                 ▼                         │
//!                        │       │      AdaptiveDelayController ◄── rtt      │
//!                        │       │                 │ active delay            │
//!                        │       ▼                 ▼                         │
//!                        │  Reconciler: hold / interpolate / extrapolate     │
//!                        │              teleport snap, optional smoothing    │
//!                        └───────────────────────┬───────────────────────────┘
//!                                                ▼
//!                                           RenderPose
//! ```
//!
//! The render time is `clock - active_delay`. The delay rises quickly when
//! arrivals get late and decays slowly once they recover.
//!
//! ## Gameplay events
//!
//! ```text
//! send ──► RateThrottle ──► ChannelRouter ──► envelope + timestamp ──► Transport
//! receive ──► decode ──► latency ──► every handler for the kind (failures isolated)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use skirmish_networking::{SyncConfig, SyncSession};
//!
//! let mut session = SyncSession::new(SyncConfig::default())?;
//! session.create_sync(7);
//! let sender = session.sender(); // hand to the receive thread
//!
//! // every render frame
//! session.tick(clock, rtt, dt, |entity, pose| draw(entity, pose.position));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod config;
pub mod delay;
pub mod error;
pub mod events;
pub mod interpolation;
pub mod session;
pub mod simulation;
pub mod snapshot;
pub mod transport;

// Re-exports for convenience
pub use clock::{ManualClock, NetClock, SystemClock};
pub use config::{EventConfig, NetConfig, SyncConfig};
pub use delay::{AdaptiveDelayController, DelayState};
pub use error::{NetError, NetResult};
pub use events::{
    ChannelRouter, DispatchReport, EventBus, EventEnvelope, RateThrottle, ReceivedEvent, Route, SendOutcome,
};
pub use interpolation::{PositionSmoother, ReconcileMode, Reconciler, RenderPose};
pub use session::{EntityId, EntitySync, ReplicationPublisher, ReplicationSender, SyncSession, SyncStats};
pub use simulation::{NetworkConditions, PacingStats, ReplicationSimulation, SimulationConfig, SimulationStats};
pub use snapshot::{IngestOutcome, JitterEstimator, JitterStats, Snapshot, SnapshotBuffer};
pub use transport::{LoopbackTransport, OutboundFrame, SendOptions, Transport};
