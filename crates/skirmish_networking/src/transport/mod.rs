//! # Transport Boundary
//!
//! The wire itself is somebody else's problem. The event bus hands the
//! transport a fully routed [`OutboundFrame`] and expects per-channel
//! reliable or unreliable delivery; receivers feed frames back in through
//! [`EventBus::on_receive`](crate::events::EventBus::on_receive).
//!
//! [`LoopbackTransport`] keeps frames in memory for tests, benches and the
//! simulation binary.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use skirmish_shared::{ReceiverGroup, DEFAULT_CHANNEL_COUNT};

use crate::error::{NetError, NetResult};

/// Delivery options chosen by the channel router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendOptions {
    /// Must arrive, in order.
    pub reliable: bool,
    /// Transport lane.
    pub channel: u8,
}

/// One encoded event ready for the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Event code.
    pub code: u8,
    /// Encoded envelope (payload plus send timestamp).
    pub bytes: Vec<u8>,
    /// Who receives it.
    pub receivers: ReceiverGroup,
    /// Lane and reliability.
    pub options: SendOptions,
}

/// Per-channel datagram transport.
pub trait Transport: Send + Sync {
    /// Number of lanes this transport was configured with.
    fn channel_count(&self) -> u8;

    /// Hands a frame to the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be queued.
    fn send(&self, frame: OutboundFrame) -> NetResult<()>;
}

/// In-memory transport. Everything sent can be read back in order.
#[derive(Debug)]
pub struct LoopbackTransport {
    channel_count: u8,
    tx: Sender<OutboundFrame>,
    rx: Receiver<OutboundFrame>,
}

impl LoopbackTransport {
    /// Default number of frames held before sends fail.
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Creates a loopback with `channel_count` lanes holding up to `capacity` frames.
    #[must_use]
    pub fn new(channel_count: u8, capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self { channel_count, tx, rx }
    }

    /// Next frame, oldest first.
    #[must_use]
    pub fn try_recv(&self) -> Option<OutboundFrame> {
        self.rx.try_recv().ok()
    }

    /// Every pending frame, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<OutboundFrame> {
        self.rx.try_iter().collect()
    }

    /// Frames waiting to be read.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_COUNT, Self::DEFAULT_CAPACITY)
    }
}

impl Transport for LoopbackTransport {
    fn channel_count(&self) -> u8 {
        self.channel_count
    }

    fn send(&self, frame: OutboundFrame) -> NetResult<()> {
        self.tx.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => NetError::Transport("loopback queue full".into()),
            TrySendError::Disconnected(_) => NetError::Transport("loopback closed".into()),
        })
    }
}
