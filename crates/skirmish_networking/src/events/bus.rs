//! # Event Bus
//!
//! Process-wide send and dispatch point for discrete gameplay events.
//!
//! ```text
//! send(payload, receivers)
//!   -> RateThrottle   (too soon? drop, no retry)
//!   -> ChannelRouter  (reliable?, channel)
//!   -> EventEnvelope  { payload, sent_timestamp }
//!   -> Transport
//!
//! on_receive(code, bytes)
//!   -> EventEnvelope::decode
//!   -> latency = now - sent_timestamp
//!   -> snapshot handlers for kind, invoke each
//! ```
//!
//! Handlers are copied out of the registry before any of them runs, so a
//! handler may register or unregister handlers (its own included) without
//! disturbing the dispatch in progress.

use std::collections::HashMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use skirmish_shared::{EventKind, EventPayload, ReceiverGroup};

use super::channel::{ChannelRouter, Route};
use super::codec::EventEnvelope;
use super::throttle::RateThrottle;
use crate::clock::NetClock;
use crate::config::EventConfig;
use crate::error::NetResult;
use crate::transport::{OutboundFrame, SendOptions, Transport};

/// What a handler reports back.
pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Registration handle, unique per bus.
pub type HandlerId = u64;

type Handler = Arc<dyn Fn(&ReceivedEvent) -> HandlerResult + Send + Sync>;

/// A decoded event as seen by handlers.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Typed payload.
    pub payload: EventPayload,
    /// Authoritative time the sender stamped.
    pub sent_timestamp: f64,
    /// Authoritative time on receipt.
    pub received_timestamp: f64,
}

impl ReceivedEvent {
    /// One-way latency (seconds).
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.received_timestamp - self.sent_timestamp
    }
}

/// Result of [`EventBus::send`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the transport.
    Sent(SendOptions),
    /// Dropped by the rate throttle.
    Throttled,
    /// Encoding or transport failure, already logged.
    Failed,
}

impl SendOutcome {
    /// True if the event reached the transport.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

/// Result of one dispatch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that returned `Ok`.
    pub invoked: usize,
    /// Handlers that returned an error.
    pub failed: usize,
}

/// One-way latency over every dispatched event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatencyStats {
    /// Events measured.
    pub samples: u64,
    /// Mean latency (seconds).
    pub mean: f64,
    /// Worst latency (seconds).
    pub max: f64,
    /// Latency of the most recent event (seconds).
    pub last: f64,
}

impl LatencyStats {
    fn record(&mut self, latency: f64) {
        self.samples += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = self.samples as f64;
        self.mean += (latency - self.mean) / n;
        self.max = if self.samples == 1 { latency } else { self.max.max(latency) };
        self.last = latency;
    }
}

/// Counters for the send side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SendStats {
    /// Events handed to the transport.
    pub sent: u64,
    /// Events dropped by the throttle.
    pub throttled: u64,
    /// Events lost to encoding or transport errors.
    pub failed: u64,
}

/// Event router, throttle and handler registry.
pub struct EventBus {
    router: ChannelRouter,
    throttle: Mutex<RateThrottle>,
    handlers: RwLock<HashMap<EventKind, Vec<(HandlerId, Handler)>>>,
    next_id: AtomicU64,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn NetClock>,
    latency: Mutex<LatencyStats>,
    send_stats: Mutex<SendStats>,
    sent_by_kind: Mutex<HashMap<EventKind, u64>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channel_count", &self.router.channel_count())
            .field("handlers", &self.handler_total())
            .field("latency", &self.latency_stats())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Builds a bus over the default descriptor and throttle tables.
    ///
    /// The router uses the smaller of the configured and transport channel
    /// counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &EventConfig, transport: Arc<dyn Transport>, clock: Arc<dyn NetClock>) -> NetResult<Self> {
        config.validate()?;
        let channel_count = config.channel_count.min(transport.channel_count());
        let router = ChannelRouter::with_defaults(channel_count)?;
        let throttle = RateThrottle::with_overrides(&config.resolved_overrides()?)?;
        Ok(Self::from_parts(router, throttle, transport, clock))
    }

    /// Builds a bus from an explicit router and throttle.
    #[must_use]
    pub fn from_parts(
        router: ChannelRouter,
        throttle: RateThrottle,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn NetClock>,
    ) -> Self {
        tracing::info!(
            "Event bus ready: {} channels, {} throttled kinds",
            router.channel_count(),
            throttle.len()
        );
        Self {
            router,
            throttle: Mutex::new(throttle),
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            transport,
            clock,
            latency: Mutex::new(LatencyStats::default()),
            send_stats: Mutex::new(SendStats::default()),
            sent_by_kind: Mutex::new(HashMap::new()),
        }
    }

    /// Sends an event. Throttled sends are dropped, never queued.
    pub fn send(&self, payload: EventPayload, receivers: ReceiverGroup) -> SendOutcome {
        let kind = payload.kind();

        if !self.throttle.lock().should_send(kind, self.clock.local_time_ms()) {
            tracing::trace!("Throttled {kind}");
            self.send_stats.lock().throttled += 1;
            return SendOutcome::Throttled;
        }

        let Route { reliable, channel } = self.router.classify(kind);
        let options = SendOptions { reliable, channel };
        let envelope = EventEnvelope::new(payload, self.clock.network_time());

        let result = envelope.encode().and_then(|bytes| {
            self.transport.send(OutboundFrame {
                code: kind.code(),
                bytes,
                receivers,
                options,
            })
        });

        match result {
            Ok(()) => {
                self.send_stats.lock().sent += 1;
                *self.sent_by_kind.lock().entry(kind).or_insert(0) += 1;
                SendOutcome::Sent(options)
            }
            Err(e) => {
                tracing::warn!("Failed to send {kind}: {e}");
                self.send_stats.lock().failed += 1;
                SendOutcome::Failed
            }
        }
    }

    /// Decodes a received frame and dispatches it.
    ///
    /// Frames that fail to decode are logged and dropped.
    pub fn on_receive(&self, code: u8, bytes: &[u8]) -> DispatchReport {
        match EventEnvelope::decode(code, bytes) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => {
                tracing::warn!("Dropping event frame (code {code}): {e}");
                DispatchReport::default()
            }
        }
    }

    /// Dispatches an already decoded envelope to every handler for its kind.
    pub fn dispatch(&self, envelope: EventEnvelope) -> DispatchReport {
        let kind = envelope.kind();
        let event = ReceivedEvent {
            kind,
            payload: envelope.payload,
            sent_timestamp: envelope.sent_timestamp,
            received_timestamp: self.clock.network_time(),
        };
        self.latency.lock().record(event.latency());

        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&kind)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        let mut report = DispatchReport::default();
        for handler in handlers {
            match handler(&event) {
                Ok(()) => report.invoked += 1,
                Err(e) => {
                    tracing::warn!("Handler for {kind} failed: {e}");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Registers a handler for `kind`.
    ///
    /// Handlers report failure by returning `Err`; the bus logs it and moves
    /// on to the next handler. A handler must not panic: a panic unwinds
    /// through `dispatch` and skips the handlers after it.
    pub fn register<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&ReceivedEvent) -> HandlerResult + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.write().entry(kind).or_default().push((id, Arc::new(handler)));
        tracing::debug!("Registered handler {id} for {kind}");
        id
    }

    /// Removes a handler. Returns `false` if it was not registered for `kind`.
    pub fn unregister(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&kind);
        }
        removed
    }

    /// Removes every handler.
    pub fn clear(&self) {
        self.handlers.write().clear();
    }

    /// Handlers registered for `kind`.
    #[must_use]
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    fn handler_total(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }

    /// Latency over every dispatched event.
    #[must_use]
    pub fn latency_stats(&self) -> LatencyStats {
        *self.latency.lock()
    }

    /// Send-side counters.
    #[must_use]
    pub fn send_stats(&self) -> SendStats {
        *self.send_stats.lock()
    }

    /// Events of `kind` handed to the transport.
    #[must_use]
    pub fn sent_count(&self, kind: EventKind) -> u64 {
        self.sent_by_kind.lock().get(&kind).copied().unwrap_or(0)
    }

    /// Per-kind send counts for every kind sent at least once, by code.
    #[must_use]
    pub fn sent_by_kind(&self) -> Vec<(EventKind, u64)> {
        let mut counts: Vec<(EventKind, u64)> = self.sent_by_kind.lock().iter().map(|(&k, &n)| (k, n)).collect();
        counts.sort_by_key(|(kind, _)| kind.code());
        counts
    }

    /// The router in use.
    #[must_use]
    pub const fn router(&self) -> &ChannelRouter {
        &self.router
    }
}
