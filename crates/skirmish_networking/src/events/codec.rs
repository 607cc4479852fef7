//! Event envelope wire format.
//!
//! Every event travels as `{ payload, sent_timestamp }` under its event code.
//! The receiver checks that the code and the payload agree before anything
//! reaches a handler.

use serde::{Deserialize, Serialize};
use skirmish_shared::{EventKind, EventPayload};

use crate::error::{NetError, NetResult};

/// Payload plus the authoritative time it was sent at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Typed event data.
    pub payload: EventPayload,
    /// Authoritative clock at send time (seconds).
    pub sent_timestamp: f64,
}

impl EventEnvelope {
    /// Wraps a payload.
    #[must_use]
    pub const fn new(payload: EventPayload, sent_timestamp: f64) -> Self {
        Self { payload, sent_timestamp }
    }

    /// Kind of the wrapped payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Encodes for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> NetResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes a frame received under `code`.
    ///
    /// # Errors
    ///
    /// Returns an error if `code` is unknown, the bytes are malformed, or the
    /// payload belongs to a different kind.
    pub fn decode(code: u8, bytes: &[u8]) -> NetResult<Self> {
        let kind = EventKind::from_code(code).ok_or(NetError::UnknownEventKind(code))?;
        let envelope: Self = bincode::deserialize(bytes)?;
        if envelope.kind() != kind {
            return Err(NetError::KindMismatch {
                code,
                payload: envelope.kind(),
            });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_shared::Vec2;

    fn shake() -> EventEnvelope {
        EventEnvelope::new(
            EventPayload::CameraShake {
                magnitude: 0.4,
                duration: 0.25,
            },
            12.5,
        )
    }

    #[test]
    fn test_decode_encoded_envelope() {
        let envelope = EventEnvelope::new(
            EventPayload::BulletFire {
                position: Vec2::new(1.0, 2.0),
                direction: Vec2::X,
                speed: 40.0,
                lifetime: 1.5,
                weapon: "Shotgun".into(),
                shooter_actor: 3,
            },
            7.25,
        );
        let bytes = envelope.encode().unwrap();
        let decoded = EventEnvelope::decode(EventKind::BulletFire.code(), &bytes).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_unknown_code() {
        let bytes = shake().encode().unwrap();
        assert!(matches!(EventEnvelope::decode(0, &bytes), Err(NetError::UnknownEventKind(0))));
    }

    #[test]
    fn test_code_mismatch() {
        let bytes = shake().encode().unwrap();
        let result = EventEnvelope::decode(EventKind::PlayVfx.code(), &bytes);
        assert!(matches!(
            result,
            Err(NetError::KindMismatch {
                payload: EventKind::CameraShake,
                ..
            })
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let result = EventEnvelope::decode(EventKind::CameraShake.code(), &[0xFF, 0xFF, 0xFF]);
        assert!(matches!(result, Err(NetError::Codec(_))));
    }
}
