//! # Channel Routing
//!
//! Static classification of every event kind onto a transport lane.
//!
//! ```text
//! ch 0  reliable    gameplay state   hits, pickups, health, respawns
//! ch 1  reliable    lobby / loadout  cards, skins, bot slots
//! ch 2  unreliable  movement         ground state, bullets, aim
//! ch 3  unreliable  cosmetic         vfx, sfx, text, camera shake
//! ```
//!
//! Keeping cosmetic and movement traffic off the reliable lanes means a large
//! reliable payload never blocks them. Anything missing from the table gets
//! the safe default: reliable, channel 0.

use skirmish_shared::constants::DEFAULT_CHANNEL;
use skirmish_shared::EventKind;

use crate::error::{NetError, NetResult};

/// Delivery class of one event kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventDescriptor {
    /// Event kind.
    pub kind: EventKind,
    /// Must arrive, in order.
    pub reliable: bool,
    /// Transport lane.
    pub channel: u8,
}

impl EventDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(kind: EventKind, reliable: bool, channel: u8) -> Self {
        Self { kind, reliable, channel }
    }
}

/// Result of a classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    /// Must arrive, in order.
    pub reliable: bool,
    /// Transport lane, always below the configured channel count.
    pub channel: u8,
}

impl Route {
    /// Route for kinds missing from the table.
    pub const DEFAULT: Self = Self {
        reliable: true,
        channel: DEFAULT_CHANNEL,
    };
}

const fn reliable(kind: EventKind, channel: u8) -> EventDescriptor {
    EventDescriptor::new(kind, true, channel)
}

const fn unreliable(kind: EventKind, channel: u8) -> EventDescriptor {
    EventDescriptor::new(kind, false, channel)
}

/// Built-in descriptor table. `RequestExplosion` is deliberately absent.
pub const DEFAULT_DESCRIPTORS: &[EventDescriptor] = &[
    // Gameplay state
    reliable(EventKind::PlayerHit, 0),
    reliable(EventKind::RequestAssignWeapon, 0),
    reliable(EventKind::SyncAssignWeapon, 0),
    reliable(EventKind::RequestPickupWeapon, 0),
    reliable(EventKind::SyncPickedUpWeapon, 0),
    reliable(EventKind::RequestDropWeapon, 0),
    reliable(EventKind::SyncDroppedWeapon, 0),
    reliable(EventKind::RequestDestroyBox, 0),
    reliable(EventKind::ClearSecondarySlot, 0),
    reliable(EventKind::RequestDestroyAbilityBox, 0),
    reliable(EventKind::SyncAbilityBox, 0),
    reliable(EventKind::HandleFall, 0),
    reliable(EventKind::HandleRespawn, 0),
    reliable(EventKind::ResetCustomAndReady, 0),
    reliable(EventKind::UpdateHealth, 0),
    reliable(EventKind::UpdateLevel, 0),
    reliable(EventKind::UpdatePoint, 0),
    reliable(EventKind::UpdateLastHitBy, 0),
    reliable(EventKind::ExplosionKnockback, 0),
    // Lobby / loadout
    reliable(EventKind::CreateCard, 1),
    reliable(EventKind::ApplySkin, 1),
    reliable(EventKind::ApplySkill, 1),
    reliable(EventKind::SyncOwnership, 1),
    reliable(EventKind::LobbyAddBotSlot, 1),
    reliable(EventKind::LobbyRemoveBotSlot, 1),
    // Movement adjacent
    unreliable(EventKind::UpdateGroundState, 2),
    unreliable(EventKind::DropThrough, 2),
    unreliable(EventKind::ResetPlatformCollision, 2),
    unreliable(EventKind::DuckKnockback, 2),
    unreliable(EventKind::RewindSync, 2),
    unreliable(EventKind::BulletFire, 2),
    unreliable(EventKind::BulletActivate, 2),
    unreliable(EventKind::BulletDeactivate, 2),
    unreliable(EventKind::UpdateAim, 2),
    // Cosmetic
    unreliable(EventKind::PlayVfx, 3),
    unreliable(EventKind::PlayVfxAttached, 3),
    unreliable(EventKind::ShowEffectText, 3),
    unreliable(EventKind::ShowStaticEffectText, 3),
    unreliable(EventKind::PlayAnimation, 3),
    unreliable(EventKind::PlaySfx, 3),
    unreliable(EventKind::PlayEndGameSound, 3),
    unreliable(EventKind::CameraShake, 3),
    unreliable(EventKind::ApplyWindForce, 3),
    unreliable(EventKind::ApplyWindEvent, 3),
    unreliable(EventKind::StopWindEvent, 3),
    unreliable(EventKind::ActivateHyperDash, 3),
    unreliable(EventKind::DeactivateHyperDash, 3),
    unreliable(EventKind::PlaySabotageEffect, 3),
    unreliable(EventKind::SabotagePlayEffect, 3),
    unreliable(EventKind::OsokSetVisibility, 3),
];

/// Lookup table from event code to route.
#[derive(Clone, Debug)]
pub struct ChannelRouter {
    routes: [Option<Route>; 256],
    channel_count: u8,
}

impl ChannelRouter {
    /// Builds a router from a descriptor table.
    ///
    /// Channels at or beyond `channel_count` are accepted but coerced to
    /// channel 0 when classified.
    ///
    /// # Errors
    ///
    /// Returns an error if a kind appears twice or `channel_count` is zero.
    pub fn new(descriptors: &[EventDescriptor], channel_count: u8) -> NetResult<Self> {
        if channel_count == 0 {
            return Err(NetError::InvalidValue {
                field: "channel_count",
                reason: "must be at least 1".into(),
            });
        }

        let mut routes = [None; 256];
        for d in descriptors {
            let slot = &mut routes[usize::from(d.kind.code())];
            if slot.is_some() {
                return Err(NetError::DuplicateDescriptor(d.kind));
            }
            if d.channel >= channel_count {
                tracing::warn!(
                    "Event {} mapped to channel {} but only {} channels exist, using channel {}",
                    d.kind,
                    d.channel,
                    channel_count,
                    DEFAULT_CHANNEL
                );
            }
            *slot = Some(Route {
                reliable: d.reliable,
                channel: d.channel,
            });
        }

        Ok(Self { routes, channel_count })
    }

    /// Router over [`DEFAULT_DESCRIPTORS`].
    ///
    /// # Errors
    ///
    /// Returns an error if `channel_count` is zero.
    pub fn with_defaults(channel_count: u8) -> NetResult<Self> {
        Self::new(DEFAULT_DESCRIPTORS, channel_count)
    }

    /// Route for `kind`.
    #[must_use]
    #[inline]
    pub fn classify(&self, kind: EventKind) -> Route {
        self.classify_code(kind.code())
    }

    /// Route for a raw event code, including codes outside [`EventKind`].
    #[must_use]
    #[inline]
    pub fn classify_code(&self, code: u8) -> Route {
        match self.routes[usize::from(code)] {
            Some(route) if route.channel < self.channel_count => route,
            Some(route) => Route {
                reliable: route.reliable,
                channel: DEFAULT_CHANNEL,
            },
            None => Route::DEFAULT,
        }
    }

    /// True if `kind` has an explicit descriptor.
    #[must_use]
    pub fn is_mapped(&self, kind: EventKind) -> bool {
        self.routes[usize::from(kind.code())].is_some()
    }

    /// Configured channel count.
    #[must_use]
    pub const fn channel_count(&self) -> u8 {
        self.channel_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_routes() {
        let router = ChannelRouter::with_defaults(4).unwrap();

        let hit = router.classify(EventKind::PlayerHit);
        assert_eq!(hit, Route { reliable: true, channel: 0 });

        let skin = router.classify(EventKind::ApplySkin);
        assert_eq!(skin, Route { reliable: true, channel: 1 });

        let bullet = router.classify(EventKind::BulletFire);
        assert_eq!(bullet, Route { reliable: false, channel: 2 });

        let vfx = router.classify(EventKind::PlayVfx);
        assert_eq!(vfx, Route { reliable: false, channel: 3 });

        // Knockback moves the player, so it stays reliable.
        assert!(router.classify(EventKind::ExplosionKnockback).reliable);
    }

    #[test]
    fn test_channel_default() {
        let router = ChannelRouter::with_defaults(4).unwrap();
        assert!(!router.is_mapped(EventKind::RequestExplosion));
        assert_eq!(router.classify(EventKind::RequestExplosion), Route::DEFAULT);
        assert_eq!(router.classify_code(0), Route { reliable: true, channel: 0 });
        assert_eq!(router.classify_code(250), Route::DEFAULT);
    }

    #[test]
    fn test_every_known_kind_but_one_is_mapped() {
        let router = ChannelRouter::with_defaults(4).unwrap();
        let unmapped: Vec<_> = EventKind::ALL.iter().filter(|k| !router.is_mapped(**k)).collect();
        assert_eq!(unmapped, vec![&EventKind::RequestExplosion]);
    }

    #[test]
    fn test_channel_beyond_count_coerced() {
        let router = ChannelRouter::with_defaults(2).unwrap();
        assert_eq!(router.classify(EventKind::PlayVfx), Route { reliable: false, channel: 0 });
        assert_eq!(router.classify(EventKind::ApplySkin), Route { reliable: true, channel: 1 });
    }

    #[test]
    fn test_duplicate_descriptor_rejected() {
        let table = [
            EventDescriptor::new(EventKind::PlayVfx, false, 3),
            EventDescriptor::new(EventKind::PlayVfx, true, 0),
        ];
        let result = ChannelRouter::new(&table, 4);
        assert!(matches!(result, Err(NetError::DuplicateDescriptor(EventKind::PlayVfx))));
    }

    #[test]
    fn test_zero_channels_rejected() {
        assert!(ChannelRouter::with_defaults(0).is_err());
    }
}
