//! Discrete gameplay events exchanged between peers.
//!
//! [`EventKind`] is the closed, versioned set of event codes. Every kind has
//! exactly one typed [`EventPayload`] arm, so receivers never decode by
//! position or cast at runtime.
//!
//! Codes are grouped by the lane they normally travel on:
//!
//! ```text
//!  1..29   gameplay state      (reliable)
//! 30..39   lobby / loadout     (reliable)
//! 40..59   movement adjacent   (unreliable)
//! 60..79   cosmetic            (unreliable)
//! ```

use crate::math::Vec2;
use serde::{Deserialize, Serialize};

macro_rules! event_kinds {
    ($( $(#[$meta:meta])* $name:ident = $code:literal, )+) => {
        /// Event code discriminator
        #[repr(u8)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum EventKind {
            $( $(#[$meta])* $name = $code, )+
        }

        impl EventKind {
            /// Every kind, in code order
            pub const ALL: &'static [EventKind] = &[ $( EventKind::$name, )+ ];

            /// Looks up a kind by its wire code
            #[must_use]
            pub const fn from_code(code: u8) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$name), )+
                    _ => None,
                }
            }

            /// Stable name, as used in configuration files
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name), )+
                }
            }
        }
    };
}

event_kinds! {
    /// A bullet hit a player
    PlayerHit = 1,
    /// Ask the master to put a weapon in a slot
    RequestAssignWeapon = 2,
    /// Master confirms a weapon assignment
    SyncAssignWeapon = 3,
    /// Ask the master to pick up a dropped weapon
    RequestPickupWeapon = 4,
    /// Master confirms a pickup
    SyncPickedUpWeapon = 5,
    /// Ask the master to drop a weapon into the world
    RequestDropWeapon = 6,
    /// Master confirms a drop
    SyncDroppedWeapon = 7,
    /// Ask the master to destroy a weapon box
    RequestDestroyBox = 8,
    /// Clear a player's secondary weapon slot
    ClearSecondarySlot = 9,
    /// Ask the master to destroy an ability box
    RequestDestroyAbilityBox = 10,
    /// Master grants an ability from a box
    SyncAbilityBox = 11,
    /// Player fell out of the arena
    HandleFall = 12,
    /// Player respawned
    HandleRespawn = 13,
    /// Reset customization and ready flags for a new round
    ResetCustomAndReady = 14,
    /// Authoritative health value
    UpdateHealth = 15,
    /// Authoritative level value
    UpdateLevel = 16,
    /// Authoritative score value
    UpdatePoint = 17,
    /// Who last damaged a player
    UpdateLastHitBy = 18,
    /// Knockback from an explosion or bullet
    ExplosionKnockback = 19,
    /// Ask the master to resolve an explosion
    RequestExplosion = 20,

    /// A card was created in the lobby
    CreateCard = 30,
    /// A skin was applied
    ApplySkin = 31,
    /// A skill was applied
    ApplySkill = 32,
    /// Ownership of a networked object changed
    SyncOwnership = 33,
    /// A bot slot was added to the lobby
    LobbyAddBotSlot = 34,
    /// A bot slot was removed from the lobby
    LobbyRemoveBotSlot = 35,

    /// Grounded state changed
    UpdateGroundState = 40,
    /// Drop through a one-way platform
    DropThrough = 41,
    /// Restore collision with a platform
    ResetPlatformCollision = 42,
    /// Knockback from a duck attack
    DuckKnockback = 43,
    /// Lag-compensation rewind marker
    RewindSync = 44,
    /// A bullet was fired
    BulletFire = 45,
    /// A pooled bullet was activated
    BulletActivate = 46,
    /// A pooled bullet was deactivated
    BulletDeactivate = 47,
    /// Aim direction changed
    UpdateAim = 48,

    /// Play a one-shot visual effect
    PlayVfx = 60,
    /// Play a visual effect attached to an entity
    PlayVfxAttached = 61,
    /// Floating text that follows an entity
    ShowEffectText = 62,
    /// Floating text at a fixed position
    ShowStaticEffectText = 63,
    /// Play an animation state
    PlayAnimation = 64,
    /// Play a sound effect
    PlaySfx = 65,
    /// Play the end-of-match sting
    PlayEndGameSound = 66,
    /// Shake the camera
    CameraShake = 67,
    /// Apply a constant wind force
    ApplyWindForce = 68,
    /// Start a timed wind event
    ApplyWindEvent = 69,
    /// Stop the current wind event
    StopWindEvent = 70,
    /// Hyper dash started
    ActivateHyperDash = 71,
    /// Hyper dash ended
    DeactivateHyperDash = 72,
    /// Sabotage effect on a target
    PlaySabotageEffect = 73,
    /// Sabotage effect at a position
    SabotagePlayEffect = 74,
    /// One-shot-one-kill visibility state
    OsokSetVisibility = 75,
}

impl EventKind {
    /// Wire code
    #[must_use]
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by its configuration name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Who an event is delivered to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiverGroup {
    /// Every peer, including the sender
    #[default]
    All,
    /// Every peer except the sender
    Others,
    /// Only the master client
    MasterClient,
    /// An explicit list of actor numbers
    Actors(Vec<i32>),
}

/// Typed payload for every [`EventKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// A bullet hit a player
    PlayerHit {
        /// Actor that was hit
        victim_actor: i32,
        /// Actor that fired
        shooter_actor: i32,
        /// Authoritative time of the hit
        hit_time: f64,
        /// Knockback force
        force: f32,
        /// Knockback direction
        knock_dir: Vec2,
    },
    /// Ask the master to put a weapon in a slot
    RequestAssignWeapon {
        /// Player view
        view_id: i32,
        /// Weapon name
        weapon: String,
        /// Inventory slot
        slot: u8,
    },
    /// Master confirms a weapon assignment
    SyncAssignWeapon {
        /// Player view
        view_id: i32,
        /// Weapon name
        weapon: String,
        /// Inventory slot
        slot: u8,
    },
    /// Ask the master to pick up a dropped weapon
    RequestPickupWeapon {
        /// Player view
        view_id: i32,
        /// Weapon name
        weapon: String,
        /// Remaining ammo
        ammo: i32,
        /// View of the dropped pickup
        drop_view_id: i32,
    },
    /// Master confirms a pickup
    SyncPickedUpWeapon {
        /// Player view
        view_id: i32,
        /// Weapon name
        weapon: String,
        /// Remaining ammo
        ammo: i32,
    },
    /// Ask the master to drop a weapon into the world
    RequestDropWeapon {
        /// Player view
        dropper_view_id: i32,
        /// Drop position
        position: Vec2,
        /// Weapon category
        weapon_type: u8,
        /// Weapon name
        weapon: String,
        /// Remaining ammo
        ammo: i32,
    },
    /// Master confirms a drop
    SyncDroppedWeapon {
        /// View of the spawned pickup
        pickup_view_id: i32,
        /// Weapon name
        weapon: String,
        /// Remaining ammo
        ammo: i32,
    },
    /// Ask the master to destroy a weapon box
    RequestDestroyBox {
        /// Box view
        view_id: i32,
    },
    /// Clear a player's secondary weapon slot
    ClearSecondarySlot {
        /// Player view
        view_id: i32,
    },
    /// Ask the master to destroy an ability box
    RequestDestroyAbilityBox {
        /// Box view
        view_id: i32,
    },
    /// Master grants an ability from a box
    SyncAbilityBox {
        /// Player view
        view_id: i32,
        /// Ability name
        ability: String,
    },
    /// Player fell out of the arena
    HandleFall {
        /// Player view
        view_id: i32,
        /// Actor who pushed them (0 = nobody)
        pusher_actor: i32,
        /// Where they fell
        position: Vec2,
    },
    /// Player respawned
    HandleRespawn {
        /// Player view
        view_id: i32,
        /// Spawn point
        position: Vec2,
    },
    /// Reset customization and ready flags for a new round
    ResetCustomAndReady,
    /// Authoritative health value
    UpdateHealth {
        /// Actor number
        actor: i32,
        /// New health
        health: i32,
    },
    /// Authoritative level value
    UpdateLevel {
        /// Actor number
        actor: i32,
        /// New level
        level: i32,
    },
    /// Authoritative score value
    UpdatePoint {
        /// Actor number
        actor: i32,
        /// New score
        points: i32,
    },
    /// Who last damaged a player
    UpdateLastHitBy {
        /// Damaged actor
        target_actor: i32,
        /// Attacking actor
        attacker_actor: i32,
    },
    /// Knockback from an explosion or bullet
    ExplosionKnockback {
        /// Player view
        view_id: i32,
        /// Push direction
        direction: Vec2,
        /// Velocity change magnitude
        delta_v: f32,
        /// Control lockout (seconds)
        duration: f32,
        /// Caused by a bullet rather than an explosion
        is_bullet: bool,
    },
    /// Ask the master to resolve an explosion
    RequestExplosion {
        /// Explosion centre
        position: Vec2,
        /// Blast radius
        radius: f32,
        /// Knockback at the centre
        max_knockback: f32,
        /// Knockback at the edge
        min_knockback: f32,
        /// View excluded from the blast
        exclude_view_id: Option<i32>,
    },

    /// A card was created in the lobby
    CreateCard {
        /// Owning actor
        actor: i32,
        /// Card identifier
        card: String,
    },
    /// A skin was applied
    ApplySkin {
        /// Owning actor
        actor: i32,
        /// Skin identifier
        skin: String,
    },
    /// A skill was applied
    ApplySkill {
        /// Owning actor
        actor: i32,
        /// Skill identifier
        skill: String,
    },
    /// Ownership of a networked object changed
    SyncOwnership {
        /// Object view
        view_id: i32,
        /// New owner
        owner_actor: i32,
    },
    /// A bot slot was added to the lobby
    LobbyAddBotSlot {
        /// Slot index
        slot: u8,
        /// Display name
        bot_name: String,
    },
    /// A bot slot was removed from the lobby
    LobbyRemoveBotSlot {
        /// Slot index
        slot: u8,
    },

    /// Grounded state changed
    UpdateGroundState {
        /// Player view
        view_id: i32,
        /// Standing on ground
        grounded: bool,
    },
    /// Drop through a one-way platform
    DropThrough {
        /// Platform identifier
        platform_id: String,
        /// How long collision stays off (seconds)
        duration: f32,
    },
    /// Restore collision with a platform
    ResetPlatformCollision {
        /// Platform identifier
        platform_id: String,
    },
    /// Knockback from a duck attack
    DuckKnockback {
        /// Player view
        view_id: i32,
        /// Push direction
        direction: Vec2,
        /// Velocity change magnitude
        delta_v: f32,
        /// Stun time (seconds)
        stun_duration: f32,
    },
    /// Lag-compensation rewind marker
    RewindSync {
        /// Player view
        view_id: i32,
        /// Authoritative time to rewind to
        rewind_time: f64,
    },
    /// A bullet was fired
    BulletFire {
        /// Muzzle position
        position: Vec2,
        /// Travel direction
        direction: Vec2,
        /// Speed (units per second)
        speed: f32,
        /// Lifetime (seconds)
        lifetime: f32,
        /// Weapon name
        weapon: String,
        /// Firing actor
        shooter_actor: i32,
    },
    /// A pooled bullet was activated
    BulletActivate {
        /// Pool slot
        bullet_id: i32,
        /// Spawn position
        position: Vec2,
    },
    /// A pooled bullet was deactivated
    BulletDeactivate {
        /// Pool slot
        bullet_id: i32,
    },
    /// Aim direction changed
    UpdateAim {
        /// Player view
        view_id: i32,
        /// Aim angle (radians)
        angle: f32,
    },

    /// Play a one-shot visual effect
    PlayVfx {
        /// Effect name
        name: String,
        /// Where to play it
        position: Vec2,
        /// Lifetime (seconds)
        duration: f32,
    },
    /// Play a visual effect attached to an entity
    PlayVfxAttached {
        /// Effect name
        name: String,
        /// Entity to follow
        view_id: i32,
        /// Lifetime (seconds)
        duration: f32,
    },
    /// Floating text that follows an entity
    ShowEffectText {
        /// Text prefab
        prefab: String,
        /// Text content
        text: String,
        /// Initial position
        start: Vec2,
        /// Offset from the followed entity
        offset: Vec2,
        /// Entity to follow
        view_id: i32,
        /// Lifetime (seconds)
        duration: f32,
    },
    /// Floating text at a fixed position
    ShowStaticEffectText {
        /// Text prefab
        prefab: String,
        /// Text content
        text: String,
        /// World position
        position: Vec2,
        /// Lifetime (seconds)
        duration: f32,
    },
    /// Play an animation state
    PlayAnimation {
        /// Entity to animate
        view_id: i32,
        /// Animation state name
        animation: String,
    },
    /// Play a sound effect
    PlaySfx {
        /// Sound key
        key: String,
        /// Where to play it
        position: Vec2,
        /// Volume (0..1)
        volume: f32,
    },
    /// Play the end-of-match sting
    PlayEndGameSound {
        /// Winning actor
        winner_actor: i32,
    },
    /// Shake the camera
    CameraShake {
        /// Shake strength
        magnitude: f32,
        /// Shake time (seconds)
        duration: f32,
    },
    /// Apply a constant wind force
    ApplyWindForce {
        /// Force vector
        force: Vec2,
    },
    /// Start a timed wind event
    ApplyWindEvent {
        /// Wind direction
        direction: Vec2,
        /// Wind strength
        strength: f32,
        /// Event length (seconds)
        duration: f32,
    },
    /// Stop the current wind event
    StopWindEvent,
    /// Hyper dash started
    ActivateHyperDash {
        /// Player view
        view_id: i32,
    },
    /// Hyper dash ended
    DeactivateHyperDash {
        /// Player view
        view_id: i32,
    },
    /// Sabotage effect on a target
    PlaySabotageEffect {
        /// Target view
        view_id: i32,
        /// Effect name
        effect: String,
    },
    /// Sabotage effect at a position
    SabotagePlayEffect {
        /// Effect name
        effect: String,
        /// World position
        position: Vec2,
    },
    /// One-shot-one-kill visibility state
    OsokSetVisibility {
        /// Player view
        view_id: i32,
        /// Visibility state index
        state: u8,
    },
}

impl EventPayload {
    /// Returns the event kind this payload belongs to
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::PlayerHit { .. } => EventKind::PlayerHit,
            Self::RequestAssignWeapon { .. } => EventKind::RequestAssignWeapon,
            Self::SyncAssignWeapon { .. } => EventKind::SyncAssignWeapon,
            Self::RequestPickupWeapon { .. } => EventKind::RequestPickupWeapon,
            Self::SyncPickedUpWeapon { .. } => EventKind::SyncPickedUpWeapon,
            Self::RequestDropWeapon { .. } => EventKind::RequestDropWeapon,
            Self::SyncDroppedWeapon { .. } => EventKind::SyncDroppedWeapon,
            Self::RequestDestroyBox { .. } => EventKind::RequestDestroyBox,
            Self::ClearSecondarySlot { .. } => EventKind::ClearSecondarySlot,
            Self::RequestDestroyAbilityBox { .. } => EventKind::RequestDestroyAbilityBox,
            Self::SyncAbilityBox { .. } => EventKind::SyncAbilityBox,
            Self::HandleFall { .. } => EventKind::HandleFall,
            Self::HandleRespawn { .. } => EventKind::HandleRespawn,
            Self::ResetCustomAndReady => EventKind::ResetCustomAndReady,
            Self::UpdateHealth { .. } => EventKind::UpdateHealth,
            Self::UpdateLevel { .. } => EventKind::UpdateLevel,
            Self::UpdatePoint { .. } => EventKind::UpdatePoint,
            Self::UpdateLastHitBy { .. } => EventKind::UpdateLastHitBy,
            Self::ExplosionKnockback { .. } => EventKind::ExplosionKnockback,
            Self::RequestExplosion { .. } => EventKind::RequestExplosion,
            Self::CreateCard { .. } => EventKind::CreateCard,
            Self::ApplySkin { .. } => EventKind::ApplySkin,
            Self::ApplySkill { .. } => EventKind::ApplySkill,
            Self::SyncOwnership { .. } => EventKind::SyncOwnership,
            Self::LobbyAddBotSlot { .. } => EventKind::LobbyAddBotSlot,
            Self::LobbyRemoveBotSlot { .. } => EventKind::LobbyRemoveBotSlot,
            Self::UpdateGroundState { .. } => EventKind::UpdateGroundState,
            Self::DropThrough { .. } => EventKind::DropThrough,
            Self::ResetPlatformCollision { .. } => EventKind::ResetPlatformCollision,
            Self::DuckKnockback { .. } => EventKind::DuckKnockback,
            Self::RewindSync { .. } => EventKind::RewindSync,
            Self::BulletFire { .. } => EventKind::BulletFire,
            Self::BulletActivate { .. } => EventKind::BulletActivate,
            Self::BulletDeactivate { .. } => EventKind::BulletDeactivate,
            Self::UpdateAim { .. } => EventKind::UpdateAim,
            Self::PlayVfx { .. } => EventKind::PlayVfx,
            Self::PlayVfxAttached { .. } => EventKind::PlayVfxAttached,
            Self::ShowEffectText { .. } => EventKind::ShowEffectText,
            Self::ShowStaticEffectText { .. } => EventKind::ShowStaticEffectText,
            Self::PlayAnimation { .. } => EventKind::PlayAnimation,
            Self::PlaySfx { .. } => EventKind::PlaySfx,
            Self::PlayEndGameSound { .. } => EventKind::PlayEndGameSound,
            Self::CameraShake { .. } => EventKind::CameraShake,
            Self::ApplyWindForce { .. } => EventKind::ApplyWindForce,
            Self::ApplyWindEvent { .. } => EventKind::ApplyWindEvent,
            Self::StopWindEvent => EventKind::StopWindEvent,
            Self::ActivateHyperDash { .. } => EventKind::ActivateHyperDash,
            Self::DeactivateHyperDash { .. } => EventKind::DeactivateHyperDash,
            Self::PlaySabotageEffect { .. } => EventKind::PlaySabotageEffect,
            Self::SabotagePlayEffect { .. } => EventKind::SabotagePlayEffect,
            Self::OsokSetVisibility { .. } => EventKind::OsokSetVisibility,
        }
    }

    /// Returns the world position this event happened at (if it has one)
    #[must_use]
    pub fn position(&self) -> Option<Vec2> {
        match self {
            Self::RequestDropWeapon { position, .. }
            | Self::HandleFall { position, .. }
            | Self::HandleRespawn { position, .. }
            | Self::RequestExplosion { position, .. }
            | Self::BulletFire { position, .. }
            | Self::BulletActivate { position, .. }
            | Self::PlayVfx { position, .. }
            | Self::ShowStaticEffectText { position, .. }
            | Self::PlaySfx { position, .. }
            | Self::SabotagePlayEffect { position, .. } => Some(*position),
            Self::ShowEffectText { start, .. } => Some(*start),
            _ => None,
        }
    }
}
