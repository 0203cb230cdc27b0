//! Identifiers shared by every participant: ticks, entities, physics layers
//! and animation clips.
//!
//! All identifiers are plain `Copy` values so they can be embedded in
//! immutable snapshots and sent over the wire without indirection.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// A discrete, fixed-duration simulation step. Globally ordered.
///
/// The clock emits `1` as its first tick; `0` is reserved for the spawn state
/// that precedes the first simulated tick.
pub type Tick = u64;

/// The tick index of a freshly spawned entity's initial state.
pub const SPAWN_TICK: Tick = 0;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Network identity of a simulated player entity.
///
/// Assigned by the session layer (for example the owning client id). The
/// ordering is used wherever a deterministic iteration order over entities
/// is required.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Source of damage not dealt by a player, such as a hazard. Never
    /// assigned to a simulated entity.
    pub const ENVIRONMENT: EntityId = EntityId(0);

    /// Construct an `EntityId` from its raw value.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LayerMask
// ---------------------------------------------------------------------------

/// Bit mask selecting which physics layers a query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Static level geometry the character can stand on.
    pub const GROUND: LayerMask = LayerMask(1 << 0);
    /// Player hurt boxes.
    pub const PLAYER: LayerMask = LayerMask(1 << 1);

    /// Whether any bit of `other` is set in this mask.
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

// ---------------------------------------------------------------------------
// ClipId
// ---------------------------------------------------------------------------

/// Stable identity of an animation clip (state) in the animation graph.
///
/// Derived from the clip's name with BLAKE3 so that every participant
/// computes the same value without a shared registry.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ClipId(pub u32);

impl ClipId {
    /// Placeholder for "no clip sampled yet".
    pub const NONE: ClipId = ClipId(0);

    /// Hash a clip name into its id.
    pub fn from_name(name: &str) -> Self {
        let hash = blake3::hash(name.as_bytes());
        let bytes = hash.as_bytes();
        let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        // Never collide with the NONE sentinel.
        Self(raw.max(1))
    }
}

impl fmt::Debug for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClipId({:#010x})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_roundtrips_raw() {
        let id = EntityId::new(42);
        assert_eq!(id.to_raw(), 42);
        assert_eq!(format!("{id}"), "#42");
        assert_eq!(format!("{id:?}"), "EntityId(42)");
    }

    #[test]
    fn clip_ids_are_stable_and_distinct() {
        let a = ClipId::from_name("Attack.Light1");
        let b = ClipId::from_name("Attack.Light1");
        let c = ClipId::from_name("Attack.Light2");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, ClipId::NONE);
    }

    #[test]
    fn layer_mask_intersection() {
        let both = LayerMask(LayerMask::GROUND.0 | LayerMask::PLAYER.0);
        assert!(both.intersects(LayerMask::PLAYER));
        assert!(!LayerMask::GROUND.intersects(LayerMask::PLAYER));
    }
}
