//! Network messages exchanged between participants.
//!
//! Messages are immutable values. Delivery guarantees are up to the
//! transport: inputs and broadcasts may be lost or reordered, and the
//! receivers are written to tolerate both.
//!
//! The binary codec is `bincode` over the serde representation.

use serde::{Deserialize, Serialize};

use riposte_core::ids::{EntityId, Tick};
use riposte_core::input::InputSnapshot;
use riposte_core::state::StateSnapshot;
use riposte_core::weapon::WeaponName;

use crate::CodecError;

// ---------------------------------------------------------------------------
// NetMessage
// ---------------------------------------------------------------------------

/// Every message a participant sends or receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetMessage {
    /// Owner to authority: the input sampled for `tick`. `lead` is how many
    /// ticks the owner runs ahead of its newest confirmed authoritative
    /// state, zero until the first one arrives.
    SendInput {
        entity: EntityId,
        tick: Tick,
        input: InputSnapshot,
        lead: u64,
    },
    /// Authority to everyone else: the input it simulated for `tick` and the
    /// owner's newest reported lead. Newer ticks supersede older ones.
    RelayInput {
        entity: EntityId,
        tick: Tick,
        input: InputSnapshot,
        lead: u64,
    },
    /// Authority to everyone: the canonical state after `tick`.
    BroadcastState {
        entity: EntityId,
        tick: Tick,
        state: StateSnapshot,
    },
    /// Authority to everyone: the entity's health changed.
    HealthChanged { entity: EntityId, health: u32 },
    /// Authority to everyone: the entity was hit.
    HitReaction { entity: EntityId, take_damage_id: i32 },
    /// Authority to everyone: the entity's attack was parried.
    Parried { entity: EntityId, parry_id: i32 },
    /// Owner to authority: switch the entity's weapon.
    SwitchWeapon { entity: EntityId, weapon: WeaponName },
    /// Authority to everyone: the weapon the entity now holds. Also sent
    /// when a switch was refused, so the owner can revert.
    WeaponChanged { entity: EntityId, weapon: WeaponName },
}

impl NetMessage {
    /// Encode to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())?)
    }

    /// Decode from bytes.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let (message, _) = bincode::serde::decode_from_slice(data, bincode::config::standard())?;
        Ok(message)
    }

    /// The entity the message is about.
    pub fn entity(&self) -> EntityId {
        match self {
            NetMessage::SendInput { entity, .. }
            | NetMessage::RelayInput { entity, .. }
            | NetMessage::BroadcastState { entity, .. }
            | NetMessage::HealthChanged { entity, .. }
            | NetMessage::HitReaction { entity, .. }
            | NetMessage::Parried { entity, .. }
            | NetMessage::SwitchWeapon { entity, .. }
            | NetMessage::WeaponChanged { entity, .. } => *entity,
        }
    }

    /// The tick the message refers to, for tick-stamped messages.
    pub fn tick(&self) -> Option<Tick> {
        match self {
            NetMessage::SendInput { tick, .. }
            | NetMessage::RelayInput { tick, .. }
            | NetMessage::BroadcastState { tick, .. } => Some(*tick),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            NetMessage::SendInput { .. } => "send_input",
            NetMessage::RelayInput { .. } => "relay_input",
            NetMessage::BroadcastState { .. } => "broadcast_state",
            NetMessage::HealthChanged { .. } => "health_changed",
            NetMessage::HitReaction { .. } => "hit_reaction",
            NetMessage::Parried { .. } => "parried",
            NetMessage::SwitchWeapon { .. } => "switch_weapon",
            NetMessage::WeaponChanged { .. } => "weapon_changed",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use riposte_core::config::LocomotionConfig;
    use riposte_core::input::AttackClick;
    use riposte_core::math::Vec3;

    #[test]
    fn input_roundtrip_is_compact() {
        let msg = NetMessage::SendInput {
            entity: EntityId::new(3),
            tick: 12345,
            input: InputSnapshot::attacking(AttackClick::Heavy),
            lead: 7,
        };
        let encoded = msg.encode().unwrap();
        assert_eq!(NetMessage::decode(&encoded).unwrap(), msg);
        assert!(encoded.len() < 32, "encoded size was {}", encoded.len());
    }

    #[test]
    fn state_broadcast_roundtrip_preserves_pending_hits() {
        let mut state = StateSnapshot::spawn(Vec3::new(1.5, 0.0, -2.25), 90.0, &LocomotionConfig::default());
        state.damage.pending.insert(EntityId::new(2), 15);
        state.damage.pending.insert(EntityId::new(7), 15);
        let msg = NetMessage::BroadcastState {
            entity: EntityId::new(1),
            tick: 50,
            state,
        };
        let decoded = NetMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.tick(), Some(50));
        assert_eq!(decoded.entity(), EntityId::new(1));
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let msg = NetMessage::HealthChanged {
            entity: EntityId::new(1),
            health: 85,
        };
        let encoded = msg.encode().unwrap();
        let err = NetMessage::decode(&encoded[..encoded.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn weapon_messages_carry_no_tick() {
        let msg = NetMessage::WeaponChanged {
            entity: EntityId::new(4),
            weapon: WeaponName::Staff,
        };
        let decoded = NetMessage::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.tick(), None);
        assert_eq!(decoded.kind(), "weapon_changed");
        assert_eq!(decoded.entity(), EntityId::new(4));
    }
}
