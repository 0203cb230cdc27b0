//! Static weapon catalog.
//!
//! Weapons are plain data: animation ids, damage values and reach. The
//! catalog is loaded once and shared read-only by every participant. Light
//! attack ids are sequential: a weapon whose first light attack is `101` has
//! its second and third light attacks at `102` and `103`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Take-damage animation ids known to the animation graph.
pub const TAKE_DAMAGE_IDS: &[i32] = &[1];
/// Attack animation ids known to the animation graph.
pub const ATTACK_IDS: &[i32] = &[101, 102, 103, 104];
/// Parry animation ids known to the animation graph.
pub const PARRY_IDS: &[i32] = &[51, 52];

/// Number of chained light attacks per weapon.
pub const LIGHT_COMBO_LENGTH: i32 = 3;

// ---------------------------------------------------------------------------
// WeaponName
// ---------------------------------------------------------------------------

/// Weapon selector. `None` means unarmed, which cannot attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum WeaponName {
    /// Unarmed.
    #[default]
    None,
    /// One-handed sword.
    Sword,
    /// Staff.
    Staff,
}

// ---------------------------------------------------------------------------
// WeaponData
// ---------------------------------------------------------------------------

/// Catalog entry for a single weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponData {
    /// First light attack id; the combo continues at `+1` and `+2`.
    pub light_attack_one_id: i32,
    /// Heavy attack id.
    pub heavy_attack_one_id: i32,
    /// Hit reaction played on a target struck by this weapon's wielder.
    pub take_damage_front_id: i32,
    /// Parry performed by the wielder.
    pub do_parry_id: i32,
    /// Reaction played by the wielder when parried.
    pub get_parried_id: i32,
    /// Damage of each light attack.
    pub light_attack_damage: u32,
    /// Damage of the heavy attack.
    pub heavy_attack_damage: u32,
    /// Melee hit-scan range in metres.
    pub reach: f32,
}

impl WeaponData {
    /// Second light attack id.
    pub fn light_attack_two_id(&self) -> i32 {
        self.light_attack_one_id + 1
    }

    /// Third light attack id.
    pub fn light_attack_three_id(&self) -> i32 {
        self.light_attack_one_id + 2
    }

    /// Damage dealt while `attack_id` is playing.
    pub fn damage_for(&self, attack_id: i32) -> u32 {
        if attack_id == self.heavy_attack_one_id {
            self.heavy_attack_damage
        } else {
            self.light_attack_damage
        }
    }
}

// ---------------------------------------------------------------------------
// WeaponCatalog
// ---------------------------------------------------------------------------

/// Lookup table from [`WeaponName`] to [`WeaponData`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponCatalog {
    weapons: BTreeMap<WeaponName, WeaponData>,
}

impl Default for WeaponCatalog {
    fn default() -> Self {
        let sword = WeaponData {
            light_attack_one_id: 101,
            heavy_attack_one_id: 104,
            take_damage_front_id: 1,
            do_parry_id: 51,
            get_parried_id: 52,
            light_attack_damage: 15,
            heavy_attack_damage: 30,
            reach: 1.6,
        };
        let staff = WeaponData {
            light_attack_damage: 10,
            heavy_attack_damage: 35,
            reach: 2.1,
            ..sword.clone()
        };
        let mut weapons = BTreeMap::new();
        weapons.insert(WeaponName::Sword, sword);
        weapons.insert(WeaponName::Staff, staff);
        Self { weapons }
    }
}

impl WeaponCatalog {
    /// An empty catalog.
    pub fn empty() -> Self {
        Self {
            weapons: BTreeMap::new(),
        }
    }

    /// Add or replace an entry after validating it.
    pub fn insert(&mut self, name: WeaponName, data: WeaponData) -> Result<(), CoreError> {
        validate_entry(name, &data)?;
        self.weapons.insert(name, data);
        Ok(())
    }

    /// Look up a weapon. Unarmed and unknown weapons return `None`.
    pub fn get(&self, name: WeaponName) -> Option<&WeaponData> {
        if name == WeaponName::None {
            return None;
        }
        self.weapons.get(&name)
    }

    /// Parse and validate a JSON catalog.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let catalog: WeaponCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check every entry against the animation graph's id sets.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, data) in &self.weapons {
            validate_entry(*name, data)?;
        }
        Ok(())
    }

    /// Iterate entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (WeaponName, &WeaponData)> {
        self.weapons.iter().map(|(name, data)| (*name, data))
    }
}

fn validate_entry(name: WeaponName, data: &WeaponData) -> Result<(), CoreError> {
    let invalid = |reason: String| CoreError::InvalidWeapon { name, reason };

    if name == WeaponName::None {
        return Err(invalid("the unarmed slot cannot hold weapon data".to_owned()));
    }
    for offset in 0..LIGHT_COMBO_LENGTH {
        let id = data.light_attack_one_id + offset;
        if !ATTACK_IDS.contains(&id) {
            return Err(invalid(format!("light attack id {id} is not a known attack")));
        }
    }
    if !ATTACK_IDS.contains(&data.heavy_attack_one_id) {
        return Err(invalid(format!(
            "heavy attack id {} is not a known attack",
            data.heavy_attack_one_id
        )));
    }
    if !TAKE_DAMAGE_IDS.contains(&data.take_damage_front_id) {
        return Err(invalid(format!(
            "take damage id {} is not a known reaction",
            data.take_damage_front_id
        )));
    }
    for id in [data.do_parry_id, data.get_parried_id] {
        if !PARRY_IDS.contains(&id) {
            return Err(invalid(format!("parry id {id} is not a known parry")));
        }
    }
    if !(data.reach > 0.0 && data.reach.is_finite()) {
        return Err(invalid(format!("reach must be positive, got {}", data.reach)));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_valid() {
        let catalog = WeaponCatalog::default();
        catalog.validate().unwrap();
        assert!(catalog.get(WeaponName::Sword).is_some());
        assert!(catalog.get(WeaponName::Staff).is_some());
    }

    #[test]
    fn unarmed_has_no_data() {
        assert!(WeaponCatalog::default().get(WeaponName::None).is_none());
    }

    #[test]
    fn light_ids_are_sequential() {
        let catalog = WeaponCatalog::default();
        let sword = catalog.get(WeaponName::Sword).unwrap();
        assert_eq!(sword.light_attack_two_id(), 102);
        assert_eq!(sword.light_attack_three_id(), 103);
    }

    #[test]
    fn heavy_damage_only_for_heavy_id() {
        let catalog = WeaponCatalog::default();
        let sword = catalog.get(WeaponName::Sword).unwrap();
        assert_eq!(sword.damage_for(104), sword.heavy_attack_damage);
        assert_eq!(sword.damage_for(102), sword.light_attack_damage);
    }

    #[test]
    fn out_of_range_light_chain_is_rejected() {
        let mut catalog = WeaponCatalog::empty();
        let mut data = WeaponCatalog::default().get(WeaponName::Sword).unwrap().clone();
        // 103, 104, 105: the last id is unknown.
        data.light_attack_one_id = 103;
        let err = catalog.insert(WeaponName::Sword, data).unwrap_err();
        assert!(matches!(err, CoreError::InvalidWeapon { name: WeaponName::Sword, .. }));
    }

    #[test]
    fn catalog_json_roundtrip() {
        let catalog = WeaponCatalog::default();
        let json = serde_json::to_string(&catalog).unwrap();
        let back = WeaponCatalog::from_json_str(&json).unwrap();
        assert_eq!(back, catalog);
    }
}
