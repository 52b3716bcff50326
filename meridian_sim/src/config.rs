// Data-driven rule tables.
//
// Everything numeric about units, buildings, terrain and powers lives in
// `GameConfig`, loadable from JSON. The resolver, vision and AI read these
// tables and never hard-code a cost, range or damage value. `Default`
// provides the built-in ruleset used by tests and the benchmark.
//
// Per-kind data is grouped the same way for every table:
// - `UnitInfo` keyed by `UnitType`: cost, movement, vision, fuel, weapons,
//   transport capacity and capability flags.
// - `BuildingInfo` keyed by `BuildingType`: vision, income, capture
//   resistance, production list, build cost.
// - `TileInfo` keyed by `TileType`: movement cost per `MovementType`
//   (absent = impassable), vision cost, defensive cover.
// - `SkillInfo` keyed by `Skill`: charge cost and magnitude.
//
// See also: `resolver.rs` and `combat.rs` which consume the unit and tile
// tables, `vision.rs` for vision radius and vision cost, `turn.rs` for
// income.
//
// **Critical constraint: determinism.** Every client of a match must load an
// identical config. Values are integers only.

use crate::error::Rejection;
use crate::types::{BuildingType, MovementType, Skill, TargetClass, TileType, UnitType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// One weapon mount. Damage is the base value against a full-health target
/// with no cover; a missing column means the weapon cannot hit that class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub damage: BTreeMap<TargetClass, u16>,
    pub min_range: u8,
    pub max_range: u8,
    /// Shots per resupply. `None` means unlimited.
    pub ammo: Option<u8>,
}

impl Weapon {
    fn direct(damage: &[(TargetClass, u16)], ammo: Option<u8>) -> Self {
        Self {
            damage: damage.iter().copied().collect(),
            min_range: 1,
            max_range: 1,
            ammo,
        }
    }

    fn ranged(damage: &[(TargetClass, u16)], min_range: u8, max_range: u8, ammo: Option<u8>) -> Self {
        Self {
            damage: damage.iter().copied().collect(),
            min_range,
            max_range,
            ammo,
        }
    }

    pub fn reaches(&self, distance: u32) -> bool {
        distance >= u32::from(self.min_range) && distance <= u32::from(self.max_range)
    }

    pub fn damage_against(&self, class: TargetClass) -> u16 {
        self.damage.get(&class).copied().unwrap_or(0)
    }

    pub fn is_ranged(&self) -> bool {
        self.min_range > 1
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub cost: u32,
    pub movement_type: MovementType,
    pub movement_radius: u8,
    pub vision: u8,
    pub fuel: u8,
    pub weapons: Vec<Weapon>,
    /// Cargo slots. Zero for non-transports.
    #[serde(default)]
    pub capacity: u8,
    /// Movement types this unit can carry.
    #[serde(default)]
    pub transports: Vec<MovementType>,
    /// Capture resistance removed per capture at full health. Zero = cannot capture.
    #[serde(default)]
    pub capture_power: u8,
    #[serde(default)]
    pub can_rescue: bool,
    #[serde(default)]
    pub can_sabotage: bool,
    #[serde(default)]
    pub can_supply: bool,
    /// Buildings this unit can construct on its own tile.
    #[serde(default)]
    pub builds: Vec<BuildingType>,
    /// Attacks only while folded, and cannot move while folded.
    #[serde(default)]
    pub requires_fold: bool,
    /// May still act after being dropped in the turn it was loaded.
    #[serde(default)]
    pub can_act_after_drop: bool,
}

impl UnitInfo {
    pub fn can_carry(&self, movement_type: MovementType) -> bool {
        self.capacity > 0 && self.transports.contains(&movement_type)
    }

    pub fn has_weapons(&self) -> bool {
        !self.weapons.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Buildings, tiles, skills
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingInfo {
    pub vision: u8,
    pub income: u32,
    /// Total capture progress required to take the building. `None` means the
    /// building cannot be captured.
    pub capture_resistance: Option<u8>,
    #[serde(default)]
    pub produces: Vec<UnitType>,
    /// Price when constructed by a builder unit. `None` = not constructible.
    #[serde(default)]
    pub cost: Option<u32>,
    /// Whether the building can raise and lower lightning barriers.
    #[serde(default)]
    pub controls_lightning: bool,
    /// Losing this building eliminates its owner.
    #[serde(default)]
    pub is_headquarters: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub movement_cost: BTreeMap<MovementType, u8>,
    pub vision_cost: u8,
    /// Percentage damage reduction for ground units standing here.
    pub cover: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub charge_cost: u32,
    #[serde(default)]
    pub heal: u8,
    #[serde(default)]
    pub attack_bonus: u8,
    #[serde(default)]
    pub vision_bonus: u8,
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub units: BTreeMap<UnitType, UnitInfo>,
    pub buildings: BTreeMap<BuildingType, BuildingInfo>,
    pub tiles: BTreeMap<TileType, TileInfo>,
    pub skills: BTreeMap<Skill, SkillInfo>,
    /// Charge gained per health point of damage dealt.
    pub charge_dealt_rate: u32,
    /// Charge gained per health point of damage received.
    pub charge_received_rate: u32,
    pub max_charge: u32,
    pub sabotage_damage: u8,
    /// Maximum distance from a radar to a toggled lightning barrier.
    pub lightning_radius: u8,
    /// Missed turns after which a player is removed from the match.
    pub max_misses: u8,
}

impl GameConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn unit(&self, unit_type: UnitType) -> Result<&UnitInfo, Rejection> {
        self.units
            .get(&unit_type)
            .ok_or(Rejection::MissingUnitRules(unit_type))
    }

    pub fn building(&self, building_type: BuildingType) -> Result<&BuildingInfo, Rejection> {
        self.buildings
            .get(&building_type)
            .ok_or(Rejection::MissingBuildingRules(building_type))
    }

    /// Movement cost to enter a tile, or `None` if impassable.
    pub fn movement_cost(&self, tile: TileType, movement_type: MovementType) -> Option<u32> {
        self.tiles
            .get(&tile)
            .and_then(|info| info.movement_cost.get(&movement_type))
            .map(|&cost| u32::from(cost.max(1)))
    }

    pub fn vision_cost(&self, tile: TileType) -> u32 {
        self.tiles
            .get(&tile)
            .map_or(1, |info| u32::from(info.vision_cost.max(1)))
    }

    pub fn cover(&self, tile: TileType) -> u32 {
        self.tiles
            .get(&tile)
            .map_or(0, |info| u32::from(info.cover.min(100)))
    }

    /// Clamp a charge value to the configured ceiling.
    pub fn cap_charge(&self, charge: u32) -> u32 {
        charge.min(self.max_charge)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        use MovementType::{Air, Soldier, Tires, Tread};
        use TargetClass as C;

        let mut units = BTreeMap::new();
        units.insert(
            UnitType::Pioneer,
            UnitInfo {
                cost: 150,
                movement_type: Soldier,
                movement_radius: 4,
                vision: 2,
                fuel: 40,
                weapons: vec![Weapon::direct(
                    &[(C::Soldier, 40), (C::Vehicle, 10), (C::Building, 10)],
                    None,
                )],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 10,
                can_rescue: true,
                can_sabotage: false,
                can_supply: false,
                builds: vec![BuildingType::House, BuildingType::Barracks],
                requires_fold: false,
                can_act_after_drop: false,
            },
        );
        units.insert(
            UnitType::Infantry,
            UnitInfo {
                cost: 250,
                movement_type: Soldier,
                movement_radius: 3,
                vision: 2,
                fuel: 40,
                weapons: vec![Weapon::direct(
                    &[(C::Soldier, 55), (C::Vehicle, 15), (C::Building, 15)],
                    None,
                )],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 10,
                can_rescue: true,
                can_sabotage: false,
                can_supply: false,
                builds: Vec::new(),
                requires_fold: false,
                can_act_after_drop: true,
            },
        );
        units.insert(
            UnitType::Saboteur,
            UnitInfo {
                cost: 300,
                movement_type: Soldier,
                movement_radius: 4,
                vision: 3,
                fuel: 40,
                weapons: vec![Weapon::direct(
                    &[(C::Soldier, 45), (C::Vehicle, 10), (C::Building, 10)],
                    None,
                )],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 0,
                can_rescue: false,
                can_sabotage: true,
                can_supply: false,
                builds: Vec::new(),
                requires_fold: false,
                can_act_after_drop: false,
            },
        );
        units.insert(
            UnitType::Sniper,
            UnitInfo {
                cost: 450,
                movement_type: Soldier,
                movement_radius: 2,
                vision: 3,
                fuel: 30,
                weapons: vec![Weapon::ranged(
                    &[(C::Soldier, 90), (C::Vehicle, 25), (C::Building, 20)],
                    2,
                    3,
                    Some(4),
                )],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 0,
                can_rescue: false,
                can_sabotage: false,
                can_supply: false,
                builds: Vec::new(),
                requires_fold: true,
                can_act_after_drop: false,
            },
        );
        units.insert(
            UnitType::Jeep,
            UnitInfo {
                cost: 350,
                movement_type: Tires,
                movement_radius: 6,
                vision: 3,
                fuel: 60,
                weapons: Vec::new(),
                capacity: 1,
                transports: vec![Soldier],
                capture_power: 0,
                can_rescue: false,
                can_sabotage: false,
                can_supply: true,
                builds: Vec::new(),
                requires_fold: false,
                can_act_after_drop: false,
            },
        );
        units.insert(
            UnitType::Tank,
            UnitInfo {
                cost: 700,
                movement_type: Tread,
                movement_radius: 5,
                vision: 2,
                fuel: 50,
                weapons: vec![
                    Weapon::direct(
                        &[(C::Soldier, 40), (C::Vehicle, 60), (C::Building, 50)],
                        Some(6),
                    ),
                    Weapon::direct(
                        &[(C::Soldier, 45), (C::Vehicle, 5), (C::Air, 10)],
                        None,
                    ),
                ],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 0,
                can_rescue: false,
                can_sabotage: false,
                can_supply: false,
                builds: Vec::new(),
                requires_fold: false,
                can_act_after_drop: false,
            },
        );
        units.insert(
            UnitType::Artillery,
            UnitInfo {
                cost: 650,
                movement_type: Tread,
                movement_radius: 4,
                vision: 2,
                fuel: 50,
                weapons: vec![Weapon::ranged(
                    &[(C::Soldier, 70), (C::Vehicle, 65), (C::Building, 60)],
                    2,
                    3,
                    Some(5),
                )],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 0,
                can_rescue: false,
                can_sabotage: false,
                can_supply: false,
                builds: Vec::new(),
                requires_fold: false,
                can_act_after_drop: false,
            },
        );
        units.insert(
            UnitType::Helicopter,
            UnitInfo {
                cost: 800,
                movement_type: Air,
                movement_radius: 6,
                vision: 3,
                fuel: 60,
                weapons: vec![Weapon::direct(
                    &[
                        (C::Soldier, 60),
                        (C::Vehicle, 50),
                        (C::Air, 45),
                        (C::Building, 30),
                    ],
                    Some(6),
                )],
                capacity: 0,
                transports: Vec::new(),
                capture_power: 0,
                can_rescue: false,
                can_sabotage: false,
                can_supply: false,
                builds: Vec::new(),
                requires_fold: false,
                can_act_after_drop: false,
            },
        );

        let building = |vision: u8, income: u32, produces: Vec<UnitType>, cost: Option<u32>| {
            BuildingInfo {
                vision,
                income,
                capture_resistance: Some(20),
                produces,
                cost,
                controls_lightning: false,
                is_headquarters: false,
            }
        };
        let mut buildings = BTreeMap::new();
        buildings.insert(
            BuildingType::Headquarters,
            BuildingInfo {
                is_headquarters: true,
                ..building(2, 100, vec![UnitType::Pioneer, UnitType::Infantry], None)
            },
        );
        buildings.insert(
            BuildingType::Barracks,
            building(
                1,
                50,
                vec![
                    UnitType::Pioneer,
                    UnitType::Infantry,
                    UnitType::Saboteur,
                    UnitType::Sniper,
                ],
                Some(300),
            ),
        );
        buildings.insert(
            BuildingType::Factory,
            building(
                1,
                50,
                vec![UnitType::Jeep, UnitType::Tank, UnitType::Artillery],
                None,
            ),
        );
        buildings.insert(
            BuildingType::Airfield,
            building(1, 50, vec![UnitType::Helicopter], None),
        );
        buildings.insert(BuildingType::House, building(1, 100, Vec::new(), Some(200)));
        buildings.insert(
            BuildingType::Radar,
            BuildingInfo {
                controls_lightning: true,
                ..building(4, 0, Vec::new(), None)
            },
        );

        let tile = |costs: &[(MovementType, u8)], vision_cost: u8, cover: u8| TileInfo {
            movement_cost: costs.iter().copied().collect(),
            vision_cost,
            cover,
        };
        let mut tiles = BTreeMap::new();
        tiles.insert(
            TileType::Plain,
            tile(&[(Soldier, 1), (Tires, 2), (Tread, 1), (Air, 1)], 1, 10),
        );
        tiles.insert(
            TileType::Forest,
            tile(&[(Soldier, 1), (Tires, 3), (Tread, 2), (Air, 1)], 2, 30),
        );
        tiles.insert(TileType::Mountain, tile(&[(Soldier, 2), (Air, 1)], 2, 40));
        tiles.insert(
            TileType::Road,
            tile(&[(Soldier, 1), (Tires, 1), (Tread, 1), (Air, 1)], 1, 0),
        );
        tiles.insert(TileType::River, tile(&[(Soldier, 2), (Air, 1)], 1, 0));
        tiles.insert(TileType::Sea, tile(&[(Air, 1)], 1, 0));
        tiles.insert(
            TileType::Teleporter,
            tile(&[(Soldier, 1), (Tires, 1), (Tread, 1), (Air, 1)], 1, 0),
        );

        let mut skills = BTreeMap::new();
        skills.insert(
            Skill::FieldRepair,
            SkillInfo {
                charge_cost: 200,
                heal: 20,
                attack_bonus: 0,
                vision_bonus: 0,
            },
        );
        skills.insert(
            Skill::Overdrive,
            SkillInfo {
                charge_cost: 300,
                heal: 0,
                attack_bonus: 30,
                vision_bonus: 0,
            },
        );
        skills.insert(
            Skill::Recon,
            SkillInfo {
                charge_cost: 150,
                heal: 0,
                attack_bonus: 0,
                vision_bonus: 2,
            },
        );

        Self {
            units,
            buildings,
            tiles,
            skills,
            charge_dealt_rate: 2,
            charge_received_rate: 1,
            max_charge: 1000,
            sabotage_damage: 30,
            lightning_radius: 3,
            max_misses: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_covers_every_kind() {
        let config = GameConfig::default();
        for unit_type in UnitType::ALL {
            assert!(config.unit(unit_type).is_ok(), "{unit_type:?} missing");
        }
        assert_eq!(config.buildings.len(), 6);
        assert_eq!(config.tiles.len(), 7);
        assert_eq!(config.skills.len(), 3);
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = GameConfig::default();
        let json = config.to_json().unwrap();
        let restored = GameConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn optional_flags_default_when_absent() {
        let json = r#"{
            "cost": 100, "movement_type": "Soldier", "movement_radius": 3,
            "vision": 2, "fuel": 20, "weapons": []
        }"#;
        let info: UnitInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.capacity, 0);
        assert!(!info.requires_fold);
        assert!(info.builds.is_empty());
    }

    #[test]
    fn sea_blocks_ground_movement() {
        let config = GameConfig::default();
        assert_eq!(config.movement_cost(TileType::Sea, MovementType::Tread), None);
        assert_eq!(config.movement_cost(TileType::Sea, MovementType::Air), Some(1));
        assert_eq!(config.movement_cost(TileType::Forest, MovementType::Tires), Some(3));
    }

    #[test]
    fn ranged_weapons_skip_adjacent_targets() {
        let config = GameConfig::default();
        let artillery = &config.units[&UnitType::Artillery].weapons[0];
        assert!(artillery.is_ranged());
        assert!(!artillery.reaches(1));
        assert!(artillery.reaches(3));
        assert!(!artillery.reaches(4));
    }

    #[test]
    fn missing_rules_are_reported() {
        let mut config = GameConfig::default();
        config.units.remove(&UnitType::Tank);
        assert_eq!(
            config.unit(UnitType::Tank),
            Err(Rejection::MissingUnitRules(UnitType::Tank))
        );
    }
}
