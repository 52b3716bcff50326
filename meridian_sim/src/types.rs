// Core value types shared across the simulation.
//
// Grid coordinates (`Vector`, `Size`), player and team identifiers, and the
// closed enums that index the static rule tables in `config.rs` (unit,
// movement, building, tile and skill kinds). Everything here is `Copy`,
// totally ordered and serializable so it can key a `BTreeMap` and travel
// over the wire unchanged.
//
// Also hosts `vector_map`, a serde adapter that writes `BTreeMap<Vector, T>`
// as a list of `[vector, value]` pairs, since JSON object keys must be
// strings.
//
// See also: `config.rs` for the tables keyed by these enums, `board.rs` for
// the collections keyed by `Vector`.
//
// **Critical constraint: determinism.** `Ord` on `Vector` (x first, then y)
// defines iteration order for every unit and building collection, and
// therefore the order of effects, objectives and AI proposals.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// An integer grid coordinate. `y` grows downward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance.
    pub fn distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    /// The four orthogonal neighbors in fixed order: up, right, down, left.
    pub fn neighbors(self) -> [Vector; 4] {
        [
            Vector::new(self.x, self.y - 1),
            Vector::new(self.x + 1, self.y),
            Vector::new(self.x, self.y + 1),
            Vector::new(self.x - 1, self.y),
        ]
    }

    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Board dimensions. Valid coordinates are `0..width` by `0..height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(self, v: Vector) -> bool {
        v.x >= 0 && v.y >= 0 && v.x < self.width && v.y < self.height
    }

    /// Row-major index of an in-bounds coordinate.
    pub fn index(self, v: Vector) -> Option<usize> {
        if self.contains(v) {
            Some((v.y * self.width + v.x) as usize)
        } else {
            None
        }
    }

    pub fn area(self) -> usize {
        (self.width.max(0) * self.height.max(0)) as usize
    }
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A seat at the table. `PlayerId::NEUTRAL` (0) owns unclaimed buildings and
/// units awaiting rescue; it never takes a turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const NEUTRAL: PlayerId = PlayerId(0);

    pub fn is_neutral(self) -> bool {
        self == Self::NEUTRAL
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Players on the same team share vision, never damage each other, and win
/// or lose together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub u8);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rule-table keys
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    Pioneer,
    Infantry,
    Saboteur,
    Sniper,
    Jeep,
    Tank,
    Artillery,
    Helicopter,
}

impl UnitType {
    pub const ALL: [UnitType; 8] = [
        UnitType::Pioneer,
        UnitType::Infantry,
        UnitType::Saboteur,
        UnitType::Sniper,
        UnitType::Jeep,
        UnitType::Tank,
        UnitType::Artillery,
        UnitType::Helicopter,
    ];
}

/// How a unit crosses terrain. Also decides which damage column applies when
/// the unit is attacked (see `TargetClass`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MovementType {
    Soldier,
    Tires,
    Tread,
    Air,
}

impl MovementType {
    pub fn target_class(self) -> TargetClass {
        match self {
            MovementType::Soldier => TargetClass::Soldier,
            MovementType::Tires | MovementType::Tread => TargetClass::Vehicle,
            MovementType::Air => TargetClass::Air,
        }
    }
}

/// Damage table column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetClass {
    Soldier,
    Vehicle,
    Air,
    Building,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuildingType {
    Headquarters,
    Barracks,
    Factory,
    Airfield,
    House,
    Radar,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileType {
    #[default]
    Plain,
    Forest,
    Mountain,
    Road,
    River,
    Sea,
    Teleporter,
}

/// A special power a player can activate by spending charge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Skill {
    /// Heal every own unit at once.
    FieldRepair,
    /// Percentage bonus to all damage dealt until the turn ends.
    Overdrive,
    /// Extra vision radius for every own unit and building until the turn ends.
    Recon,
}

/// What an objective hands out when its completing side wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Reward {
    Skill(Skill),
    Portrait(UnitType),
}

/// Hint for automated players. Has no effect on resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Behavior {
    Attack,
    Defense,
    Passive,
}

// ---------------------------------------------------------------------------
// Serde adapter for Vector-keyed maps
// ---------------------------------------------------------------------------

/// `#[serde(with = "vector_map")]` for `BTreeMap<Vector, T>`.
pub mod vector_map {
    use super::Vector;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S, T>(map: &BTreeMap<Vector, T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<BTreeMap<Vector, T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        let entries: Vec<(Vector, T)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn distance_is_manhattan() {
        assert_eq!(Vector::new(1, 1).distance(Vector::new(4, 3)), 5);
        assert_eq!(Vector::new(2, 2).distance(Vector::new(2, 2)), 0);
        assert!(Vector::new(0, 0).is_adjacent(Vector::new(0, 1)));
        assert!(!Vector::new(0, 0).is_adjacent(Vector::new(1, 1)));
    }

    #[test]
    fn neighbor_order_is_fixed() {
        let n = Vector::new(5, 5).neighbors();
        assert_eq!(
            n,
            [
                Vector::new(5, 4),
                Vector::new(6, 5),
                Vector::new(5, 6),
                Vector::new(4, 5)
            ]
        );
    }

    #[test]
    fn size_bounds() {
        let size = Size::new(4, 3);
        assert!(size.contains(Vector::new(3, 2)));
        assert!(!size.contains(Vector::new(4, 0)));
        assert!(!size.contains(Vector::new(0, -1)));
        assert_eq!(size.index(Vector::new(1, 2)), Some(9));
        assert_eq!(size.index(Vector::new(-1, 0)), None);
        assert_eq!(size.area(), 12);
    }

    #[test]
    fn vector_map_serializes_as_pairs() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Holder {
            #[serde(with = "vector_map")]
            map: BTreeMap<Vector, u8>,
        }
        let mut map = BTreeMap::new();
        map.insert(Vector::new(2, 1), 7u8);
        map.insert(Vector::new(0, 3), 9u8);
        let holder = Holder { map };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"map":[[{"x":0,"y":3},9],[{"x":2,"y":1},7]]}"#);
        let restored: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, holder);
    }

    #[test]
    fn movement_maps_to_damage_column() {
        assert_eq!(MovementType::Tread.target_class(), TargetClass::Vehicle);
        assert_eq!(MovementType::Air.target_class(), TargetClass::Air);
    }
}
