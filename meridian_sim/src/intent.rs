// Intents: what a player, an automated player or a scripted effect asks for.
//
// `Intent` is the closed set of requests the resolver accepts. The serde tag
// `"type"` is the stable wire discriminant; adding a variant forces every
// `match` in the resolver to handle it. `Spawn` and `Message` are reserved
// for scripted effects and are rejected when submitted by a player.
//
// See also: `resolver.rs` (validation), `response.rs` (the resolved form),
// `effects.rs` (scripted intents).

use crate::types::{BuildingType, Skill, UnitType, Vector};
use crate::unit::Unit;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    /// Move the unit at `from`. Without an explicit `path` the cheapest one
    /// is chosen.
    Move {
        from: Vector,
        to: Vector,
        #[serde(default)]
        path: Option<Vec<Vector>>,
    },
    AttackUnit {
        from: Vector,
        to: Vector,
    },
    AttackBuilding {
        from: Vector,
        to: Vector,
    },
    /// Capture the building under the unit at `from`.
    Capture {
        from: Vector,
    },
    /// Produce a unit at `to` from the building at `from`.
    CreateUnit {
        from: Vector,
        to: Vector,
        unit_type: UnitType,
    },
    /// Construct a building under the builder unit at `from`.
    CreateBuilding {
        from: Vector,
        building_type: BuildingType,
    },
    /// Unload cargo slot `index` of the transport at `from` onto `to`.
    DropUnit {
        from: Vector,
        index: usize,
        to: Vector,
    },
    Rescue {
        from: Vector,
        to: Vector,
    },
    Sabotage {
        from: Vector,
        to: Vector,
    },
    Fold {
        from: Vector,
    },
    Unfold {
        from: Vector,
    },
    /// Raise or lower the lightning barrier at `to` using the radar at `from`.
    ToggleLightning {
        from: Vector,
        to: Vector,
    },
    ActivatePower {
        skill: Skill,
    },
    /// Refill fuel and ammunition of units next to the supplier at `from`.
    Supply {
        from: Vector,
    },
    /// End the unit's activity for this turn.
    CompleteUnit {
        from: Vector,
    },
    EndTurn,
    /// Place ready-made units. Effects only.
    Spawn {
        units: Vec<(Vector, Unit)>,
    },
    /// Narrative text. Effects only.
    Message {
        message: String,
    },
}

impl Intent {
    pub fn is_effect_only(&self) -> bool {
        matches!(self, Intent::Spawn { .. } | Intent::Message { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tag_is_the_variant_name() {
        let intent = Intent::Capture {
            from: Vector::new(1, 2),
        };
        let json = serde_json::to_string(&intent).unwrap();
        assert_eq!(json, r#"{"type":"Capture","from":{"x":1,"y":2}}"#);
        let end: Intent = serde_json::from_str(r#"{"type":"EndTurn"}"#).unwrap();
        assert_eq!(end, Intent::EndTurn);
    }

    #[test]
    fn move_path_is_optional_on_the_wire() {
        let intent: Intent = serde_json::from_str(
            r#"{"type":"Move","from":{"x":0,"y":0},"to":{"x":0,"y":2}}"#,
        )
        .unwrap();
        assert_eq!(
            intent,
            Intent::Move {
                from: Vector::new(0, 0),
                to: Vector::new(0, 2),
                path: None
            }
        );
    }
}
