// Units on the board.
//
// A `Unit` is a plain value stored in `Board::units` under its position; a
// transported unit lives in its carrier's `cargo` list rather than under its
// own key, so moving a transport moves its passengers for free and there are
// no back references. Every change produces a new `Unit` inside a new board.
//
// See also: `board.rs` (the owning collection), `config.rs` (`UnitInfo`
// capability flags), `apply.rs` (the only place units are rebuilt).

use crate::config::UnitInfo;
use crate::types::{Behavior, PlayerId, UnitType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub const MAX_HEALTH: u8 = 100;

/// Remaining shots per weapon, index-aligned with `UnitInfo::weapons`.
pub type Ammo = SmallVec<[Option<u8>; 2]>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub unit_type: UnitType,
    pub player: PlayerId,
    pub health: u8,
    pub fuel: u8,
    pub ammo: Ammo,
    /// Finished for this turn; cannot act until the owner's next turn.
    #[serde(default)]
    pub completed: bool,
    /// Spent its move this turn; may still attack with direct weapons.
    #[serde(default)]
    pub moved: bool,
    #[serde(default)]
    pub folded: bool,
    /// Boarded a transport during the current turn.
    #[serde(default)]
    pub loaded_this_turn: bool,
    #[serde(default)]
    pub label: Option<u8>,
    #[serde(default)]
    pub behavior: Option<Behavior>,
    /// Player holding the rescue claim on this (neutral) unit.
    #[serde(default)]
    pub rescuer: Option<PlayerId>,
    /// Capture resistance removed so far from the building underneath.
    #[serde(default)]
    pub capture_progress: u8,
    #[serde(default)]
    pub cargo: Vec<Unit>,
}

impl Unit {
    /// A fresh, fully supplied unit.
    pub fn new(unit_type: UnitType, player: PlayerId, info: &UnitInfo) -> Self {
        Self {
            unit_type,
            player,
            health: MAX_HEALTH,
            fuel: info.fuel,
            ammo: info.weapons.iter().map(|w| w.ammo).collect(),
            completed: false,
            moved: false,
            folded: false,
            loaded_this_turn: false,
            label: None,
            behavior: None,
            rescuer: None,
            capture_progress: 0,
            cargo: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: u8) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_health(mut self, health: u8) -> Self {
        self.health = health.min(MAX_HEALTH);
        self
    }

    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.player = player;
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn with_cargo(mut self, cargo: Unit) -> Self {
        self.cargo.push(cargo);
        self
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Whether the weapon at `index` still has a shot.
    pub fn has_ammo(&self, index: usize) -> bool {
        match self.ammo.get(index) {
            Some(Some(shots)) => *shots > 0,
            Some(None) => true,
            None => false,
        }
    }

    /// Spend one shot from the weapon at `index`. Unlimited weapons are unchanged.
    pub fn spend_ammo(&mut self, index: usize) {
        if let Some(Some(shots)) = self.ammo.get_mut(index) {
            *shots = shots.saturating_sub(1);
        }
    }

    /// Restore fuel and ammunition to the rule-table maximum.
    pub fn resupply(&mut self, info: &UnitInfo) {
        self.fuel = info.fuel;
        self.ammo = info.weapons.iter().map(|w| w.ammo).collect();
    }

    /// Ready for a new turn. Cargo is refreshed with its carrier.
    pub fn refresh(&mut self) {
        self.completed = false;
        self.moved = false;
        self.loaded_this_turn = false;
        for passenger in &mut self.cargo {
            passenger.refresh();
        }
    }

    /// Does this unit, or anything it carries, match `predicate`?
    pub fn any(&self, predicate: &impl Fn(&Unit) -> bool) -> bool {
        predicate(self) || self.cargo.iter().any(|u| u.any(predicate))
    }

    /// Number of units including nested cargo.
    pub fn head_count(&self) -> u32 {
        1 + self.cargo.iter().map(Unit::head_count).sum::<u32>()
    }
}
