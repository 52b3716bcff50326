// Outcome records: the resolved, replayable result of an intent.
//
// Each `ActionResponse` variant carries exactly what `apply.rs` needs to
// rebuild the successor board without re-running any rule: post-combat unit
// values, absolute charge totals, remaining fuel, paid cost. Replaying a
// list of responses over the starting board therefore reproduces every
// intermediate board bit for bit.
//
// Three families share the enum:
// - Player actions (`Move` .. `EndTurn`), one per `Intent` kind.
// - Lifecycle outcomes produced by the objective tracker and the turn
//   sequencer (`OptionalObjective`, `ReceiveReward`, `GameEnd`, the four
//   `*GameOver` eliminations) and by effects (`Message`, `Spawn`).
// - `Hidden*` variants, which only exist in per-viewer traces built by the
//   encoder. They strip whatever the viewer may not see.
//
// `ActionKind` is the flat discriminant, used as the effect trigger key and
// printed by name in logs.
//
// See also: `apply.rs`, `encoder.rs`, `effects.rs`.

use crate::board::Board;
use crate::building::Building;
use crate::objective::Objective;
use crate::types::{PlayerId, Reward, Skill, TeamId, Vector};
use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionResponse {
    Move {
        from: Vector,
        to: Vector,
        /// Tiles entered, excluding `from`. Shorter than requested after an ambush.
        path: Vec<Vector>,
        fuel: u8,
        completed: bool,
    },
    AttackUnit {
        from: Vector,
        to: Vector,
        player_a: PlayerId,
        player_b: PlayerId,
        /// `None` if the attacker died to the counter-attack.
        unit_a: Option<Unit>,
        /// `None` if the defender was destroyed.
        unit_b: Option<Unit>,
        has_counter_attack: bool,
        charge_a: u32,
        charge_b: u32,
    },
    AttackBuilding {
        from: Vector,
        to: Vector,
        player_a: PlayerId,
        unit_a: Unit,
        /// `None` if the building was destroyed.
        building: Option<Building>,
        charge_a: u32,
    },
    Capture {
        from: Vector,
        player: PlayerId,
        /// Accumulated progress when the capture is still under way.
        progress: Option<u8>,
        /// The transferred building when the capture completed.
        building: Option<Building>,
    },
    CreateUnit {
        from: Vector,
        to: Vector,
        unit: Unit,
        cost: u32,
    },
    CreateBuilding {
        from: Vector,
        building: Building,
        cost: u32,
    },
    DropUnit {
        from: Vector,
        index: usize,
        to: Vector,
        completed: bool,
    },
    Rescue {
        from: Vector,
        to: Vector,
        player: PlayerId,
        completed: bool,
    },
    Sabotage {
        from: Vector,
        to: Vector,
        unit: Unit,
    },
    Fold {
        from: Vector,
    },
    Unfold {
        from: Vector,
    },
    ToggleLightning {
        from: Vector,
        to: Vector,
        player: PlayerId,
    },
    ActivatePower {
        player: PlayerId,
        skill: Skill,
    },
    Supply {
        from: Vector,
        player: PlayerId,
    },
    CompleteUnit {
        from: Vector,
    },
    EndTurn {
        current: PlayerId,
        next: PlayerId,
        round: u16,
        /// Funds of `next` after income.
        funds: u32,
        miss: bool,
    },
    Message {
        player: PlayerId,
        message: String,
    },
    Spawn {
        units: Vec<(Vector, Unit)>,
    },
    OptionalObjective {
        objective_id: u8,
        objective: Objective,
        player: PlayerId,
    },
    ReceiveReward {
        player: PlayerId,
        reward: Reward,
    },
    GameEnd {
        winner: Option<TeamId>,
        objective_id: Option<u8>,
        objective: Option<Objective>,
    },
    BeginTurnGameOver {
        player: PlayerId,
    },
    PreviousTurnGameOver {
        player: PlayerId,
    },
    CaptureGameOver {
        from: Vector,
        player: PlayerId,
        by: PlayerId,
    },
    AttackBuildingGameOver {
        from: Vector,
        player: PlayerId,
    },
    HiddenMove {
        from: Option<Vector>,
        to: Option<Vector>,
        /// Only the steps the viewer can see.
        path: Vec<Vector>,
        completed: bool,
        /// Present when the unit ends its move in view.
        unit: Option<Unit>,
    },
    HiddenSourceAttackUnit {
        to: Vector,
        unit_b: Option<Unit>,
    },
    HiddenTargetAttackUnit {
        from: Vector,
        unit_a: Option<Unit>,
    },
    HiddenSourceAttackBuilding {
        to: Vector,
        building: Option<Building>,
    },
    HiddenTargetAttackBuilding {
        from: Vector,
        unit_a: Unit,
    },
    HiddenDestroyedBuilding {
        position: Vector,
    },
    HiddenSourceRescue {
        to: Vector,
        player: PlayerId,
        completed: bool,
    },
    HiddenSourceSabotage {
        to: Vector,
        unit: Unit,
    },
}

impl ActionResponse {
    pub fn kind(&self) -> ActionKind {
        use ActionResponse as R;
        match self {
            R::Move { .. } => ActionKind::Move,
            R::AttackUnit { .. } => ActionKind::AttackUnit,
            R::AttackBuilding { .. } => ActionKind::AttackBuilding,
            R::Capture { .. } => ActionKind::Capture,
            R::CreateUnit { .. } => ActionKind::CreateUnit,
            R::CreateBuilding { .. } => ActionKind::CreateBuilding,
            R::DropUnit { .. } => ActionKind::DropUnit,
            R::Rescue { .. } => ActionKind::Rescue,
            R::Sabotage { .. } => ActionKind::Sabotage,
            R::Fold { .. } => ActionKind::Fold,
            R::Unfold { .. } => ActionKind::Unfold,
            R::ToggleLightning { .. } => ActionKind::ToggleLightning,
            R::ActivatePower { .. } => ActionKind::ActivatePower,
            R::Supply { .. } => ActionKind::Supply,
            R::CompleteUnit { .. } => ActionKind::CompleteUnit,
            R::EndTurn { .. } => ActionKind::EndTurn,
            R::Message { .. } => ActionKind::Message,
            R::Spawn { .. } => ActionKind::Spawn,
            R::OptionalObjective { .. } => ActionKind::OptionalObjective,
            R::ReceiveReward { .. } => ActionKind::ReceiveReward,
            R::GameEnd { .. } => ActionKind::GameEnd,
            R::BeginTurnGameOver { .. } => ActionKind::BeginTurnGameOver,
            R::PreviousTurnGameOver { .. } => ActionKind::PreviousTurnGameOver,
            R::CaptureGameOver { .. } => ActionKind::CaptureGameOver,
            R::AttackBuildingGameOver { .. } => ActionKind::AttackBuildingGameOver,
            R::HiddenMove { .. } => ActionKind::HiddenMove,
            R::HiddenSourceAttackUnit { .. } => ActionKind::HiddenSourceAttackUnit,
            R::HiddenTargetAttackUnit { .. } => ActionKind::HiddenTargetAttackUnit,
            R::HiddenSourceAttackBuilding { .. } => ActionKind::HiddenSourceAttackBuilding,
            R::HiddenTargetAttackBuilding { .. } => ActionKind::HiddenTargetAttackBuilding,
            R::HiddenDestroyedBuilding { .. } => ActionKind::HiddenDestroyedBuilding,
            R::HiddenSourceRescue { .. } => ActionKind::HiddenSourceRescue,
            R::HiddenSourceSabotage { .. } => ActionKind::HiddenSourceSabotage,
        }
    }

    pub fn is_game_end(&self) -> bool {
        matches!(self, ActionResponse::GameEnd { .. })
    }

    /// One of the four elimination outcomes.
    pub fn eliminated_player(&self) -> Option<PlayerId> {
        match self {
            ActionResponse::BeginTurnGameOver { player }
            | ActionResponse::PreviousTurnGameOver { player }
            | ActionResponse::CaptureGameOver { player, .. }
            | ActionResponse::AttackBuildingGameOver { player, .. } => Some(*player),
            _ => None,
        }
    }

    /// The player whose own action produced this outcome, looked up on the
    /// board the outcome was resolved against. Lifecycle outcomes have none.
    pub fn actor(&self, before: &Board) -> Option<PlayerId> {
        use ActionResponse as R;
        let owner_at = |v: &Vector| before.units.get(v).map(|u| u.player);
        match self {
            R::Move { from, .. }
            | R::Sabotage { from, .. }
            | R::Fold { from }
            | R::Unfold { from }
            | R::CompleteUnit { from }
            | R::DropUnit { from, .. } => owner_at(from),
            R::AttackUnit { player_a, .. } | R::AttackBuilding { player_a, .. } => Some(*player_a),
            R::Capture { player, .. }
            | R::Rescue { player, .. }
            | R::ToggleLightning { player, .. }
            | R::ActivatePower { player, .. }
            | R::Supply { player, .. } => Some(*player),
            R::CreateUnit { unit, .. } => Some(unit.player),
            R::CreateBuilding { building, .. } => Some(building.player),
            R::EndTurn { current, .. } => Some(*current),
            _ => None,
        }
    }

    /// The player an effect triggered by this outcome should be scoped to:
    /// the actor, or the player a lifecycle outcome is about.
    pub fn subject(&self, before: &Board) -> Option<PlayerId> {
        use ActionResponse as R;
        match self {
            R::OptionalObjective { player, .. }
            | R::ReceiveReward { player, .. }
            | R::Message { player, .. } => Some(*player),
            R::Spawn { units } => units.first().map(|(_, u)| u.player),
            _ => self.eliminated_player().or_else(|| self.actor(before)),
        }
    }

    /// Where the action originated, for effect conditions.
    pub fn source(&self) -> Option<Vector> {
        use ActionResponse as R;
        match self {
            R::Move { from, .. }
            | R::AttackUnit { from, .. }
            | R::AttackBuilding { from, .. }
            | R::Capture { from, .. }
            | R::CreateUnit { from, .. }
            | R::CreateBuilding { from, .. }
            | R::DropUnit { from, .. }
            | R::Rescue { from, .. }
            | R::Sabotage { from, .. }
            | R::Fold { from }
            | R::Unfold { from }
            | R::ToggleLightning { from, .. }
            | R::Supply { from, .. }
            | R::CompleteUnit { from }
            | R::CaptureGameOver { from, .. }
            | R::AttackBuildingGameOver { from, .. } => Some(*from),
            _ => None,
        }
    }

    /// What the action was aimed at (or where it ended), for effect conditions.
    pub fn target(&self) -> Option<Vector> {
        use ActionResponse as R;
        match self {
            R::Move { to, .. }
            | R::AttackUnit { to, .. }
            | R::AttackBuilding { to, .. }
            | R::CreateUnit { to, .. }
            | R::DropUnit { to, .. }
            | R::Rescue { to, .. }
            | R::Sabotage { to, .. }
            | R::ToggleLightning { to, .. } => Some(*to),
            R::Capture { from, .. } | R::CreateBuilding { from, .. } => Some(*from),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// Flat discriminant of `ActionResponse`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    Move,
    AttackUnit,
    AttackBuilding,
    Capture,
    CreateUnit,
    CreateBuilding,
    DropUnit,
    Rescue,
    Sabotage,
    Fold,
    Unfold,
    ToggleLightning,
    ActivatePower,
    Supply,
    CompleteUnit,
    EndTurn,
    Message,
    Spawn,
    OptionalObjective,
    ReceiveReward,
    GameEnd,
    BeginTurnGameOver,
    PreviousTurnGameOver,
    CaptureGameOver,
    AttackBuildingGameOver,
    HiddenMove,
    HiddenSourceAttackUnit,
    HiddenTargetAttackUnit,
    HiddenSourceAttackBuilding,
    HiddenTargetAttackBuilding,
    HiddenDestroyedBuilding,
    HiddenSourceRescue,
    HiddenSourceSabotage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 33] = [
        ActionKind::Move,
        ActionKind::AttackUnit,
        ActionKind::AttackBuilding,
        ActionKind::Capture,
        ActionKind::CreateUnit,
        ActionKind::CreateBuilding,
        ActionKind::DropUnit,
        ActionKind::Rescue,
        ActionKind::Sabotage,
        ActionKind::Fold,
        ActionKind::Unfold,
        ActionKind::ToggleLightning,
        ActionKind::ActivatePower,
        ActionKind::Supply,
        ActionKind::CompleteUnit,
        ActionKind::EndTurn,
        ActionKind::Message,
        ActionKind::Spawn,
        ActionKind::OptionalObjective,
        ActionKind::ReceiveReward,
        ActionKind::GameEnd,
        ActionKind::BeginTurnGameOver,
        ActionKind::PreviousTurnGameOver,
        ActionKind::CaptureGameOver,
        ActionKind::AttackBuildingGameOver,
        ActionKind::HiddenMove,
        ActionKind::HiddenSourceAttackUnit,
        ActionKind::HiddenTargetAttackUnit,
        ActionKind::HiddenSourceAttackBuilding,
        ActionKind::HiddenTargetAttackBuilding,
        ActionKind::HiddenDestroyedBuilding,
        ActionKind::HiddenSourceRescue,
        ActionKind::HiddenSourceSabotage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Move => "Move",
            ActionKind::AttackUnit => "AttackUnit",
            ActionKind::AttackBuilding => "AttackBuilding",
            ActionKind::Capture => "Capture",
            ActionKind::CreateUnit => "CreateUnit",
            ActionKind::CreateBuilding => "CreateBuilding",
            ActionKind::DropUnit => "DropUnit",
            ActionKind::Rescue => "Rescue",
            ActionKind::Sabotage => "Sabotage",
            ActionKind::Fold => "Fold",
            ActionKind::Unfold => "Unfold",
            ActionKind::ToggleLightning => "ToggleLightning",
            ActionKind::ActivatePower => "ActivatePower",
            ActionKind::Supply => "Supply",
            ActionKind::CompleteUnit => "CompleteUnit",
            ActionKind::EndTurn => "EndTurn",
            ActionKind::Message => "Message",
            ActionKind::Spawn => "Spawn",
            ActionKind::OptionalObjective => "OptionalObjective",
            ActionKind::ReceiveReward => "ReceiveReward",
            ActionKind::GameEnd => "GameEnd",
            ActionKind::BeginTurnGameOver => "BeginTurnGameOver",
            ActionKind::PreviousTurnGameOver => "PreviousTurnGameOver",
            ActionKind::CaptureGameOver => "CaptureGameOver",
            ActionKind::AttackBuildingGameOver => "AttackBuildingGameOver",
            ActionKind::HiddenMove => "HiddenMove",
            ActionKind::HiddenSourceAttackUnit => "HiddenSourceAttackUnit",
            ActionKind::HiddenTargetAttackUnit => "HiddenTargetAttackUnit",
            ActionKind::HiddenSourceAttackBuilding => "HiddenSourceAttackBuilding",
            ActionKind::HiddenTargetAttackBuilding => "HiddenTargetAttackBuilding",
            ActionKind::HiddenDestroyedBuilding => "HiddenDestroyedBuilding",
            ActionKind::HiddenSourceRescue => "HiddenSourceRescue",
            ActionKind::HiddenSourceSabotage => "HiddenSourceSabotage",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown action kind: {s}"))
    }
}
