// Effects Engine: scripted reactions to resolved outcomes.
//
// An `Effects` table maps a `TriggerKey` (an outcome kind, or one of the
// lifecycle keys `Start` and `BeginTurnNoUnits`) to an ordered list of
// `Effect`s. When the pipeline produces an outcome it calls
// `apply_effects` with the matching key. Each effect whose player filter and
// conditions pass has its action list resolved through the Action Resolver
// with `Origin::Effect`, one intent after another on a scratch board.
//
// Atomicity: if any action of an effect is rejected, none of that effect's
// outcomes are kept and the scratch board is rolled back to where the effect
// started. The table is left as if the effect never fired. Discards are
// logged at debug level and never surface as errors.
//
// Occurrence:
// - `Every` fires whenever its conditions hold.
// - `Once` is removed from the table after its first successful firing.
// - `OncePerPlayer` records the trigger player in `fired_for` and never
//   fires for that player again.
//
// The trigger player is the subject of the triggering outcome (its actor,
// or the player a lifecycle outcome is about); without one it is the
// current player. An action with no explicit `player` acts as the trigger
// player, so scripts can act for whoever set them off, or name another
// player to stage a counter-move outside that player's turn.
//
// See also: `game.rs` (when effects fire, no recursion), `resolver.rs`
// (`Origin::Effect` rules).
//
// **Critical constraint: determinism.** Effects fire in table order; the
// table is a `BTreeMap` keyed by `TriggerKey` with `Vec` values.

use crate::board::Board;
use crate::config::GameConfig;
use crate::error::Rejection;
use crate::intent::Intent;
use crate::resolver::{Origin, resolve};
use crate::response::{ActionKind, ActionResponse};
use crate::types::{PlayerId, UnitType, Vector};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ---------------------------------------------------------------------------
// Trigger keys
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriggerKey {
    Action(ActionKind),
    /// Fired once when a match starts.
    Start,
    /// Fired at the start of a turn whose player has no units.
    BeginTurnNoUnits,
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKey::Action(kind) => f.write_str(kind.name()),
            TriggerKey::Start => f.write_str("Start"),
            TriggerKey::BeginTurnNoUnits => f.write_str("BeginTurnNoUnits"),
        }
    }
}

impl FromStr for TriggerKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Start" => Ok(TriggerKey::Start),
            "BeginTurnNoUnits" => Ok(TriggerKey::BeginTurnNoUnits),
            other => other.parse().map(TriggerKey::Action),
        }
    }
}

impl Serialize for TriggerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TriggerKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<ActionKind> for TriggerKey {
    fn from(kind: ActionKind) -> Self {
        TriggerKey::Action(kind)
    }
}

// ---------------------------------------------------------------------------
// Effect definitions
// ---------------------------------------------------------------------------

/// A tile named relative to the triggering outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativeVector {
    Source,
    Target,
    At(Vector),
}

impl RelativeVector {
    pub fn resolve(self, response: Option<&ActionResponse>) -> Option<Vector> {
        match self {
            RelativeVector::Source => response.and_then(ActionResponse::source),
            RelativeVector::Target => response.and_then(ActionResponse::target),
            RelativeVector::At(v) => Some(v),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Condition {
    /// A unit of `unit_type` (and owner, if given) stands at `at`.
    UnitEquals {
        at: RelativeVector,
        unit_type: UnitType,
        #[serde(default)]
        player: Option<PlayerId>,
    },
    UnitLabel {
        at: RelativeVector,
        label: u8,
    },
    BuildingOwnedBy {
        at: Vector,
        player: PlayerId,
    },
    RoundAtLeast {
        round: u16,
    },
    /// The trigger player has completed the objective.
    ObjectiveCompleted {
        objective_id: u8,
    },
    /// The trigger player's team has (or has not) won.
    IsWinner {
        winner: bool,
    },
}

impl Condition {
    pub fn holds(&self, board: &Board, response: Option<&ActionResponse>, trigger: PlayerId) -> bool {
        let unit_at = |at: &RelativeVector| at.resolve(response).and_then(|v| board.units.get(&v));
        match self {
            Condition::UnitEquals { at, unit_type, player } => unit_at(at)
                .is_some_and(|u| u.unit_type == *unit_type && player.is_none_or(|p| p == u.player)),
            Condition::UnitLabel { at, label } => unit_at(at).is_some_and(|u| u.label == Some(*label)),
            Condition::BuildingOwnedBy { at, player } => {
                board.buildings.get(at).is_some_and(|b| b.player == *player)
            }
            Condition::RoundAtLeast { round } => board.round >= *round,
            Condition::ObjectiveCompleted { objective_id } => board
                .objectives
                .get(objective_id)
                .is_some_and(|o| o.completed.contains(&trigger)),
            Condition::IsWinner { winner } => {
                let decided = match response {
                    Some(ActionResponse::GameEnd { winner, .. }) => *winner,
                    _ => board.winner,
                };
                let won = decided.is_some() && board.team_of(trigger) == decided;
                won == *winner
            }
        }
    }
}

/// One scripted intent. Without `player` it acts as the trigger player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectAction {
    #[serde(default)]
    pub player: Option<PlayerId>,
    pub intent: Intent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occurrence {
    #[default]
    Every,
    Once,
    OncePerPlayer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub actions: Vec<EffectAction>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub occurrence: Occurrence,
    /// Trigger players this effect reacts to. Empty means everyone.
    #[serde(default)]
    pub players: BTreeSet<PlayerId>,
    #[serde(default)]
    pub fired_for: BTreeSet<PlayerId>,
}

impl Effect {
    pub fn new(actions: Vec<EffectAction>) -> Self {
        Self {
            actions,
            conditions: Vec::new(),
            occurrence: Occurrence::Every,
            players: BTreeSet::new(),
            fired_for: BTreeSet::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn occurring(mut self, occurrence: Occurrence) -> Self {
        self.occurrence = occurrence;
        self
    }

    pub fn for_player(mut self, player: PlayerId) -> Self {
        self.players.insert(player);
        self
    }

    fn listens_to(&self, trigger: PlayerId) -> bool {
        (self.players.is_empty() || self.players.contains(&trigger))
            && !(self.occurrence == Occurrence::OncePerPlayer && self.fired_for.contains(&trigger))
    }

    /// Resolve every action in order, or fail as a whole.
    fn fire(&self, config: &GameConfig, board: &Board, trigger: PlayerId) -> Result<(Vec<ActionResponse>, Board), Rejection> {
        let mut scratch = board.clone();
        let mut out = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            let player = action.player.unwrap_or(trigger);
            let (response, next) = resolve(config, &scratch, &action.intent, player, Origin::Effect)?;
            out.push(response);
            scratch = next;
        }
        Ok((out, scratch))
    }
}

impl EffectAction {
    pub fn new(intent: Intent) -> Self {
        Self { player: None, intent }
    }

    pub fn as_player(player: PlayerId, intent: Intent) -> Self {
        Self {
            player: Some(player),
            intent,
        }
    }
}

/// The effects table. Passed into and returned from every pipeline call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Effects(pub BTreeMap<TriggerKey, Vec<Effect>>);

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<TriggerKey>, effect: Effect) -> Self {
        self.0.entry(key.into()).or_default().push(effect);
        self
    }

    pub fn get(&self, key: TriggerKey) -> &[Effect] {
        self.0.get(&key).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Fire the effects registered under `key`. Returns the synthesized
/// outcomes in firing order and the updated table.
pub fn apply_effects(
    config: &GameConfig,
    effects: &Effects,
    key: TriggerKey,
    board: &Board,
    response: Option<&ActionResponse>,
    subject: Option<PlayerId>,
) -> (Vec<ActionResponse>, Effects) {
    let Some(list) = effects.0.get(&key) else {
        return (Vec::new(), effects.clone());
    };
    let trigger = subject.unwrap_or(board.current_player);
    let mut scratch = board.clone();
    let mut out = Vec::new();
    let mut kept = Vec::with_capacity(list.len());

    for (index, effect) in list.iter().enumerate() {
        let ready = effect.listens_to(trigger)
            && effect
                .conditions
                .iter()
                .all(|c| c.holds(&scratch, response, trigger));
        if !ready {
            kept.push(effect.clone());
            continue;
        }
        match effect.fire(config, &scratch, trigger) {
            Ok((outcomes, next)) => {
                debug!(%key, index, outcomes = outcomes.len(), "effect fired");
                scratch = next;
                out.extend(outcomes);
                match effect.occurrence {
                    Occurrence::Once => {}
                    Occurrence::OncePerPlayer => {
                        let mut fired = effect.clone();
                        fired.fired_for.insert(trigger);
                        kept.push(fired);
                    }
                    Occurrence::Every => kept.push(effect.clone()),
                }
            }
            Err(rejection) => {
                debug!(%key, index, %rejection, "effect discarded");
                kept.push(effect.clone());
            }
        }
    }

    let mut table = effects.clone();
    if kept.is_empty() {
        table.0.remove(&key);
    } else {
        table.0.insert(key, kept);
    }
    (out, table)
}
