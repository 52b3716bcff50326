// Objective (win condition) definitions.
//
// An `Objective` is pure data attached to the board at configuration time.
// Its `completed` set is only ever changed by outcomes produced by the
// objective tracker (`tracker.rs`): `OptionalObjective` adds a player to an
// optional objective, `GameEnd` stores the final snapshot of the mandatory
// one that decided the match.
//
// See also: `tracker.rs` for evaluation, `board.rs` for the objective table.

use crate::types::{PlayerId, Reward, Vector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What has to happen for the objective to complete.
///
/// Amount criteria compare a team-wide running total against `amount`.
/// Label criteria look at the entities carrying one of `label`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criteria {
    /// Last team standing. Never completes on its own.
    Default,
    /// Capture `amount` buildings.
    CaptureAmount,
    /// Own every building carrying one of the labels (at least `amount` if set).
    CaptureLabel,
    /// Destroy `amount` buildings.
    DestroyAmount,
    /// Destroy every opposing building carrying one of the labels.
    DestroyLabel,
    /// Destroy `amount` units.
    DefeatAmount,
    /// Destroy every opposing unit carrying one of the labels.
    DefeatLabel,
    /// Bring `amount` units onto the target vectors.
    EscortAmount,
    /// Bring every own unit carrying one of the labels onto the target vectors.
    EscortLabel,
    /// Rescue `amount` units.
    RescueAmount,
    /// Rescue every unit carrying one of the labels.
    RescueLabel,
    /// Still be in the match when round `rounds` begins.
    Survival,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub criteria: Criteria,
    /// Players who can complete this objective. Empty means everyone.
    #[serde(default)]
    pub players: BTreeSet<PlayerId>,
    #[serde(default)]
    pub label: BTreeSet<u8>,
    #[serde(default)]
    pub amount: Option<u16>,
    #[serde(default)]
    pub rounds: Option<u16>,
    /// Escort destinations.
    #[serde(default)]
    pub vectors: BTreeSet<Vector>,
    #[serde(default)]
    pub completed: BTreeSet<PlayerId>,
    /// Optional objectives never end the match.
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub reward: Option<Reward>,
}

impl Objective {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria,
            players: BTreeSet::new(),
            label: BTreeSet::new(),
            amount: None,
            rounds: None,
            vectors: BTreeSet::new(),
            completed: BTreeSet::new(),
            optional: false,
            reward: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_amount(mut self, amount: u16) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_rounds(mut self, rounds: u16) -> Self {
        self.rounds = Some(rounds);
        self
    }

    pub fn with_label(mut self, label: u8) -> Self {
        self.label.insert(label);
        self
    }

    pub fn with_vector(mut self, vector: Vector) -> Self {
        self.vectors.insert(vector);
        self
    }

    pub fn with_player(mut self, player: PlayerId) -> Self {
        self.players.insert(player);
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Can `player` still complete this objective?
    pub fn is_open_for(&self, player: PlayerId) -> bool {
        self.criteria != Criteria::Default
            && (self.players.is_empty() || self.players.contains(&player))
            && !self.completed.contains(&player)
    }

    pub fn matches_label(&self, label: Option<u8>) -> bool {
        label.is_some_and(|l| self.label.contains(&l))
    }
}
