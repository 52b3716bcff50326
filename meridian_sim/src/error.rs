// Typed failures surfaced by the simulation.
//
// `Rejection` is the answer to an illegal intent: the caller gets no new
// board and decides whether to show an error (human client) or drop the
// proposal (automated player). It is serializable so a server can send it
// back verbatim.
//
// `DecodeError` covers per-viewer traces that fail to parse. These signal a
// client/server desync and are always returned to the caller, never
// swallowed.
//
// See also: `resolver.rs` (produces rejections), `encoder.rs` (produces
// decode errors), `invariants.rs` for programmer-error checks that are not
// represented here.

use crate::types::{BuildingType, PlayerId, Skill, UnitType, Vector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an intent was refused. No state change accompanies a rejection.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("the game has already ended")]
    GameOver,
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),
    #[error("unknown or eliminated player {0}")]
    UnknownPlayer(PlayerId),
    #[error("{0} is outside the board")]
    OutOfBounds(Vector),
    #[error("no unit at {0}")]
    NoUnit(Vector),
    #[error("no building at {0}")]
    NoBuilding(Vector),
    #[error("the entity at {0} belongs to someone else")]
    WrongOwner(Vector),
    #[error("the entity at {0} has already completed its turn")]
    AlreadyCompleted(Vector),
    #[error("the unit at {0} has already moved")]
    AlreadyMoved(Vector),
    #[error("the unit at {0} must change its fold state first")]
    Folded(Vector),
    #[error("{0} is occupied")]
    Occupied(Vector),
    #[error("{0} is out of range")]
    OutOfRange(Vector),
    #[error("not enough fuel to reach {0}")]
    InsufficientFuel(Vector),
    #[error("costs {cost}, only {funds} available")]
    InsufficientFunds { cost: u32, funds: u32 },
    #[error("needs {cost} charge, only {charge} available")]
    InsufficientCharge { cost: u32, charge: u32 },
    #[error("the unit at {0} has no usable weapon for that target")]
    NoWeapon(Vector),
    #[error("the path to {0} is not walkable")]
    InvalidPath(Vector),
    #[error("{0} is not a legal target")]
    IllegalTarget(Vector),
    #[error("{0} is not visible")]
    NotVisible(Vector),
    #[error("only scripted effects may issue this intent")]
    EffectOnly,
    #[error("the unit at {0} cannot do that")]
    Incapable(Vector),
    #[error("the unit cannot be loaded into the transport at {0}")]
    CannotLoad(Vector),
    #[error("the transport at {0} has no cargo in that slot")]
    NoCargo(Vector),
    #[error("player {0} does not have the skill {1:?}")]
    UnknownSkill(PlayerId, Skill),
    #[error("the power {0:?} is already active")]
    PowerActive(Skill),
    #[error("no rules for unit type {0:?}")]
    MissingUnitRules(UnitType),
    #[error("no rules for building type {0:?}")]
    MissingBuildingRules(BuildingType),
}

/// A per-viewer trace could not be read back.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed trace payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("trace version {found} is not supported (expected {expected})")]
    Version { found: u16, expected: u16 },
}
