// Identifier newtypes shared by both message directions.
//
// `Seat` is the sim's player id as carried on the wire; the protocol crate
// does not depend on the sim, so it keeps its own copy of the number.

use serde::{Deserialize, Serialize};

/// A player's seat in the match (the sim's `PlayerId`). Zero is never
/// assigned to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seat(pub u8);

/// Count of resolution chains the server has broadcast, starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnNumber(pub u64);

/// Per-client monotonic intent counter, echoed back on rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionSequence(pub u64);
