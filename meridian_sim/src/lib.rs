// meridian_sim — the authoritative simulation core of Meridian.
//
// This crate turns intents into ordered, replayable chains of outcomes
// against immutable board snapshots, and derives the fog-safe view of each
// chain for every player. It has no I/O, no clock and no transport; the
// protocol crate and whatever server hosts a match sit outside it.
//
// Module overview:
// - `types.rs`:       Vector, Size, ids, unit/building/tile/skill enums.
// - `config.rs`:      GameConfig — unit, building, tile and skill tables plus scalar rules.
// - `unit.rs`, `building.rs`, `player.rs`, `objective.rs`: entity values.
// - `board.rs`:       Board — the immutable snapshot every component reads.
// - `intent.rs`:      Intent — what a player, AI or effect asks for.
// - `response.rs`:    ActionResponse — resolved outcomes, including Hidden* forms.
// - `error.rs`:       Rejection and DecodeError.
// - `pathfinding.rs`: Dijkstra over movement and vision costs.
// - `combat.rs`:      Damage and charge arithmetic.
// - `resolver.rs`:    Action Resolver — validates an intent into an outcome.
// - `apply.rs`:       Applies an outcome to a board; replay is a fold over it.
// - `vision.rs`:      Fog of war and board redaction.
// - `encoder.rs`:     Trace Encoder — per-viewer traces and their wire form.
// - `effects.rs`:     Effects Engine — scripted reactions keyed by trigger.
// - `tracker.rs`:     Objective Tracker — eliminations, objectives, rewards, GameEnd.
// - `turn.rs`:        Turn Sequencer — turn order, income, presence.
// - `automated.rs`:   AutomatedPlayer trait and the reference GreedyPlayer.
// - `game.rs`:        The resolution pipeline and the `Game` wrapper.
// - `invariants.rs`:  Structural checks run in debug builds and tests.
// - `prng`:           Re-exported from `meridian_prng` — xoshiro256++ with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Every entry point is a pure
// function of its arguments. All randomness comes from a seeded `MatchRng`.
// No `HashMap`, no system time, no OS entropy. Use `BTreeMap` for ordered
// collections.

pub mod apply;
pub mod automated;
pub mod board;
pub mod building;
pub mod combat;
pub mod config;
pub mod effects;
pub mod encoder;
pub mod error;
pub mod game;
pub mod intent;
pub mod invariants;
pub mod objective;
pub mod pathfinding;
pub mod player;
pub use meridian_prng as prng;
pub mod resolver;
pub mod response;
pub mod tracker;
pub mod turn;
pub mod types;
pub mod unit;
pub mod vision;
