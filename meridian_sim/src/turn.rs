// Turn Sequencer: whose turn it is, and what ending a turn does.
//
// Turn order is ascending `PlayerId` among active players. When the last
// player in that order ends their turn the round counter increases and
// play wraps to the first active player. Ending a turn clears the
// outgoing player's active powers, credits the incoming player with the
// income of every building they own, and refreshes the incoming player's
// units and buildings (all of that happens in `apply.rs`; this module
// only computes the `EndTurn` outcome).
//
// Begin-turn checks (a player with nothing left is eliminated, a player
// with no units triggers `BeginTurnNoUnits` effects) and missed-turn
// handling are sequenced by `game.rs` using `has_presence` and `end_turn`.
//
// See also: `game.rs`, `apply.rs` (`EndTurn` application).

use crate::board::Board;
use crate::config::GameConfig;
use crate::response::ActionResponse;
use crate::types::PlayerId;
use serde::{Deserialize, Serialize};

/// Where the match stands between actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    Active(PlayerId),
    RoundAdvance { round: u16 },
    Eliminated(PlayerId),
    Ended,
}

pub fn state(board: &Board) -> TurnState {
    if board.ended {
        TurnState::Ended
    } else {
        TurnState::Active(board.current_player)
    }
}

/// The state change `response` causes, if any.
pub fn transitions(before: &Board, response: &ActionResponse) -> Option<TurnState> {
    if let Some(player) = response.eliminated_player() {
        return Some(TurnState::Eliminated(player));
    }
    match response {
        ActionResponse::EndTurn { next, round, .. } => Some(if *round > before.round {
            TurnState::RoundAdvance { round: *round }
        } else {
            TurnState::Active(*next)
        }),
        ActionResponse::GameEnd { .. } => Some(TurnState::Ended),
        _ => None,
    }
}

/// The player after `current` and the round they play in.
pub fn next_player(board: &Board, current: PlayerId) -> Option<(PlayerId, u16)> {
    let first = *board.active_players.first()?;
    Some(
        match board.active_players.iter().copied().find(|&p| p > current) {
            Some(next) => (next, board.round),
            None => (first, board.round.saturating_add(1)),
        },
    )
}

/// Funds `player` earns at the start of their turn.
pub fn income(config: &GameConfig, board: &Board, player: PlayerId) -> u32 {
    board
        .buildings_of(player)
        .filter_map(|(_, b)| config.buildings.get(&b.building_type))
        .map(|info| info.income)
        .sum()
}

/// Whether `player` can still affect the match: any unit, a headquarters,
/// or a building that produces units.
pub fn has_presence(config: &GameConfig, board: &Board, player: PlayerId) -> bool {
    board.has_units(player)
        || board.buildings_of(player).any(|(_, b)| {
            config
                .buildings
                .get(&b.building_type)
                .is_some_and(|info| info.is_headquarters || !info.produces.is_empty())
        })
}

/// The outcome of the current player ending their turn. `None` when no
/// active player remains.
pub fn end_turn(config: &GameConfig, board: &Board, miss: bool) -> Option<ActionResponse> {
    let current = board.current_player;
    let (next, round) = next_player(board, current)?;
    let funds = board
        .player(next)?
        .funds
        .saturating_add(income(config, board, next));
    Some(ActionResponse::EndTurn {
        current,
        next,
        round,
        funds,
        miss,
    })
}
