// Resolution pipeline: one intent in, one ordered chain of outcomes out.
//
// The free functions here are the only entry points that advance a match.
// Each takes the current board and effects table by reference and returns a
// `Resolution`: the chain of `(outcome, board after it)` pairs, the final
// board, and the effects table with any consumed effects removed. The
// caller swaps both in. Nothing is stored ambiently.
//
// ## Chain order
//
// 1. The resolved outcome of the intent.
// 2. Lifecycle outcomes the Objective Tracker derives from it
//    (eliminations, optional objectives, rewards, `GameEnd`). Each one also
//    fires the effects keyed on its kind.
// 3. Outcomes synthesized by effects keyed on the intent's kind, in table
//    order. Each passes through the tracker but fires no further effects.
// 4. If the turn passed: begin-turn handling for the incoming player
//    (`BeginTurnNoUnits` effects, then `BeginTurnGameOver` and an automatic
//    `EndTurn` when they have nothing left), repeated until someone can
//    play. If the acting player was eliminated mid-chain, their turn is
//    passed on first.
//
// Effects keyed on `GameEnd` fire ahead of the closing rewards, so the
// rewards sit immediately before the `GameEnd`. Nothing is ever appended
// after a `GameEnd`.
//
// `Game` bundles a config, the initial board, the current board, the
// effects table and the full outcome history, which is enough to replay
// the match from the start or persist it as JSON. It also keeps each team's
// sightings of the other teams' statistics, which the encoder needs to
// rebuild a client's board.
//
// See also: `resolver.rs`, `effects.rs`, `tracker.rs`, `turn.rs`,
// `encoder.rs` (turns a chain into per-viewer traces), `automated.rs`.
//
// **Critical constraint: determinism.** A chain is a pure function of
// (config, board, effects, intent, player). `Game::replay` relies on it.

use crate::apply::{apply_all, apply_response};
use crate::automated::AutomatedPlayer;
use crate::board::Board;
use crate::config::GameConfig;
use crate::effects::{Effects, TriggerKey, apply_effects};
use crate::encoder::{self, EncodedTrace, encode_trace};
use crate::error::Rejection;
use crate::intent::Intent;
use crate::resolver::{Origin, validate};
use crate::response::{ActionKind, ActionResponse};
use crate::tracker::{self, Transition};
use crate::turn::{self, TurnState};
use crate::types::{PlayerId, TeamId};
use crate::vision::{Sightings, Vision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, trace};

/// One outcome and the board it produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub response: ActionResponse,
    pub board: Board,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub trace: Vec<TraceEntry>,
    pub board: Board,
    pub effects: Effects,
}

impl Resolution {
    pub fn responses(&self) -> impl Iterator<Item = &ActionResponse> {
        self.trace.iter().map(|entry| &entry.response)
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve a player's intent and everything it sets off.
pub fn execute(
    config: &GameConfig,
    board: &Board,
    effects: &Effects,
    intent: &Intent,
    player: PlayerId,
) -> Result<Resolution, Rejection> {
    let response = validate(config, board, intent, player, Origin::Player)?;
    let mut chain = Chain::new(config, board, effects);
    chain.act(response);
    Ok(chain.finish())
}

/// Open a match: `Start` effects, then begin-turn handling for the first
/// player.
pub fn start(config: &GameConfig, board: &Board, effects: &Effects) -> Resolution {
    let mut chain = Chain::new(config, board, effects);
    for response in chain.fire(TriggerKey::Start, None, None) {
        chain.synthesized(response);
    }
    chain.begin_turn();
    chain.finish()
}

/// The current player ran out of time. Reaching the miss limit eliminates
/// them; the match goes on for everyone else.
pub fn miss_turn(config: &GameConfig, board: &Board, effects: &Effects) -> Result<Resolution, Rejection> {
    if board.ended {
        return Err(Rejection::GameOver);
    }
    let player = board.current_player;
    let end = turn::end_turn(config, board, true).ok_or(Rejection::UnknownPlayer(player))?;
    let mut chain = Chain::new(config, board, effects);
    chain.append(end);
    let missed_out = chain
        .board
        .player(player)
        .is_some_and(|p| !p.eliminated && p.misses >= config.max_misses);
    if missed_out {
        chain.eliminate(ActionResponse::PreviousTurnGameOver { player });
    }
    chain.begin_turn();
    Ok(chain.finish())
}

/// Let `ai` play the current player's turn. It sees only the redacted
/// board; its intents go through the same validation as a client's.
/// Rejected proposals are dropped. The turn is ended for it if it did not
/// end it itself.
pub fn play_automated_turn(
    config: &GameConfig,
    board: &Board,
    effects: &Effects,
    ai: &mut dyn AutomatedPlayer,
) -> Result<Resolution, Rejection> {
    if board.ended {
        return Err(Rejection::GameOver);
    }
    let player = board.current_player;
    let view = Vision::compute(config, board, player).redact_board(board);
    let intents = ai.decide(config, &view, player);

    let mut chain = Chain::new(config, board, effects);
    for intent in &intents {
        if chain.board.ended || chain.board.current_player != player {
            break;
        }
        match validate(config, &chain.board, intent, player, Origin::Player) {
            Ok(response) => chain.act(response),
            Err(rejection) => debug!(%player, %rejection, ?intent, "automated proposal rejected"),
        }
    }
    if !chain.board.ended && chain.board.current_player == player {
        if let Some(end) = turn::end_turn(config, &chain.board, false) {
            chain.act(end);
        }
    }
    Ok(chain.finish())
}

// ---------------------------------------------------------------------------
// Chain builder
// ---------------------------------------------------------------------------

struct Chain<'a> {
    config: &'a GameConfig,
    start: Board,
    board: Board,
    effects: Effects,
    trace: Vec<TraceEntry>,
}

impl<'a> Chain<'a> {
    fn new(config: &'a GameConfig, board: &Board, effects: &Effects) -> Self {
        Self {
            config,
            start: board.clone(),
            board: board.clone(),
            effects: effects.clone(),
            trace: Vec::new(),
        }
    }

    fn finish(self) -> Resolution {
        Resolution {
            trace: self.trace,
            board: self.board,
            effects: self.effects,
        }
    }

    fn before(&self, index: usize) -> &Board {
        match index.checked_sub(1) {
            Some(prev) => &self.trace[prev].board,
            None => &self.start,
        }
    }

    /// Append one outcome. Returns its index, or `None` once the match is over.
    fn push(&mut self, response: ActionResponse) -> Option<usize> {
        if self.board.ended {
            return None;
        }
        let next = apply_response(self.config, &self.board, &response);
        trace!(kind = %response.kind(), actor = ?response.actor(&self.board), "outcome");
        if let Some(state) = turn::transitions(&self.board, &response) {
            debug!(?state, "turn state changed");
        }
        if let Some(player) = response.eliminated_player() {
            info!(%player, kind = %response.kind(), "player eliminated");
        }
        self.board = next;
        self.trace.push(TraceEntry {
            response,
            board: self.board.clone(),
        });

        #[cfg(debug_assertions)]
        {
            let violations = crate::invariants::check_invariants(
                self.config,
                &self.start,
                self.trace.iter().map(|entry| &entry.response),
                &self.board,
            );
            debug_assert!(violations.is_empty(), "invariants violated: {violations:?}");
        }

        Some(self.trace.len() - 1)
    }

    fn fire(&mut self, key: TriggerKey, response: Option<&ActionResponse>, subject: Option<PlayerId>) -> Vec<ActionResponse> {
        if self.board.ended || self.effects.is_empty() {
            return Vec::new();
        }
        let (out, table) = apply_effects(self.config, &self.effects, key, &self.board, response, subject);
        self.effects = table;
        out
    }

    /// Run the tracker over the transition into entry `index`.
    fn settle(&mut self, index: usize) {
        if self.board.ended {
            return;
        }
        let transition = Transition {
            before: self.before(index),
            response: &self.trace[index].response,
            after: &self.trace[index].board,
        };
        let mut lifecycle = tracker::check(self.config, transition);
        let closing = lifecycle.iter().position(ActionResponse::is_game_end).map(|end| {
            lifecycle[..end]
                .iter()
                .rposition(|r| !matches!(r, ActionResponse::ReceiveReward { .. }))
                .map_or(0, |last| last + 1)
        });
        let closing = closing.map(|at| lifecycle.split_off(at));
        for response in lifecycle {
            self.lifecycle(response);
        }
        if let Some(closing) = closing {
            self.close(closing);
        }
    }

    /// The winners' rewards and the `GameEnd`, preceded by the effects
    /// keyed on `GameEnd`.
    fn close(&mut self, closing: Vec<ActionResponse>) {
        if let Some(end) = closing.last() {
            for extra in self.fire(TriggerKey::Action(ActionKind::GameEnd), Some(end), None) {
                self.push(extra);
            }
        }
        for response in closing {
            if response.is_game_end() {
                self.push(response);
            } else {
                self.lifecycle(response);
            }
        }
    }

    /// A tracker-produced outcome: append it and fire its effects.
    fn lifecycle(&mut self, response: ActionResponse) {
        let subject = response.subject(&self.board);
        let key = TriggerKey::from(response.kind());
        if self.push(response.clone()).is_none() {
            return;
        }
        for extra in self.fire(key, Some(&response), subject) {
            self.synthesized(extra);
        }
    }

    /// An outcome produced by an effect: tracked, but fires no effects.
    fn synthesized(&mut self, response: ActionResponse) {
        if let Some(index) = self.push(response) {
            self.settle(index);
        }
    }

    /// An outcome produced by the sequencer.
    fn append(&mut self, response: ActionResponse) {
        if let Some(index) = self.push(response) {
            self.settle(index);
        }
    }

    /// A sequencer elimination: effects keyed on it fire, then the tracker
    /// checks whether the match is decided.
    fn eliminate(&mut self, response: ActionResponse) {
        let subject = response.subject(&self.board);
        let key = TriggerKey::from(response.kind());
        let Some(index) = self.push(response.clone()) else {
            return;
        };
        for extra in self.fire(key, Some(&response), subject) {
            self.synthesized(extra);
        }
        self.settle(index);
    }

    /// The outcome of an intent, with its tracker and effect follow-ups.
    fn act(&mut self, response: ActionResponse) {
        let current = self.board.current_player;
        let subject = response.subject(&self.board);
        let key = TriggerKey::from(response.kind());
        let Some(index) = self.push(response.clone()) else {
            return;
        };
        self.settle(index);
        for extra in self.fire(key, Some(&response), subject) {
            self.synthesized(extra);
        }

        if self.board.ended {
            return;
        }
        if self.board.current_player != current {
            self.begin_turn();
        } else if !self.board.is_active(current) {
            self.pass_turn();
            self.begin_turn();
        }
    }

    fn pass_turn(&mut self) {
        if self.board.ended {
            return;
        }
        if let Some(end) = turn::end_turn(self.config, &self.board, false) {
            self.append(end);
        }
    }

    /// Start-of-turn checks for the current player, repeated while players
    /// with nothing left are removed.
    fn begin_turn(&mut self) {
        for _ in 0..=self.board.players.len() {
            if self.board.ended || self.board.active_players.is_empty() {
                return;
            }
            let player = self.board.current_player;
            if !self.board.has_units(player) {
                for response in self.fire(TriggerKey::BeginTurnNoUnits, None, Some(player)) {
                    self.synthesized(response);
                }
                if self.board.ended {
                    return;
                }
            }
            if turn::has_presence(self.config, &self.board, player) {
                return;
            }
            self.eliminate(ActionResponse::BeginTurnGameOver { player });
            self.pass_turn();
        }
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// A chain together with the board it started from, ready to be encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub start: Board,
    pub trace: Vec<TraceEntry>,
    /// Each team's sightings when the chain started.
    pub sightings: BTreeMap<TeamId, Sightings>,
}

impl Step {
    pub fn encode_for(&self, config: &GameConfig, viewer: PlayerId) -> EncodedTrace {
        encode_trace(config, &self.start, &self.trace, viewer, &self.seen_by(viewer))
    }

    fn seen_by(&self, viewer: PlayerId) -> Sightings {
        self.start
            .team_of(viewer)
            .and_then(|team| self.sightings.get(&team))
            .cloned()
            .unwrap_or_default()
    }

    /// Each team's sightings once the chain is over. Teammates share
    /// vision, so one member stands for the team.
    pub fn observe(&self, config: &GameConfig) -> BTreeMap<TeamId, Sightings> {
        let mut out = BTreeMap::new();
        for player in self.start.players.values() {
            if out.contains_key(&player.team) {
                continue;
            }
            let seen = encoder::observe(config, &self.start, &self.trace, player.id, &self.seen_by(player.id));
            out.insert(player.team, seen);
        }
        out
    }

    pub fn responses(&self) -> impl Iterator<Item = &ActionResponse> {
        self.trace.iter().map(|entry| &entry.response)
    }
}

/// A match in progress, as the server holds it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub config: GameConfig,
    pub initial: Board,
    pub board: Board,
    pub effects: Effects,
    /// Every outcome since `initial`, in order.
    pub history: Vec<ActionResponse>,
    #[serde(default)]
    pub sightings: BTreeMap<TeamId, Sightings>,
}

impl Game {
    pub fn new(config: GameConfig, board: Board, effects: Effects) -> Self {
        Self {
            config,
            initial: board.clone(),
            board,
            effects,
            history: Vec::new(),
            sightings: BTreeMap::new(),
        }
    }

    pub fn is_over(&self) -> bool {
        self.board.ended
    }

    pub fn winner(&self) -> Option<TeamId> {
        self.board.winner
    }

    pub fn turn_state(&self) -> TurnState {
        turn::state(&self.board)
    }

    /// The current board as `viewer`'s client holds it.
    pub fn view(&self, viewer: PlayerId) -> Board {
        let seen = self
            .board
            .team_of(viewer)
            .and_then(|team| self.sightings.get(&team))
            .cloned()
            .unwrap_or_default();
        Vision::compute(&self.config, &self.board, viewer).redact_board_with(&self.board, &seen)
    }

    fn commit(&mut self, resolution: Resolution) -> Step {
        let start = std::mem::replace(&mut self.board, resolution.board);
        self.effects = resolution.effects;
        self.history
            .extend(resolution.trace.iter().map(|entry| entry.response.clone()));
        let step = Step {
            start,
            trace: resolution.trace,
            sightings: self.sightings.clone(),
        };
        self.sightings = step.observe(&self.config);
        step
    }

    pub fn start(&mut self) -> Step {
        let resolution = start(&self.config, &self.board, &self.effects);
        self.commit(resolution)
    }

    pub fn submit(&mut self, player: PlayerId, intent: &Intent) -> Result<Step, Rejection> {
        let resolution = execute(&self.config, &self.board, &self.effects, intent, player)?;
        Ok(self.commit(resolution))
    }

    pub fn miss(&mut self) -> Result<Step, Rejection> {
        let resolution = miss_turn(&self.config, &self.board, &self.effects)?;
        Ok(self.commit(resolution))
    }

    pub fn run_automated(&mut self, ai: &mut dyn AutomatedPlayer) -> Result<Step, Rejection> {
        let resolution = play_automated_turn(&self.config, &self.board, &self.effects, ai)?;
        Ok(self.commit(resolution))
    }

    /// Rebuild the current board from the initial one and the history.
    pub fn replay(&self) -> Board {
        apply_all(&self.config, &self.initial, &self.history)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
