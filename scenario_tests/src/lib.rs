// Test-only match harness for end-to-end scenario tests.
//
// Wraps a real server-side `Game` (from `meridian_sim::game`) and one
// `TestClient` per seated player, and drives the full pipeline the way a
// networked match would:
// intent → client frame → server decode → resolution chain → per-viewer
// encode → server frame → client decode → apply_encoded → client board.
//
// Every message crosses the real `meridian_protocol` framing and every
// trace goes through the real encoder and decoder. The only test-specific
// code is that the "wire" is an in-memory byte buffer handed straight from
// one side to the other.
//
// After each step `assert_in_sync` checks that every client board equals
// the server board redacted for that client, and `assert_invariants` runs
// the structural checks over the server history.
//
// See also: `tests/full_pipeline.rs` for scenarios, `tests/properties.rs`
// for generated matches.

use std::collections::BTreeMap;

use meridian_protocol::{
    ActionSequence, ClientMessage, PROTOCOL_VERSION, Seat, SeatInfo, ServerMessage, TurnNumber,
    decode_client, decode_server, encode_client, encode_server, rules_hash,
};
use meridian_sim::automated::AutomatedPlayer;
use meridian_sim::board::Board;
use meridian_sim::config::GameConfig;
use meridian_sim::effects::Effects;
use meridian_sim::encoder::{apply_encoded, decode_trace, serialize_trace};
use meridian_sim::error::Rejection;
use meridian_sim::game::{Game, Step};
use meridian_sim::intent::Intent;
use meridian_sim::invariants::{check_board, check_trace};
use meridian_sim::types::PlayerId;

/// One seated player's side of the connection.
pub struct TestClient {
    pub seat: Seat,
    pub player: PlayerId,
    /// The board this client has rebuilt from its own traces.
    pub board: Board,
    /// Every non-trace message received, in order.
    pub inbox: Vec<ServerMessage>,
    next_sequence: u64,
}

impl TestClient {
    /// Handle one framed server message.
    fn receive(&mut self, config: &GameConfig, wire: &[u8]) {
        let msg = decode_server(wire).expect("server frame failed to decode");
        match msg {
            ServerMessage::Trace { payload, .. } => {
                let trace = decode_trace(&payload).expect("trace payload failed to decode");
                self.board = apply_encoded(config, &self.board, &trace);
            }
            ServerMessage::Welcome { board, .. } => {
                self.board = serde_json::from_slice(&board).expect("welcome board failed to decode");
            }
            other => self.inbox.push(other),
        }
    }

    fn frame_intent(&mut self, intent: &Intent) -> Vec<u8> {
        let sequence = ActionSequence(self.next_sequence);
        self.next_sequence += 1;
        let payload = serde_json::to_vec(intent).expect("serialize Intent failed");
        encode_client(&ClientMessage::Intent { sequence, payload }).expect("frame Intent failed")
    }
}

/// A server-side match with its connected clients.
pub struct TestMatch {
    pub game: Game,
    pub clients: BTreeMap<PlayerId, TestClient>,
    /// Every step committed by the server, in order.
    pub steps: Vec<Step>,
}

impl TestMatch {
    /// Seat every player on `board` and hand each one its starting view.
    pub fn new(config: GameConfig, board: Board, effects: Effects) -> Self {
        let game = Game::new(config, board, effects);
        let mut this = Self {
            game,
            clients: BTreeMap::new(),
            steps: Vec::new(),
        };
        let players: Vec<PlayerId> = this.game.board.players.keys().copied().collect();
        let client_config = this.game.config.clone();
        for player in players {
            let reply = this.hello(&client_config, player);
            let mut client = TestClient {
                seat: Seat(player.0),
                player,
                board: Board::new(this.game.board.size),
                inbox: Vec::new(),
                next_sequence: 0,
            };
            client.receive(&client_config, &reply);
            assert!(client.inbox.is_empty(), "handshake rejected: {:?}", client.inbox);
            this.clients.insert(player, client);
        }
        this
    }

    /// Run the handshake for `player` with a client holding
    /// `client_config`. Returns the server's framed reply.
    pub fn hello(&self, client_config: &GameConfig, player: PlayerId) -> Vec<u8> {
        let client_rules = client_config.to_json().expect("serialize client config failed");
        let hello = encode_client(&ClientMessage::Hello {
            protocol_version: PROTOCOL_VERSION,
            player_name: format!("player-{}", player.0),
            rules_hash: rules_hash(client_rules.as_bytes()),
        })
        .expect("frame Hello failed");

        let server_rules = self.game.config.to_json().expect("serialize server config failed");
        let reply = match decode_client(&hello).expect("Hello failed to decode") {
            ClientMessage::Hello {
                protocol_version,
                rules_hash: hash,
                ..
            } if protocol_version == PROTOCOL_VERSION && hash == rules_hash(server_rules.as_bytes()) => {
                ServerMessage::Welcome {
                    seat: Seat(player.0),
                    players: self.roster(),
                    board: serde_json::to_vec(&self.view(player)).expect("serialize view failed"),
                }
            }
            _ => ServerMessage::Rejected {
                reason: "rules mismatch".into(),
            },
        };
        encode_server(&reply).expect("frame handshake reply failed")
    }

    fn roster(&self) -> Vec<SeatInfo> {
        self.game
            .board
            .players
            .keys()
            .map(|p| SeatInfo {
                seat: Seat(p.0),
                name: format!("player-{}", p.0),
            })
            .collect()
    }

    /// The server board as `player` is entitled to see it.
    pub fn view(&self, player: PlayerId) -> Board {
        self.game.view(player)
    }

    pub fn client(&self, player: PlayerId) -> &TestClient {
        &self.clients[&player]
    }

    /// Fire the match-start effects and broadcast the chain.
    pub fn start(&mut self) -> Step {
        let step = self.game.start();
        self.broadcast(&step);
        step
    }

    /// Send `intent` from `player`'s client through the wire to the server.
    /// A rejection is reported back to that client only.
    pub fn submit(&mut self, player: PlayerId, intent: &Intent) -> Result<Step, Rejection> {
        let wire = self
            .clients
            .get_mut(&player)
            .expect("no client for player")
            .frame_intent(intent);
        let (sequence, intent) = match decode_client(&wire).expect("intent frame failed to decode") {
            ClientMessage::Intent { sequence, payload } => (
                sequence,
                serde_json::from_slice::<Intent>(&payload).expect("intent payload failed to decode"),
            ),
            other => panic!("expected an Intent, got {other:?}"),
        };
        match self.game.submit(player, &intent) {
            Ok(step) => {
                self.broadcast(&step);
                Ok(step)
            }
            Err(rejection) => {
                let reply = encode_server(&ServerMessage::IntentRejected {
                    sequence,
                    reason: rejection.to_string(),
                })
                .expect("frame IntentRejected failed");
                let config = self.game.config.clone();
                if let Some(client) = self.clients.get_mut(&player) {
                    client.receive(&config, &reply);
                }
                Err(rejection)
            }
        }
    }

    /// The current player's turn timer ran out.
    pub fn miss(&mut self) -> Result<Step, Rejection> {
        let step = self.game.miss()?;
        self.broadcast(&step);
        Ok(step)
    }

    /// Let `ai` play the current player's turn.
    pub fn run_automated(&mut self, ai: &mut dyn AutomatedPlayer) -> Result<Step, Rejection> {
        let step = self.game.run_automated(ai)?;
        self.broadcast(&step);
        Ok(step)
    }

    /// Encode `step` for every client, frame it and deliver it.
    fn broadcast(&mut self, step: &Step) {
        let turn = TurnNumber(self.steps.len() as u64);
        let config = &self.game.config;
        let over = self.game.is_over().then(|| ServerMessage::GameOver {
            winner: self.game.winner().map(|team| team.0),
        });
        for (player, client) in self.clients.iter_mut() {
            let encoded = step.encode_for(config, *player);
            let payload = serialize_trace(&encoded).expect("serialize trace failed");
            let wire = encode_server(&ServerMessage::Trace { turn, payload }).expect("frame Trace failed");
            client.receive(config, &wire);
            if let Some(msg) = &over {
                let wire = encode_server(msg).expect("frame GameOver failed");
                client.receive(config, &wire);
            }
        }
        self.steps.push(step.clone());
    }

    /// Every client board equals the server board redacted for it.
    pub fn assert_in_sync(&self) {
        for (player, client) in &self.clients {
            assert_eq!(
                client.board,
                self.view(*player),
                "client board for {player:?} diverged from its view of the server"
            );
        }
    }

    /// The server board and the whole history satisfy the structural checks.
    pub fn assert_invariants(&self) {
        let board = check_board(&self.game.config, &self.game.board);
        assert!(board.is_empty(), "board invariants violated: {board:?}");
        let history = check_trace(&self.game.initial, &self.game.history);
        assert!(history.is_empty(), "history invariants violated: {history:?}");
    }
}
