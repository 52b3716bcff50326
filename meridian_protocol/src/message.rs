// Protocol messages between a match server and its clients.
//
// - `ClientMessage`: handshake, intents, leaving.
// - `ServerMessage`: handshake answer, per-intent rejections, per-viewer
//   traces, departures, the final result.
//
// Intents and traces travel as opaque byte payloads. The client serializes a
// sim `Intent` before sending; the server sends each client the bytes of its
// own `EncodedTrace`, never anyone else's. The protocol crate never looks
// inside either.

use serde::{Deserialize, Serialize};

use crate::types::{ActionSequence, Seat, TurnNumber};

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join a match (handshake). `rules_hash` must match the server's.
    Hello {
        protocol_version: u32,
        player_name: String,
        rules_hash: u64,
    },
    /// A serialized intent.
    Intent {
        sequence: ActionSequence,
        payload: Vec<u8>,
    },
    /// Leaving gracefully.
    Goodbye,
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Handshake accepted. `board` is the client's redacted starting board.
    Welcome {
        seat: Seat,
        players: Vec<SeatInfo>,
        board: Vec<u8>,
    },
    /// Handshake rejected.
    Rejected { reason: String },
    /// The intent with this sequence number was illegal. Nothing changed.
    IntentRejected {
        sequence: ActionSequence,
        reason: String,
    },
    /// One resolution chain, encoded for this client only.
    Trace { turn: TurnNumber, payload: Vec<u8> },
    PlayerLeft { seat: Seat, name: String },
    /// The match is over. `winner` is the winning team, if any.
    GameOver { winner: Option<u8> },
}

/// Public identity of a seated player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub seat: Seat,
    pub name: String,
}
