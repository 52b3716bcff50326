// meridian_protocol — wire protocol between a match server and its clients.
//
// The server runs the authoritative simulation; clients submit intents and
// receive only their own fog-filtered trace of each resolution chain. This
// crate defines the messages, the framing and the handshake check. It has
// no dependency on the sim crate.
//
// Module overview:
// - `types.rs`:    Identifier newtypes — `Seat`, `TurnNumber`, `ActionSequence`.
// - `message.rs`:  `ClientMessage` and `ServerMessage`, plus `SeatInfo`.
// - `framing.rs`:  4-byte big-endian length prefix, then JSON payload.
// - `error.rs`:    `ProtocolError`.
//
// Design decisions:
// - **JSON serialization**, matching the sim's serde_json usage.
// - **Payloads as opaque `Vec<u8>`.** Intents and encoded traces are
//   serialized by the sim side; the protocol never inspects them.
// - **No async runtime.** Framing works on any `std::io::Read`/`Write`.
// - **Rules check at handshake.** Clients replay outcomes locally, so they
//   must share the server's rule tables byte for byte; `rules_hash` of the
//   serialized config is compared in `Hello`.

pub mod error;
pub mod framing;
pub mod message;
pub mod types;

pub use error::ProtocolError;
pub use framing::{MAX_MESSAGE_SIZE, read_frame, receive, send, write_frame};
pub use message::{ClientMessage, SeatInfo, ServerMessage};
pub use types::{ActionSequence, Seat, TurnNumber};

pub const PROTOCOL_VERSION: u32 = 1;

/// FNV-1a over the serialized rule tables. Stable across platforms and runs.
pub fn rules_hash(config_bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    config_bytes
        .iter()
        .fold(OFFSET, |hash, &byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

/// Frame a client message into bytes ready for the wire.
pub fn encode_client(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::new();
    send(&mut out, msg)?;
    Ok(out)
}

/// Read one framed client message from `bytes`.
pub fn decode_client(bytes: &[u8]) -> Result<ClientMessage, ProtocolError> {
    receive(&mut &bytes[..])
}

/// Frame a server message into bytes ready for the wire.
pub fn encode_server(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::new();
    send(&mut out, msg)?;
    Ok(out)
}

/// Read one framed server message from `bytes`.
pub fn decode_server(bytes: &[u8]) -> Result<ServerMessage, ProtocolError> {
    receive(&mut &bytes[..])
}
