// Failures while moving protocol messages.
//
// None of these are recoverable at the protocol level: the caller drops the
// connection or reports a desync.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: u32 },
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}
