// Length-delimited message framing.
//
// Wire format: a 4-byte big-endian length prefix followed by the payload.
// `write_frame` / `read_frame` move raw bytes over any `Write` / `Read`;
// `send` / `receive` add JSON serialization of a message on top.
//
// `MAX_MESSAGE_SIZE` (16 MB) bounds the allocation a length prefix can ask
// for. Welcome messages carrying a full starting board are the largest
// expected frames.

use std::io::{Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ProtocolError;

pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Write a length-delimited frame.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError> {
    let len = payload.len();
    let len = u32::try_from(len)
        .ok()
        .filter(|&len| len <= MAX_MESSAGE_SIZE)
        .ok_or(ProtocolError::TooLarge {
            len,
            max: MAX_MESSAGE_SIZE,
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-delimited frame.
///
/// A stream that closes before or inside a frame yields an `Io` error of
/// kind `UnexpectedEof`.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge {
            len: len as usize,
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` as JSON and write it as one frame.
pub fn send<W: Write, M: Serialize>(writer: &mut W, msg: &M) -> Result<(), ProtocolError> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)
}

/// Read one frame and deserialize it.
pub fn receive<R: Read, M: DeserializeOwned>(reader: &mut R) -> Result<M, ProtocolError> {
    let frame = read_frame(reader)?;
    Ok(serde_json::from_slice(&frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};

    #[test]
    fn frames_survive_a_stream() {
        let messages: Vec<&[u8]> = vec![b"first", b"", b"third"];
        let mut buf = Vec::new();
        for msg in &messages {
            write_frame(&mut buf, msg).unwrap();
        }
        let mut cursor = Cursor::new(&buf);
        for expected in &messages {
            assert_eq!(read_frame(&mut cursor).unwrap(), *expected);
        }
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_MESSAGE_SIZE as usize + 1];
        let err = write_frame(&mut Vec::new(), &big).unwrap_err();
        assert!(matches!(err, ProtocolError::TooLarge { .. }));
    }

    #[test]
    fn rejects_oversized_read() {
        let fake_len = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        let err = read_frame(&mut Cursor::new(fake_len.to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::TooLarge { max: MAX_MESSAGE_SIZE, .. }));
    }

    #[test]
    fn truncated_prefix_is_unexpected_eof() {
        let err = read_frame(&mut Cursor::new(vec![0u8, 1])).unwrap_err();
        match err {
            ProtocolError::Io(e) => assert_eq!(e.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_payload_is_malformed() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{nope").unwrap();
        let err = receive::<_, Vec<u8>>(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }
}
