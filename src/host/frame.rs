//! Length-prefixed JSON framing.
//!
//! ```text
//! frame := len (u32, little-endian) || payload (len bytes of UTF-8 JSON object)
//! ```
//!
//! Pipes deliver bytes in whatever fragments they like, so every read here is
//! driven by the number of bytes the frame still needs, never by how much a
//! single `read` call happened to return.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FrameError;

/// A decoded message: always a JSON object.
pub type Message = Map<String, Value>;

/// Host -> browser limit enforced by Chromium-family browsers (1 MiB).
pub const MAX_TO_BROWSER: usize = 1_048_576;

/// Browser -> host limit documented by Chrome (64 MiB).
pub const MAX_FROM_BROWSER: usize = 64 * 1_048_576;

const PREFIX_LEN: usize = 4;

// Upper bound on the up-front allocation for a payload; the rest grows as
// bytes actually arrive.
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// Read into `buf` until it is full or the stream reports EOF.
/// Returns how many bytes were filled.
fn fill<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read the 4-byte prefix. `None` means EOF before the first byte.
fn read_len<R: Read + ?Sized>(reader: &mut R) -> Result<Option<usize>, FrameError> {
    let mut prefix = [0u8; PREFIX_LEN];
    match fill(reader, &mut prefix)? {
        0 => Ok(None),
        PREFIX_LEN => Ok(Some(u32::from_le_bytes(prefix) as usize)),
        received => Err(FrameError::UnexpectedEof {
            stage: "length prefix",
            expected: PREFIX_LEN,
            received,
        }),
    }
}

/// Read one raw payload as UTF-8 text without parsing it.
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary. `max_len`, when set,
/// is checked against the declared length before any payload byte is read.
pub fn read_payload<R: Read + ?Sized>(
    reader: &mut R,
    max_len: Option<usize>,
) -> Result<Option<String>, FrameError> {
    let Some(len) = read_len(reader)? else {
        return Ok(None);
    };
    if let Some(max) = max_len {
        if len > max {
            return Err(FrameError::TooLarge { len, max });
        }
    }

    let mut buf = Vec::with_capacity(len.min(INITIAL_PAYLOAD_CAPACITY));
    reader.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(FrameError::UnexpectedEof {
            stage: "payload",
            expected: len,
            received: buf.len(),
        });
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|e| FrameError::InvalidPayload(format!("payload is not valid UTF-8: {e}")))
}

/// Parse payload text into a [`Message`]. Anything other than a JSON object
/// is rejected.
pub fn parse_message(text: &str) -> Result<Message, FrameError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::InvalidPayload(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(FrameError::InvalidPayload(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Read exactly one message.
///
/// - `Ok(Some(msg))`: one fully decoded JSON object.
/// - `Ok(None)`: the stream ended cleanly before a new frame started.
/// - `Err(_)`: EOF inside a frame, undecodable payload, or transport failure.
pub fn read_message<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Message>, FrameError> {
    read_message_capped(reader, None)
}

/// [`read_message`] with an optional cap on the declared payload length.
pub fn read_message_capped<R: Read + ?Sized>(
    reader: &mut R,
    max_len: Option<usize>,
) -> Result<Option<Message>, FrameError> {
    match read_payload(reader, max_len)? {
        Some(text) => parse_message(&text).map(Some),
        None => Ok(None),
    }
}

/// Encode any serde-serializable value into a frame:
/// 4-byte little-endian length + JSON bytes.
pub fn encode_message<T: Serialize + ?Sized>(msg: &T) -> Result<Vec<u8>, FrameError> {
    encode_message_capped(msg, u32::MAX as usize)
}

/// [`encode_message`] that refuses payloads longer than `max_len`.
/// Use [`MAX_TO_BROWSER`] when the reader is a Chromium-family browser.
pub fn encode_message_capped<T: Serialize + ?Sized>(
    msg: &T,
    max_len: usize,
) -> Result<Vec<u8>, FrameError> {
    let json = serde_json::to_vec(msg).map_err(|e| FrameError::InvalidPayload(e.to_string()))?;
    let max = max_len.min(u32::MAX as usize);
    if json.len() > max {
        return Err(FrameError::TooLarge {
            len: json.len(),
            max,
        });
    }
    let mut out = Vec::with_capacity(PREFIX_LEN + json.len());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Encode `msg` and write the whole frame in one `write_all`, then flush.
pub fn write_message<W: Write + ?Sized, T: Serialize + ?Sized>(
    writer: &mut W,
    msg: &T,
) -> Result<(), FrameError> {
    let frame = encode_message(msg)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    /// Fails with `Interrupted` on every other call.
    struct Flaky {
        inner: Cursor<Vec<u8>>,
        interrupt: bool,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut v = (body.len() as u32).to_le_bytes().to_vec();
        v.extend_from_slice(body);
        v
    }

    #[test]
    fn prefix_is_little_endian() {
        let bytes = encode_message(&json!({"a": 1})).unwrap();
        assert_eq!(&bytes[..4], &[7, 0, 0, 0]);
        assert_eq!(&bytes[4..], br#"{"a":1}"#);
    }

    #[test]
    fn three_byte_reads_are_absorbed() {
        let mut r = Trickle {
            data: frame(br#"{"type":"GET_TOKEN"}"#),
            pos: 0,
            chunk: 3,
        };
        let msg = read_message(&mut r).unwrap().unwrap();
        assert_eq!(Value::Object(msg), json!({"type": "GET_TOKEN"}));
        assert!(read_message(&mut r).unwrap().is_none());
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut r = Flaky {
            inner: Cursor::new(frame(br#"{"k":"v"}"#)),
            interrupt: false,
        };
        let msg = read_message(&mut r).unwrap().unwrap();
        assert_eq!(msg["k"], "v");
    }

    #[test]
    fn empty_stream_is_graceful() {
        let mut r = Cursor::new(Vec::new());
        assert!(read_message(&mut r).unwrap().is_none());
    }

    #[test]
    fn cap_is_checked_before_reading_the_body() {
        let mut r = Cursor::new(1024u32.to_le_bytes().to_vec());
        let err = read_message_capped(&mut r, Some(8)).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { len: 1024, max: 8 }));
    }

    #[test]
    fn non_object_payloads_are_rejected() {
        for body in [&b"42"[..], b"[1,2]", b"\"s\"", b"null"] {
            let err = read_message(&mut Cursor::new(frame(body))).unwrap_err();
            assert!(err.is_invalid_payload(), "{body:?}: {err}");
        }
    }

    #[test]
    fn invalid_utf8_is_invalid_payload() {
        let err = read_message(&mut Cursor::new(frame(&[0xff, 0xfe, 0xfd]))).unwrap_err();
        assert!(err.is_invalid_payload());
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn zero_length_frame_is_invalid_payload() {
        let err = read_message(&mut Cursor::new(frame(b""))).unwrap_err();
        assert!(err.is_invalid_payload());
    }

    #[test]
    fn outgoing_cap_is_enforced() {
        let big = json!({ "blob": "x".repeat(MAX_TO_BROWSER) });
        let err = encode_message_capped(&big, MAX_TO_BROWSER).unwrap_err();
        assert!(matches!(err, FrameError::TooLarge { .. }));
        assert!(encode_message(&big).is_ok());
    }

    #[test]
    fn write_message_emits_one_frame() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({"ok": true})).unwrap();
        assert_eq!(out, frame(br#"{"ok":true}"#));
    }
}
