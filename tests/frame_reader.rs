mod common;

use common::{raw_frame, ChunkedReader};
use nm_bridge::host::{encode_message, read_message, write_message};
use nm_bridge::FrameError;
use serde_json::{json, Value};
use std::io::Cursor;

fn samples() -> Vec<Value> {
    vec![
        json!({"type": "GET_TOKEN"}),
        json!({}),
        json!({"type": "LOG", "lines": ["a", "b"], "outputDir": null}),
        json!({"unicode": "héllo 🌍", "n": -42, "f": 1.5, "nested": {"xs": [1, [2, {}]]}}),
        json!({"big": "x".repeat(70_000)}),
    ]
}

#[test]
fn chunked_delivery_yields_identical_messages() {
    for v in samples() {
        let frame = encode_message(&v).unwrap();
        let full = frame.len();
        for chunk in [1, 2, 3, full] {
            let mut r = ChunkedReader::new(frame.clone(), chunk);
            let msg = read_message(&mut r)
                .unwrap_or_else(|e| panic!("chunk {chunk}: {e}"))
                .expect("one message");
            assert_eq!(Value::Object(msg), v, "chunk size {chunk}");
            assert!(read_message(&mut r).unwrap().is_none());
        }
    }
}

#[test]
fn back_to_back_frames_split_across_reads() {
    let mut stream = Vec::new();
    for v in samples() {
        write_message(&mut stream, &v).unwrap();
    }
    let mut r = ChunkedReader::new(stream, 3);
    for v in samples() {
        let msg = read_message(&mut r).unwrap().unwrap();
        assert_eq!(Value::Object(msg), v);
    }
    assert!(read_message(&mut r).unwrap().is_none());
}

#[test]
fn write_then_read_reconstructs_the_value() {
    for v in samples() {
        let mut buf = Vec::new();
        write_message(&mut buf, &v).unwrap();
        let back = read_message(&mut Cursor::new(buf)).unwrap().unwrap();
        assert_eq!(Value::Object(back), v);
    }
}

#[test]
fn eof_before_prefix_is_graceful() {
    let mut r = ChunkedReader::new(Vec::new(), 1);
    assert!(read_message(&mut r).unwrap().is_none());
}

#[test]
fn eof_inside_prefix_is_unexpected() {
    for n in 1..4 {
        let prefix = 20u32.to_le_bytes()[..n].to_vec();
        let err = read_message(&mut ChunkedReader::new(prefix, 1)).unwrap_err();
        match err {
            FrameError::UnexpectedEof {
                stage,
                expected,
                received,
            } => {
                assert_eq!(stage, "length prefix");
                assert_eq!(expected, 4);
                assert_eq!(received, n);
            }
            other => panic!("{n} bytes: expected UnexpectedEof, got {other}"),
        }
    }
}

#[test]
fn eof_inside_payload_is_unexpected() {
    let mut raw = 10u32.to_le_bytes().to_vec();
    raw.extend_from_slice(b"abc");
    let err = read_message(&mut Cursor::new(raw)).unwrap_err();
    assert!(err.is_unexpected_eof());
    assert!(err.to_string().contains("unexpected EOF"));
    assert!(err.to_string().contains("3 of 10"));
}

#[test]
fn unterminated_json_is_invalid_payload() {
    let raw = raw_frame(br#"{"type":"#);
    let err = read_message(&mut Cursor::new(raw)).unwrap_err();
    assert!(err.is_invalid_payload(), "got {err}");
    assert!(err.to_string().contains("invalid JSON payload"));
}

#[test]
fn bare_array_is_invalid_payload() {
    let raw = raw_frame(b"[1,2,3]");
    let err = read_message(&mut ChunkedReader::new(raw, 2)).unwrap_err();
    assert!(err.is_invalid_payload());
    assert!(err.to_string().contains("expected a JSON object"));
}

#[test]
fn encoded_prefix_matches_payload_length() {
    let message = json!({ "key": "value" });
    let encoded = encode_message(&message).unwrap();
    let len = u32::from_le_bytes(encoded[0..4].try_into().unwrap()) as usize;
    assert_eq!(len, encoded.len() - 4);
    let decoded: Value = serde_json::from_slice(&encoded[4..]).unwrap();
    assert_eq!(decoded, message);
}
