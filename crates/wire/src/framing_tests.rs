// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

use super::*;
use crate::Envelope;

#[test]
fn encode_returns_json_without_a_length_prefix() {
    let envelope = Envelope::ok(7u32);
    let encoded = encode(&envelope).expect("encode failed");
    let json_str = std::str::from_utf8(&encoded).expect("should be valid utf-8");
    assert!(json_str.starts_with('{'), "should be a JSON object: {json_str}");
}

#[tokio::test]
async fn read_write_message_round_trips() {
    let original = b"hello world";
    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");
    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_a_big_endian_length_prefix() {
    let data = b"test data";
    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_rejects_a_frame_over_the_limit() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_be_bytes());
    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
}

#[tokio::test]
async fn write_read_envelope_round_trips_through_json() {
    let envelope = Envelope::ok(vec!["tsk-1".to_string(), "tsk-2".to_string()]);
    let mut buffer = Vec::new();
    write_envelope(&mut buffer, &envelope).await.unwrap();
    let mut cursor = std::io::Cursor::new(buffer);
    let read_back: Envelope<Vec<String>> = read_envelope(&mut cursor).await.unwrap();
    assert_eq!(read_back, envelope);
}
