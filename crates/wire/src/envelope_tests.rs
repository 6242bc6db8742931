// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Lodestar Contributors

use super::*;
use lodestar_core::LodestarError;

#[test]
fn ok_envelope_serializes_without_an_error_field() {
    let envelope = Envelope::ok(42);
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["data"], 42);
    assert!(json.get("error").is_none());
}

#[test]
fn err_envelope_carries_the_mapped_error_code() {
    let err = LodestarError::TaskNotFound("tsk-1".into());
    let envelope: Envelope<Vec<String>> = Envelope::err(&err);
    assert!(!envelope.ok);
    assert_eq!(envelope.data, Vec::<String>::new());
    assert_eq!(envelope.error.unwrap().code, ErrorCode::TaskNotFound);
}

#[test]
fn every_lodestar_error_code_round_trips_through_error_code() {
    let samples = [
        LodestarError::NotInitialized { searched_from: "/tmp".into() },
        LodestarError::SpecMalformed { reason: "bad".into() },
        LodestarError::LockTimeout { waited_ms: 5000 },
        LodestarError::RuntimeBusy { reason: "busy".into() },
        LodestarError::RuntimeCorrupt { reason: "corrupt".into() },
        LodestarError::TaskNotFound("tsk-1".into()),
        LodestarError::TaskNotClaimable { task_id: "tsk-1".into(), reason: "not ready".into() },
        LodestarError::TaskAlreadyClaimed { task_id: "tsk-1".into(), holder_agent_id: "agt-1".into(), lease_id: "lea-1".into() },
        LodestarError::TaskLeaseNotHeld { task_id: "tsk-1".into(), lease_id: "none".into() },
        LodestarError::TaskStateConflict { task_id: "tsk-1".into(), expected: "done".into(), found: "ready".into() },
        LodestarError::AgentNotRegistered("agt-1".into()),
        LodestarError::AgentAlreadyExists("agt-1".into()),
        LodestarError::MessageTooLarge { limit_bytes: 16384 },
        LodestarError::MessageRecipientInvalid { recipient: "agt-1".into(), reason: "no such agent".into() },
        LodestarError::InvalidInput { field: "x".into(), reason: "y".into() },
    ];
    for err in &samples {
        assert!(ErrorCode::from_code(err.code()).is_some(), "no ErrorCode for {}", err.code());
    }
}

#[test]
fn task_already_claimed_surfaces_the_holder_in_error_details() {
    let err = LodestarError::TaskAlreadyClaimed { task_id: "tsk-1".into(), holder_agent_id: "agt-1".into(), lease_id: "lea-1".into() };
    let envelope: Envelope<Vec<String>> = Envelope::err(&err);
    let details = envelope.error.unwrap().details.unwrap();
    assert_eq!(details["holder_agent_id"], "agt-1");
    assert_eq!(details["lease_id"], "lea-1");
}

#[test]
fn with_next_and_with_warnings_attach_their_fields() {
    let envelope = Envelope::ok(()).with_next(vec![NextAction::new("claim", "task claim tsk-1")]).with_warnings(vec!["drift".into()]);
    assert_eq!(envelope.next.len(), 1);
    assert_eq!(envelope.warnings, vec!["drift".to_string()]);
}
