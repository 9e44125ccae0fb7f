//! Test fixtures and payload builders
//!
//! Canned wire payloads for driving the mock gateway.

use gatewire_protocol::RawEnvelope;
use serde_json::json;

/// A READY dispatch for the given session
pub fn ready_envelope(seq: u64, session_id: &str, resume_url: Option<&str>) -> RawEnvelope {
    let mut data = json!({
        "v": 10,
        "user": {
            "id": "81384788765712384",
            "username": "testbot",
            "bot": true,
        },
        "session_id": session_id,
    });
    if let Some(url) = resume_url {
        data["resume_gateway_url"] = json!(url);
    }

    RawEnvelope::dispatch("READY", seq, data)
}

/// A RESUMED dispatch marking the end of a replay backlog
pub fn resumed_envelope(seq: u64) -> RawEnvelope {
    RawEnvelope::dispatch("RESUMED", seq, json!(null))
}

/// A MESSAGE_CREATE dispatch with the given content
pub fn message_envelope(seq: u64, content: &str) -> RawEnvelope {
    RawEnvelope::dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": "1000000000000000001",
            "channel_id": "2000000000000000002",
            "author": {
                "id": "81384788765712384",
                "username": "someone",
            },
            "content": content,
            "timestamp": "2024-01-01T00:00:00Z",
        }),
    )
}

/// A TYPING_START dispatch
pub fn typing_envelope(seq: u64) -> RawEnvelope {
    RawEnvelope::dispatch(
        "TYPING_START",
        seq,
        json!({
            "channel_id": "2000000000000000002",
            "user_id": "81384788765712384",
            "timestamp": 1_704_067_200,
        }),
    )
}
