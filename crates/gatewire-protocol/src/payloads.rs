//! Control payload definitions
//!
//! Defines the payload structures for non-dispatch envelopes: the server's
//! Hello and the client's Identify/Resume/PresenceUpdate commands.

use crate::{Intents, Snowflake};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection. The interval it carries
/// is fixed for the lifetime of the physical connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl Hello {
    /// Create a new Hello payload
    #[must_use]
    pub fn new(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Payload for op 2 (Identify)
///
/// Sent by the client to establish a brand-new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identify {
    /// Authentication token
    pub token: String,

    /// Client metadata
    pub properties: IdentifyProperties,

    /// Subscribed event categories
    pub intents: Intents,

    /// Shard identification as `[index, count]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardId>,

    /// Member-list threshold above which guilds are considered large
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u32>,

    /// Initial presence for the session
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdate>,
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,

    /// Client library name
    pub browser: String,

    /// Device type
    pub device: String,
}

impl IdentifyProperties {
    /// Properties describing this library on the current platform
    #[must_use]
    pub fn this_device() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "gatewire".to_string(),
            device: "gatewire".to_string(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::this_device()
    }
}

/// Shard identification sent in Identify
///
/// Encoded on the wire as a two-element array `[index, count]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct ShardId {
    /// Zero-based shard index
    pub index: u32,
    /// Total shard count
    pub count: u32,
}

impl From<(u32, u32)> for ShardId {
    fn from((index, count): (u32, u32)) -> Self {
        Self { index, count }
    }
}

impl From<ShardId> for (u32, u32) {
    fn from(shard: ShardId) -> Self {
        (shard.index, shard.count)
    }
}

/// Payload for op 3 (Presence Update)
///
/// Sent by the client to update its online status; also embeddable in
/// Identify as the initial presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// New status (online, idle, dnd, offline)
    pub status: String,

    /// Whether the client is marked away
    #[serde(default)]
    pub afk: bool,
}

impl PresenceUpdate {
    /// Valid status values
    pub const VALID_STATUSES: &'static [&'static str] = &["online", "idle", "dnd", "offline"];

    /// Create a presence update with the given status
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            afk: false,
        }
    }

    /// Check if the status is valid
    #[must_use]
    pub fn is_valid_status(&self) -> bool {
        Self::VALID_STATUSES.contains(&self.status.as_str())
    }
}

/// Payload for op 4 (Resume)
///
/// Sent by the client to reattach to a previous session from a known
/// sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    /// Authentication token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}

/// User data included in Ready and entity events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello_payload() {
        let hello = Hello::new(45_000);
        assert_eq!(hello.heartbeat_interval, 45_000);

        let parsed: Hello = serde_json::from_str(r#"{"heartbeat_interval":41250}"#).unwrap();
        assert_eq!(parsed.heartbeat_interval, 41_250);
    }

    #[test]
    fn test_shard_id_wire_format() {
        let shard = ShardId { index: 2, count: 8 };
        let json = serde_json::to_string(&shard).unwrap();
        assert_eq!(json, "[2,8]");

        let parsed: ShardId = serde_json::from_str("[2,8]").unwrap();
        assert_eq!(parsed, shard);
    }

    #[test]
    fn test_presence_update_validation() {
        let valid = PresenceUpdate::new("online");
        assert!(valid.is_valid_status());

        let invalid = PresenceUpdate::new("busy");
        assert!(!invalid.is_valid_status());
    }

    #[test]
    fn test_identify_payload_serialization() {
        let payload = Identify {
            token: "token123".to_string(),
            properties: IdentifyProperties::this_device(),
            intents: Intents::GUILDS,
            shard: Some(ShardId { index: 0, count: 1 }),
            large_threshold: Some(250),
            presence: None,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("token123"));
        assert!(json.contains("[0,1]"));
        assert!(!json.contains("presence"));
    }

    #[test]
    fn test_resume_payload_serialization() {
        let payload = Resume {
            token: "token123".to_string(),
            session_id: "session456".to_string(),
            seq: 42,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("session456"));
        assert!(json.contains("42"));
    }
}
