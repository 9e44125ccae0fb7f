//! Gateway event catalogue
//!
//! Defines the closed set of dispatch event types, their payload bodies, and
//! the name-based resolution used to decode a dispatch envelope's `d` field.
//!
//! Event names arriving off the wire are matched case-insensitively after
//! normalization. Names this build does not know, and bodies that fail to
//! decode against their expected shape, degrade to [`Event::Unknown`] under
//! the default tolerance: remote services routinely emit events newer than
//! any single client build.

use crate::error::DecodeError;
use crate::payloads::User;
use crate::Snowflake;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Gateway event types
///
/// These are the event names carried in the `t` field of dispatch envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Connection events
    /// Sent after successful Identify
    Ready,
    /// Sent after successful Resume
    Resumed,

    // Guild events
    /// Guild available, joined, or created
    GuildCreate,
    /// Guild settings changed
    GuildUpdate,
    /// Left guild, kicked, or guild deleted
    GuildDelete,

    // Channel events
    /// Channel created
    ChannelCreate,
    /// Channel updated
    ChannelUpdate,
    /// Channel deleted
    ChannelDelete,

    // Message events
    /// New message
    MessageCreate,
    /// Message edited
    MessageUpdate,
    /// Message deleted
    MessageDelete,

    // Reaction events
    /// Reaction added
    MessageReactionAdd,
    /// Reaction removed
    MessageReactionRemove,

    // Member events
    /// User joined guild
    GuildMemberAdd,
    /// Member updated (roles, nickname)
    GuildMemberUpdate,
    /// User left guild
    GuildMemberRemove,

    // Presence events
    /// User status changed
    PresenceUpdate,
    /// User started typing
    TypingStart,

    // User events
    /// Current user updated
    UserUpdate,
}

impl EventType {
    /// Get the canonical wire name of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageReactionAdd => "MESSAGE_REACTION_ADD",
            Self::MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::TypingStart => "TYPING_START",
            Self::UserUpdate => "USER_UPDATE",
        }
    }

    /// Resolve a wire event name to a catalogue entry
    ///
    /// Matching is loose: surrounding whitespace is stripped, case is
    /// ignored, and spaces/hyphens are treated as underscores.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match normalize_event_name(name).as_str() {
            "READY" => Some(Self::Ready),
            "RESUMED" => Some(Self::Resumed),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "GUILD_UPDATE" => Some(Self::GuildUpdate),
            "GUILD_DELETE" => Some(Self::GuildDelete),
            "CHANNEL_CREATE" => Some(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Some(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Some(Self::ChannelDelete),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_UPDATE" => Some(Self::MessageUpdate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "MESSAGE_REACTION_ADD" => Some(Self::MessageReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Some(Self::MessageReactionRemove),
            "GUILD_MEMBER_ADD" => Some(Self::GuildMemberAdd),
            "GUILD_MEMBER_UPDATE" => Some(Self::GuildMemberUpdate),
            "GUILD_MEMBER_REMOVE" => Some(Self::GuildMemberRemove),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            "TYPING_START" => Some(Self::TypingStart),
            "USER_UPDATE" => Some(Self::UserUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize a wire event name for catalogue matching
#[must_use]
pub fn normalize_event_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

// === Event bodies ===

/// READY event payload
///
/// Captured by the lifecycle machine to record the new session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ready {
    /// Gateway protocol version
    pub v: i32,

    /// Current user
    pub user: User,

    /// Session ID for resuming
    pub session_id: String,

    /// Gateway URL to use for resume attempts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
}

/// GUILD_CREATE / GUILD_UPDATE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<i32>,
    /// If true, the guild is temporarily unavailable
    #[serde(default)]
    pub unavailable: bool,
}

/// GUILD_DELETE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildDelete {
    pub id: Snowflake,
    /// If true, this is a temporary outage; if false, the user left or the
    /// guild was deleted
    #[serde(default)]
    pub unavailable: bool,
}

/// CHANNEL_CREATE / CHANNEL_UPDATE / CHANNEL_DELETE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<i32>,
}

/// MESSAGE_CREATE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub author: User,
    pub content: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
}

/// MESSAGE_UPDATE event payload (partial update)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageUpdate {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
}

/// MESSAGE_DELETE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// MESSAGE_REACTION_ADD / MESSAGE_REACTION_REMOVE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReaction {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub emoji: String,
}

/// GUILD_MEMBER_ADD / GUILD_MEMBER_UPDATE / GUILD_MEMBER_REMOVE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMember {
    pub guild_id: Snowflake,
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// PRESENCE_UPDATE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    pub user: PartialUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub status: String,
}

/// Partial user with just an ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialUser {
    pub id: Snowflake,
}

/// TYPING_START event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStart {
    pub channel_id: Snowflake,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix timestamp in seconds
    pub timestamp: i64,
}

// === The catalogue ===

/// A decoded dispatch event or connection notice
///
/// Exactly one variant per catalogue entry, plus [`Event::Unknown`] for
/// names or bodies this build cannot decode, plus two notices the receiver
/// raises for server-initiated reconnect and session-invalidate envelopes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready(Ready),
    Resumed,
    GuildCreate(Guild),
    GuildUpdate(Guild),
    GuildDelete(GuildDelete),
    ChannelCreate(Channel),
    ChannelUpdate(Channel),
    ChannelDelete(Channel),
    MessageCreate(Message),
    MessageUpdate(MessageUpdate),
    MessageDelete(MessageDelete),
    MessageReactionAdd(MessageReaction),
    MessageReactionRemove(MessageReaction),
    GuildMemberAdd(GuildMember),
    GuildMemberUpdate(GuildMember),
    GuildMemberRemove(GuildMember),
    PresenceUpdate(Presence),
    TypingStart(TypingStart),
    UserUpdate(User),
    /// An event this build does not recognize, carrying the raw payload
    Unknown { name: String, raw: Value },
    /// The server asked the client to disconnect and resume; not a dispatch
    Reconnect,
    /// The server invalidated the session; not a dispatch
    SessionInvalidated { resumable: bool },
}

impl Event {
    /// Resolve a dispatch envelope's event name and data into a typed event
    ///
    /// Under the default tolerance (`strict = false`), an unmatched name or
    /// a body that fails to decode yields [`Event::Unknown`] carrying the
    /// raw payload. In strict mode both conditions are decode errors.
    pub fn resolve(name: &str, data: Value, strict: bool) -> Result<Self, DecodeError> {
        let Some(event_type) = EventType::parse(name) else {
            if strict {
                return Err(DecodeError::UnknownEvent {
                    name: name.to_string(),
                });
            }
            return Ok(Self::Unknown {
                name: name.to_string(),
                raw: data,
            });
        };

        match Self::decode_body(event_type, &data) {
            Ok(event) => Ok(event),
            Err(source) if strict => Err(DecodeError::EventBody {
                name: event_type.as_str().to_string(),
                source,
            }),
            // Receivers surface the degraded event through the Unknown
            // variant; the raw payload is preserved for the caller.
            Err(_) => Ok(Self::Unknown {
                name: name.to_string(),
                raw: data,
            }),
        }
    }

    fn decode_body(event_type: EventType, data: &Value) -> Result<Self, serde_json::Error> {
        fn from<T: serde::de::DeserializeOwned>(data: &Value) -> Result<T, serde_json::Error> {
            T::deserialize(data)
        }

        Ok(match event_type {
            EventType::Ready => Self::Ready(from(data)?),
            EventType::Resumed => Self::Resumed,
            EventType::GuildCreate => Self::GuildCreate(from(data)?),
            EventType::GuildUpdate => Self::GuildUpdate(from(data)?),
            EventType::GuildDelete => Self::GuildDelete(from(data)?),
            EventType::ChannelCreate => Self::ChannelCreate(from(data)?),
            EventType::ChannelUpdate => Self::ChannelUpdate(from(data)?),
            EventType::ChannelDelete => Self::ChannelDelete(from(data)?),
            EventType::MessageCreate => Self::MessageCreate(from(data)?),
            EventType::MessageUpdate => Self::MessageUpdate(from(data)?),
            EventType::MessageDelete => Self::MessageDelete(from(data)?),
            EventType::MessageReactionAdd => Self::MessageReactionAdd(from(data)?),
            EventType::MessageReactionRemove => Self::MessageReactionRemove(from(data)?),
            EventType::GuildMemberAdd => Self::GuildMemberAdd(from(data)?),
            EventType::GuildMemberUpdate => Self::GuildMemberUpdate(from(data)?),
            EventType::GuildMemberRemove => Self::GuildMemberRemove(from(data)?),
            EventType::PresenceUpdate => Self::PresenceUpdate(from(data)?),
            EventType::TypingStart => Self::TypingStart(from(data)?),
            EventType::UserUpdate => Self::UserUpdate(from(data)?),
        })
    }

    /// Get the catalogue entry for this event, if it has one
    #[must_use]
    pub const fn event_type(&self) -> Option<EventType> {
        Some(match self {
            Self::Ready(_) => EventType::Ready,
            Self::Resumed => EventType::Resumed,
            Self::GuildCreate(_) => EventType::GuildCreate,
            Self::GuildUpdate(_) => EventType::GuildUpdate,
            Self::GuildDelete(_) => EventType::GuildDelete,
            Self::ChannelCreate(_) => EventType::ChannelCreate,
            Self::ChannelUpdate(_) => EventType::ChannelUpdate,
            Self::ChannelDelete(_) => EventType::ChannelDelete,
            Self::MessageCreate(_) => EventType::MessageCreate,
            Self::MessageUpdate(_) => EventType::MessageUpdate,
            Self::MessageDelete(_) => EventType::MessageDelete,
            Self::MessageReactionAdd(_) => EventType::MessageReactionAdd,
            Self::MessageReactionRemove(_) => EventType::MessageReactionRemove,
            Self::GuildMemberAdd(_) => EventType::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => EventType::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => EventType::GuildMemberRemove,
            Self::PresenceUpdate(_) => EventType::PresenceUpdate,
            Self::TypingStart(_) => EventType::TypingStart,
            Self::UserUpdate(_) => EventType::UserUpdate,
            Self::Unknown { .. } | Self::Reconnect | Self::SessionInvalidated { .. } => {
                return None;
            }
        })
    }
}
