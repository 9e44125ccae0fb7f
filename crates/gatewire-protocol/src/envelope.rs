//! Gateway envelope codec
//!
//! The envelope is the outer wire structure every message travels in: an op
//! code, an optional sequence number and event name (dispatch only), and a
//! payload body. [`RawEnvelope`] mirrors the wire shape; [`Incoming`] and
//! [`Command`] are the typed views the connection engine works with.
//!
//! Each command body maps 1:1 to exactly one op code by construction, so
//! encoding needs no lookup beyond the variant itself. Outbound dispatch is
//! not representable: clients only ever send commands.

use crate::error::DecodeError;
use crate::event::Event;
use crate::payloads::{Hello, Identify, PresenceUpdate, Resume};
use crate::OpCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire-level envelope
///
/// All messages exchanged over the gateway follow this format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnvelope {
    /// Operation code
    pub op: OpCode,

    /// Event name (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Payload body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

impl RawEnvelope {
    /// Create a Dispatch envelope (op=0)
    ///
    /// Only servers dispatch; this constructor exists for test fixtures and
    /// mock transports.
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            t: Some(event_type.into()),
            s: Some(sequence),
            d: Some(data),
        }
    }

    /// Create a Hello envelope (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: serde_json::to_value(Hello::new(heartbeat_interval)).ok(),
        }
    }

    /// Create a Heartbeat ACK envelope (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    /// Create a Reconnect envelope (op=5)
    #[must_use]
    pub fn reconnect() -> Self {
        Self {
            op: OpCode::Reconnect,
            t: None,
            s: None,
            d: None,
        }
    }

    /// Create an Invalid Session envelope (op=7)
    ///
    /// `resumable` indicates if the session can still be resumed.
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self {
            op: OpCode::InvalidSession,
            t: None,
            s: None,
            d: Some(Value::Bool(resumable)),
        }
    }

    /// Create a server-initiated Heartbeat request envelope (op=1)
    #[must_use]
    pub fn heartbeat_request() -> Self {
        Self {
            op: OpCode::Heartbeat,
            t: None,
            s: None,
            d: None,
        }
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for RawEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "Envelope(op={}, t={t}", self.op)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "Envelope(op={})", self.op)
        }
    }
}

/// A typed server-to-client envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// First envelope on every connection; carries the heartbeat interval
    Hello(Hello),
    /// An event notification with its sequence number
    Dispatch { seq: u64, event: Event },
    /// Server demands an immediate heartbeat
    HeartbeatRequest,
    /// Server demands the client drop and reconnect
    Reconnect,
    /// The session is invalid; `resumable` hints whether a resume may work
    InvalidSession { resumable: bool },
    /// Acknowledgement of the client's last heartbeat
    HeartbeatAck,
    /// An op code this build does not recognize; logged and skipped
    Unknown { op: u8 },
}

/// Decode a server-to-client envelope
///
/// The outer fields are parsed before committing to the body's type.
/// Unrecognized op codes decode to [`Incoming::Unknown`] rather than
/// failing, as do unknown dispatch events unless `strict` is set.
pub fn decode_incoming(text: &str, strict: bool) -> Result<Incoming, DecodeError> {
    let envelope = RawEnvelope::from_json(text)?;

    match envelope.op {
        OpCode::Hello => {
            let data = envelope.d.ok_or(DecodeError::MissingData(OpCode::Hello))?;
            let hello = Hello::deserialize(data)?;
            Ok(Incoming::Hello(hello))
        }
        OpCode::Dispatch => {
            let seq = envelope.s.ok_or(DecodeError::MissingSequence)?;
            let name = envelope.t.ok_or(DecodeError::MissingEventName)?;
            let data = envelope.d.unwrap_or(Value::Null);
            let event = Event::resolve(&name, data, strict)?;
            Ok(Incoming::Dispatch { seq, event })
        }
        OpCode::Heartbeat => Ok(Incoming::HeartbeatRequest),
        OpCode::Reconnect => Ok(Incoming::Reconnect),
        OpCode::InvalidSession => {
            // A missing or malformed payload is treated as non-resumable.
            let resumable = envelope.d.and_then(|d| d.as_bool()).unwrap_or(false);
            Ok(Incoming::InvalidSession { resumable })
        }
        OpCode::HeartbeatAck => Ok(Incoming::HeartbeatAck),
        // Client-only ops arriving inbound are protocol extensions or
        // violations; either way they are skipped, not fatal.
        op => Ok(Incoming::Unknown { op: op.as_u8() }),
    }
}

/// A client-to-server command
///
/// The only payloads a client ever sends. Each variant maps to exactly one
/// op code.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Keep-alive carrying the last observed sequence number
    Heartbeat(Option<u64>),
    /// Establish a brand-new session
    Identify(Identify),
    /// Reattach to a previous session
    Resume(Resume),
    /// Update online status
    UpdatePresence(PresenceUpdate),
}

impl Command {
    /// The op code this command is carried under
    #[must_use]
    pub const fn opcode(&self) -> OpCode {
        match self {
            Self::Heartbeat(_) => OpCode::Heartbeat,
            Self::Identify(_) => OpCode::Identify,
            Self::Resume(_) => OpCode::Resume,
            Self::UpdatePresence(_) => OpCode::PresenceUpdate,
        }
    }

    /// Short name for logging
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.opcode().name()
    }
}

/// Encode a command into its wire envelope
///
/// Sequence and event name are always absent on outbound envelopes; only
/// inbound dispatch uses them.
pub fn encode_command(command: &Command) -> Result<String, serde_json::Error> {
    let d = match command {
        Command::Heartbeat(last_seq) => last_seq.map_or(Value::Null, Into::into),
        Command::Identify(identify) => serde_json::to_value(identify)?,
        Command::Resume(resume) => serde_json::to_value(resume)?,
        Command::UpdatePresence(presence) => serde_json::to_value(presence)?,
    };

    RawEnvelope {
        op: command.opcode(),
        t: None,
        s: None,
        d: Some(d),
    }
    .to_json()
}

/// Decode a client-to-server command
///
/// Used by protocol-conformance tests and mock servers; a real client never
/// receives commands.
pub fn decode_command(text: &str) -> Result<Command, DecodeError> {
    let envelope = RawEnvelope::from_json(text)?;

    match envelope.op {
        OpCode::Heartbeat => Ok(Command::Heartbeat(envelope.d.and_then(|d| d.as_u64()))),
        OpCode::Identify => {
            let data = envelope.d.ok_or(DecodeError::MissingData(OpCode::Identify))?;
            Ok(Command::Identify(Identify::deserialize(data)?))
        }
        OpCode::Resume => {
            let data = envelope.d.ok_or(DecodeError::MissingData(OpCode::Resume))?;
            Ok(Command::Resume(Resume::deserialize(data)?))
        }
        OpCode::PresenceUpdate => {
            let data = envelope
                .d
                .ok_or(DecodeError::MissingData(OpCode::PresenceUpdate))?;
            Ok(Command::UpdatePresence(PresenceUpdate::deserialize(data)?))
        }
        op => Err(DecodeError::NotACommand(op)),
    }
}
