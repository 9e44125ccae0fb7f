//! Wire-level gateway protocol
//!
//! Everything needed to read and write gateway envelopes: op codes, close
//! codes, the control payloads (Hello/Identify/Resume/PresenceUpdate), the
//! dispatch event catalogue, and the envelope codec itself.
//!
//! The connection engine lives in `gatewire-client`; this crate is pure data
//! and (de)serialization with no I/O.

pub mod close_code;
pub mod envelope;
pub mod error;
pub mod event;
pub mod intents;
pub mod opcode;
pub mod payloads;
pub mod snowflake;

pub use close_code::CloseCode;
pub use envelope::{decode_command, decode_incoming, encode_command, Command, Incoming, RawEnvelope};
pub use error::DecodeError;
pub use event::{Event, EventType};
pub use intents::Intents;
pub use opcode::OpCode;
pub use payloads::{Hello, Identify, IdentifyProperties, PresenceUpdate, Resume, ShardId, User};
pub use snowflake::Snowflake;
