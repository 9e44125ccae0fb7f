//! Protocol decode errors

use crate::OpCode;

/// Errors raised while decoding or encoding an envelope
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The outer envelope was not valid JSON or missing required fields
    #[error("invalid envelope: {0}")]
    Envelope(#[from] serde_json::Error),

    /// An envelope that requires a data payload arrived without one
    #[error("missing data payload for {0}")]
    MissingData(OpCode),

    /// A dispatch envelope arrived without a sequence number
    #[error("dispatch envelope missing sequence number")]
    MissingSequence,

    /// A dispatch envelope arrived without an event name
    #[error("dispatch envelope missing event name")]
    MissingEventName,

    /// Strict mode: the dispatch event name is not in the catalogue
    #[error("unknown event name: {name}")]
    UnknownEvent { name: String },

    /// Strict mode: a known event's body failed to decode
    #[error("failed to decode {name} body: {source}")]
    EventBody {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The envelope carries an op code clients never send
    #[error("not a client command: {0}")]
    NotACommand(OpCode),
}
