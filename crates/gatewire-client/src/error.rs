//! Client error taxonomy and reconnect classification
//!
//! Every error that terminates a sender or receiver loop funnels through
//! [`GatewayError::classify`], which decides whether the lifecycle machine
//! retries, discards the session first, or gives up.

use crate::transport::TransportError;
use gatewire_protocol::{CloseCode, DecodeError};

/// Errors surfaced by the gateway connection engine
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The remote service closed the connection with a protocol close code
    #[error("gateway closed: {0}")]
    Close(CloseCode),

    /// The transport closed with a socket-layer code outside the protocol range
    #[error("transport closed with code {code}: {reason}")]
    TransportClosed { code: u16, reason: String },

    /// A transport-level send/receive/connect failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An envelope failed to decode
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Nothing arrived from the gateway within the allowed window
    #[error("timed out: {0}")]
    Timeout(&'static str),

    /// A locally-raised condition carrying its own retry semantics
    #[error("{message}")]
    Internal {
        message: String,
        /// Whether the current session may still be resumed
        resumable: bool,
        /// Whether this condition is fatal to the client as a whole
        critical: bool,
    },

    /// Anything else; classified optimistically as retryable
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// Create a locally-raised error with explicit retry semantics
    #[must_use]
    pub fn internal(message: impl Into<String>, resumable: bool, critical: bool) -> Self {
        Self::Internal {
            message: message.into(),
            resumable,
            critical,
        }
    }

    /// Decide what the lifecycle machine does after this error
    #[must_use]
    pub fn classify(&self) -> Disposition {
        match self {
            // Remote-reported close codes carry their own policy: transient
            // protocol errors retry with the session intact, session errors
            // retry with a fresh identify, the rest are terminal.
            Self::Close(code) => {
                if code.should_reconnect() {
                    Disposition::retry(code.invalidates_session())
                } else {
                    Disposition::terminate()
                }
            }

            // Socket-layer closes: an endpoint going away, an internal
            // server error, or a service restart means the session state on
            // the remote side is suspect.
            Self::TransportClosed { code, .. } => match code {
                1001 | 1011 | 1012 => Disposition::retry(true),
                _ => Disposition::retry(false),
            },

            // Generic transport and timeout failures retry with the session
            // intact; a resume will replay whatever was missed.
            Self::Transport(_) | Self::Timeout(_) | Self::Decode(_) => Disposition::retry(false),

            // Locally-raised errors carry their flags from the point of origin.
            Self::Internal {
                resumable, critical, ..
            } => {
                if *critical {
                    Disposition::terminate()
                } else {
                    Disposition::retry(!resumable)
                }
            }

            // Unrecognized shapes retry optimistically so a novel error
            // cannot cause a surprising permanent outage.
            Self::Other(_) => Disposition::retry(false),
        }
    }
}

/// The outcome of classifying a connection-terminating error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition {
    /// Attempt another connect
    pub retry: bool,
    /// Discard the session (fresh identify) before retrying
    pub with_new_session: bool,
    /// Give up and propagate the error to the caller
    pub terminate: bool,
}

impl Disposition {
    /// Retry, optionally discarding the session first
    #[must_use]
    pub const fn retry(with_new_session: bool) -> Self {
        Self {
            retry: true,
            with_new_session,
            terminate: false,
        }
    }

    /// Give up and propagate the error
    #[must_use]
    pub const fn terminate() -> Self {
        Self {
            retry: false,
            with_new_session: false,
            terminate: true,
        }
    }
}

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
