//! Transport abstraction
//!
//! The physical socket, reduced to the primitives the connection engine
//! needs: connect, send, receive, close. Connecting yields separate writer
//! and reader halves so the sender and receiver loops can own their side
//! independently.

mod ws;

pub use ws::WsConnector;

use async_trait::async_trait;

/// A message read off the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    /// A complete text frame
    Text(String),
    /// The peer closed the connection
    Closed { code: u16, reason: String },
}

impl TransportMessage {
    /// Close code for a normal, expected closure; the only status the
    /// engine treats as clean
    pub const NORMAL_CLOSURE: u16 = 1000;

    /// Whether this is a closure the engine treats as clean
    #[must_use]
    pub fn is_clean_close(&self) -> bool {
        matches!(
            self,
            Self::Closed { code, .. } if *code == Self::NORMAL_CLOSURE
        )
    }
}

/// Transport-level failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Establishing the connection failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// A send failed
    #[error("send failed: {0}")]
    Send(String),

    /// A receive failed
    #[error("receive failed: {0}")]
    Recv(String),

    /// The connection was already closed normally; not a failure
    #[error("connection closed")]
    ClosedNormally,
}

/// Write half of a transport connection
#[async_trait]
pub trait TransportWriter: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the connection
    ///
    /// `reconnect_intended` selects a close code that tells the remote side
    /// the session should stay resumable.
    async fn close(&mut self, reconnect_intended: bool) -> Result<(), TransportError>;
}

/// Read half of a transport connection
#[async_trait]
pub trait TransportReader: Send {
    /// Receive the next message
    ///
    /// A peer-initiated close is delivered once as
    /// [`TransportMessage::Closed`]; subsequent calls fail.
    async fn recv(&mut self) -> Result<TransportMessage, TransportError>;
}

/// Opens transport connections
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the given endpoint and split into halves
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportWriter>, Box<dyn TransportReader>), TransportError>;
}
