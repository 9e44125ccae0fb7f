//! Connection status
//!
//! The single source of truth for the client lifecycle. Mutated exclusively
//! by the lifecycle machine; readable from any thread.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the gateway client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionStatus {
    /// Never connected, or fully torn down
    Offline = 0,
    /// Transport closed; the session may still be resumable
    Disconnected = 1,
    /// Transport open and handshake complete
    Connected = 2,
}

impl ConnectionStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Disconnected,
            2 => Self::Connected,
            _ => Self::Offline,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Offline => "Offline",
            Self::Disconnected => "Disconnected",
            Self::Connected => "Connected",
        };
        write!(f, "{name}")
    }
}

/// Atomic cell holding the current status
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionStatus::Offline as u8))
    }

    pub fn get(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, status: ConnectionStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }
}
