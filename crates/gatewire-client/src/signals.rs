//! Cross-loop signal flags for one physical connection
//!
//! Single-word flags shared between the receiver loop, sender loop, and
//! lifecycle machine. A fresh set is created per physical connection.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub(crate) struct ConnectionSignals {
    /// Server demanded an immediate heartbeat; consumed by the sender loop
    heartbeat_requested: AtomicBool,
    /// Server asked for a reconnect or invalidated the session
    should_reconnect: AtomicBool,
    /// The lifecycle machine is shutting down gracefully
    graceful_shutdown: AtomicBool,
}

impl ConnectionSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_heartbeat(&self) {
        self.heartbeat_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending heartbeat request, if any
    pub fn take_heartbeat_request(&self) -> bool {
        self.heartbeat_requested.swap(false, Ordering::SeqCst)
    }

    pub fn set_reconnect(&self) {
        self.should_reconnect.store(true, Ordering::SeqCst);
    }

    pub fn should_reconnect(&self) -> bool {
        self.should_reconnect.load(Ordering::SeqCst)
    }

    pub fn begin_graceful_shutdown(&self) {
        self.graceful_shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_graceful_shutdown(&self) -> bool {
        self.graceful_shutdown.load(Ordering::SeqCst)
    }
}
