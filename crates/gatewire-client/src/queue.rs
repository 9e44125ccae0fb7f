//! Outbound command queue and pre-shutdown registry
//!
//! The queue is a multi-producer single-consumer FIFO: any caller thread
//! enqueues, only the sender loop drains. Enqueue never blocks. The head
//! command is not removed until a send actually succeeds, so a rate-limited
//! or interrupted tick never loses a command.

use gatewire_protocol::Command;
use parking_lot::Mutex;
use std::collections::VecDeque;
use uuid::Uuid;

/// FIFO of caller-submitted commands awaiting send
#[derive(Debug, Default)]
pub struct CommandQueue {
    inner: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command; never blocks
    pub fn enqueue(&self, command: Command) {
        self.inner.lock().push_back(command);
    }

    /// Insert a command at the head of the queue
    ///
    /// Used for handshake commands that must go out before any backlog left
    /// over from a previous connection.
    pub fn enqueue_front(&self, command: Command) {
        self.inner.lock().push_front(command);
    }

    /// Drop identify/resume commands sitting at the head of the queue
    ///
    /// A handshake command left over from a connection that died before the
    /// send succeeded must not go out on a connection that has already
    /// authenticated. Handshake commands only ever enter at the head, so
    /// they form a prefix.
    pub fn discard_stale_handshakes(&self) {
        let mut inner = self.inner.lock();
        while matches!(
            inner.front(),
            Some(Command::Identify(_) | Command::Resume(_))
        ) {
            inner.pop_front();
        }
    }

    /// Look at the head of the queue without removing it
    #[must_use]
    pub fn peek(&self) -> Option<Command> {
        self.inner.lock().front().cloned()
    }

    /// Remove the head of the queue after a confirmed send
    pub fn pop(&self) -> Option<Command> {
        self.inner.lock().pop_front()
    }

    /// Number of commands waiting
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Handle returned by [`PreShutdownRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreShutdownHandle(Uuid);

/// Commands enqueued once, in registration order, just before a graceful
/// shutdown completes
///
/// Deregistration after the shutdown drain has begun has no effect: the
/// drain works from a snapshot.
#[derive(Debug, Default)]
pub struct PreShutdownRegistry {
    entries: Mutex<Vec<(Uuid, Command)>>,
}

impl PreShutdownRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command to be sent before shutdown
    pub fn register(&self, command: Command) -> PreShutdownHandle {
        let id = Uuid::new_v4();
        self.entries.lock().push((id, command));
        PreShutdownHandle(id)
    }

    /// Remove a previously registered command
    pub fn deregister(&self, handle: PreShutdownHandle) {
        self.entries.lock().retain(|(id, _)| *id != handle.0);
    }

    /// Snapshot the registered commands in registration order
    #[must_use]
    pub fn drain(&self) -> Vec<Command> {
        self.entries
            .lock()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }
}
