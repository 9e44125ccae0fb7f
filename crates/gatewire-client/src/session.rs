//! Logical session state
//!
//! A session identifies one logical conversation with the remote service,
//! independent of any single physical connection. It is created empty,
//! populated by a successful identify, preserved across resumes, and wiped
//! on fatal invalidation or shutdown.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared, concurrently-read session state
///
/// The receiver loop writes the sequence number; everything else is written
/// only by the lifecycle machine. Sequence storage is offset by one so zero
/// can mean "no event observed yet" in a single atomic word.
#[derive(Debug, Default)]
pub struct Session {
    id: Mutex<Option<String>>,
    resume_url: Mutex<Option<String>>,
    last_sequence: AtomicU64,
    resumable: AtomicBool,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful identify
    pub fn record_ready(&self, session_id: String, resume_url: Option<String>) {
        *self.id.lock() = Some(session_id);
        *self.resume_url.lock() = resume_url;
        self.resumable.store(true, Ordering::SeqCst);
    }

    /// Get the current session ID, if identified
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.id.lock().clone()
    }

    /// Get the endpoint to use for a resume attempt
    #[must_use]
    pub fn resume_url(&self) -> Option<String> {
        self.resume_url.lock().clone()
    }

    /// Record the sequence number of a received dispatch
    ///
    /// Called in strict receive order, so the stored value is always the
    /// most recently observed sequence.
    pub fn observe_sequence(&self, seq: u64) {
        self.last_sequence.store(seq.saturating_add(1), Ordering::SeqCst);
    }

    /// The last observed dispatch sequence number
    #[must_use]
    pub fn last_sequence(&self) -> Option<u64> {
        match self.last_sequence.load(Ordering::SeqCst) {
            0 => None,
            offset => Some(offset - 1),
        }
    }

    /// Mark whether the current disconnect permits a resume
    pub fn set_resumable(&self, resumable: bool) {
        self.resumable.store(resumable, Ordering::SeqCst);
    }

    /// Whether a resume may be attempted: requires a session ID and the
    /// resumable flag
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.resumable.load(Ordering::SeqCst) && self.id.lock().is_some()
    }

    /// Discard all session state
    ///
    /// The next connect performs a fresh identify.
    pub fn wipe(&self) {
        *self.id.lock() = None;
        *self.resume_url.lock() = None;
        self.last_sequence.store(0, Ordering::SeqCst);
        self.resumable.store(false, Ordering::SeqCst);
    }
}
