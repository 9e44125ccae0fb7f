//! Heartbeat and session timing state
//!
//! Shared between the sender loop (writes `last_sent`), the receiver loop
//! (writes `last_ack`/`last_event`), and the lifecycle machine (reads all
//! three for its liveness check). Each timestamp is a single atomic word —
//! milliseconds since a per-struct epoch, offset by one so zero means unset —
//! so reads and writes are point-in-time and never torn. No ordering beyond
//! "most recent write wins" is assumed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Shortest sleep the sender loop is allowed between deadline checks
const MIN_SLEEP: Duration = Duration::from_millis(5);

/// Longest sleep the sender loop is allowed between deadline checks
const MAX_SLEEP: Duration = Duration::from_millis(50);

/// Connection timing state for one gateway client
///
/// Reset whenever the physical connection is replaced; the interval and
/// safety margin are fixed for the lifetime of one connection.
#[derive(Debug)]
pub struct HeartbeatTiming {
    epoch: Instant,
    interval_ms: AtomicU64,
    margin_ms: AtomicU64,
    reset_at: AtomicU64,
    last_sent: AtomicU64,
    last_ack: AtomicU64,
    last_event: AtomicU64,
    latency_ms: AtomicU64,
    configured_margin: Duration,
    min_margin: Duration,
}

impl HeartbeatTiming {
    /// Create timing state with the configured safety margin bounds
    #[must_use]
    pub fn new(configured_margin: Duration, min_margin: Duration) -> Self {
        Self {
            epoch: Instant::now(),
            interval_ms: AtomicU64::new(0),
            margin_ms: AtomicU64::new(0),
            reset_at: AtomicU64::new(0),
            last_sent: AtomicU64::new(0),
            last_ack: AtomicU64::new(0),
            last_event: AtomicU64::new(0),
            latency_ms: AtomicU64::new(0),
            configured_margin,
            min_margin,
        }
    }

    /// Adopt a new physical connection's heartbeat interval
    ///
    /// Clears all three timestamps. The safety margin is clamped so it is
    /// never below the configured floor and never more than a tenth of the
    /// interval, so a pathologically short interval cannot produce a margin
    /// that consumes the whole window.
    pub fn reset(&self, now: Instant, interval: Duration) {
        let margin = self
            .configured_margin
            .max(self.min_margin)
            .min(interval / 10);

        self.interval_ms.store(as_ms(interval), Ordering::SeqCst);
        self.margin_ms.store(as_ms(margin), Ordering::SeqCst);
        self.reset_at.store(self.stamp(now), Ordering::SeqCst);
        self.last_sent.store(0, Ordering::SeqCst);
        self.last_ack.store(0, Ordering::SeqCst);
        self.last_event.store(0, Ordering::SeqCst);
    }

    /// The server-dictated heartbeat interval
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    /// The effective safety margin for the current connection
    #[must_use]
    pub fn safety_margin(&self) -> Duration {
        Duration::from_millis(self.margin_ms.load(Ordering::SeqCst))
    }

    /// Record that a heartbeat was sent
    pub fn record_sent(&self, now: Instant) {
        self.last_sent.store(self.stamp(now), Ordering::SeqCst);
    }

    /// Record a heartbeat acknowledgement and recompute latency
    pub fn record_ack(&self, now: Instant) {
        let stamp = self.stamp(now);
        self.last_ack.store(stamp, Ordering::SeqCst);

        if let Some(sent) = load(&self.last_sent) {
            let latency = (stamp - 1).saturating_sub(sent);
            self.latency_ms.store(latency, Ordering::SeqCst);
        }
    }

    /// Record that any envelope arrived
    pub fn record_event(&self, now: Instant) {
        self.last_event.store(self.stamp(now), Ordering::SeqCst);
    }

    /// Latency of the last completed heartbeat round-trip
    ///
    /// Zero until the first acknowledgement arrives.
    #[must_use]
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms.load(Ordering::SeqCst))
    }

    /// Whether a heartbeat must be sent now
    ///
    /// Due immediately after a reset (no heartbeat sent yet), then every
    /// `interval - margin` thereafter.
    #[must_use]
    pub fn heartbeat_due(&self, now: Instant) -> bool {
        match load(&self.last_sent) {
            None => true,
            Some(sent) => self.elapsed_ms(now).saturating_sub(sent) >= self.deadline_ms(),
        }
    }

    /// The single authoritative "the link is dead" signal
    ///
    /// True iff an acknowledgement is overdue (last ack older than the last
    /// sent heartbeat) and nothing at all has arrived within
    /// `interval - margin`. A true result is fatal to the current physical
    /// connection.
    #[must_use]
    pub fn is_connection_silent(&self, now: Instant) -> bool {
        let Some(sent) = load(&self.last_sent) else {
            return false;
        };
        if self.interval_ms.load(Ordering::SeqCst) == 0 {
            return false;
        }

        let ack_overdue = match load(&self.last_ack) {
            None => true,
            Some(ack) => ack < sent,
        };
        if !ack_overdue {
            return false;
        }

        // Fall back to the reset time when nothing has arrived yet on this
        // connection.
        let last_activity = load(&self.last_event)
            .or_else(|| load(&self.reset_at))
            .unwrap_or(0);

        self.elapsed_ms(now).saturating_sub(last_activity) >= self.deadline_ms()
    }

    /// Longest the sender loop may sleep before re-checking the heartbeat
    /// deadline
    ///
    /// Clamped to a small positive range to keep heartbeat jitter low
    /// without busy-spinning.
    #[must_use]
    pub fn allowed_sleep_budget(&self, now: Instant) -> Duration {
        let base = load(&self.last_sent)
            .or_else(|| load(&self.reset_at))
            .unwrap_or(0);
        let due_at = base + self.deadline_ms();
        let remaining = due_at.saturating_sub(self.elapsed_ms(now));

        Duration::from_millis(remaining).clamp(MIN_SLEEP, MAX_SLEEP)
    }

    fn deadline_ms(&self) -> u64 {
        self.interval_ms
            .load(Ordering::SeqCst)
            .saturating_sub(self.margin_ms.load(Ordering::SeqCst))
    }

    fn elapsed_ms(&self, now: Instant) -> u64 {
        as_ms(now.saturating_duration_since(self.epoch))
    }

    // Timestamps are stored offset by one so zero can mean "unset".
    fn stamp(&self, now: Instant) -> u64 {
        self.elapsed_ms(now) + 1
    }
}

fn as_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn load(cell: &AtomicU64) -> Option<u64> {
    match cell.load(Ordering::SeqCst) {
        0 => None,
        stamp => Some(stamp - 1),
    }
}
