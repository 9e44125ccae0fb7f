//! Outbound command rate limiter
//!
//! The remote service allows a fixed number of commands per rolling window.
//! A deterministic number of slots is reserved for heartbeats (they bypass
//! the limiter but still consume remote capacity), plus a configurable
//! headroom buffer for timing slop. Owned by the sender loop, so no
//! synchronization is needed.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling window over which the command ceiling applies
pub const WINDOW: Duration = Duration::from_secs(60);

/// Heartbeat reservations above this count are nonsensical (the configured
/// interval would be under two seconds) and disable reservation entirely.
pub const RESERVATION_DISABLE_THRESHOLD: u64 = 30;

/// Result of asking the limiter for a send slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// A slot was taken; send now
    Ready,
    /// No slot available; retry after the given delay
    RetryAfter(Duration),
}

/// Token-bucket-style limiter for one physical connection
#[derive(Debug)]
pub struct CommandRateLimiter {
    capacity: usize,
    sent: VecDeque<Instant>,
}

impl CommandRateLimiter {
    /// Create a limiter for a connection with the given heartbeat interval
    ///
    /// Capacity is `ceiling - reserved - headroom`, where `reserved` is the
    /// heartbeat count per window rounded up. The reservation is dropped
    /// entirely when it exceeds [`RESERVATION_DISABLE_THRESHOLD`]; that
    /// guard is deliberate, not a rounding artifact.
    #[must_use]
    pub fn new(ceiling: u16, heartbeat_interval: Duration, headroom: u16) -> Self {
        let reserved = reserved_heartbeat_slots(heartbeat_interval);
        let capacity = u64::from(ceiling)
            .saturating_sub(reserved)
            .saturating_sub(u64::from(headroom))
            .max(1);

        Self {
            capacity: usize::try_from(capacity).unwrap_or(1),
            sent: VecDeque::new(),
        }
    }

    /// The number of command slots per window after reservations
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Try to take a send slot
    ///
    /// On [`Acquire::Ready`] the slot is consumed; on
    /// [`Acquire::RetryAfter`] nothing is consumed and the caller may retry
    /// after the returned delay.
    pub fn acquire(&mut self, now: Instant) -> Acquire {
        while let Some(&oldest) = self.sent.front() {
            if now.saturating_duration_since(oldest) >= WINDOW {
                self.sent.pop_front();
            } else {
                break;
            }
        }

        if self.sent.len() < self.capacity {
            self.sent.push_back(now);
            return Acquire::Ready;
        }

        // Front is the oldest in-window send; its expiry frees a slot.
        match self.sent.front() {
            Some(&oldest) => {
                Acquire::RetryAfter(WINDOW.saturating_sub(now.saturating_duration_since(oldest)))
            }
            None => Acquire::RetryAfter(WINDOW),
        }
    }
}

/// Heartbeats per window, rounded up, or zero above the disable threshold
fn reserved_heartbeat_slots(interval: Duration) -> u64 {
    let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    if interval_ms == 0 {
        return 0;
    }

    let window_ms = u64::try_from(WINDOW.as_millis()).unwrap_or(u64::MAX);
    let reserved = window_ms.div_ceil(interval_ms);

    if reserved > RESERVATION_DISABLE_THRESHOLD {
        0
    } else {
        reserved
    }
}
