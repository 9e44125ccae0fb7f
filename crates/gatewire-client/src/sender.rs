//! Outbound sender loop
//!
//! Owns the writer half of the transport for the lifetime of one physical
//! connection. Every iteration gives heartbeats absolute priority over
//! queued commands, then drains the command queue under the rate limiter.
//! Queued commands survive the loop; whatever was not sent stays queued
//! for the next connection.

use crate::error::{GatewayError, GatewayResult};
use crate::queue::CommandQueue;
use crate::ratelimit::{Acquire, CommandRateLimiter};
use crate::session::Session;
use crate::signals::ConnectionSignals;
use crate::timing::HeartbeatTiming;
use crate::transport::{TransportError, TransportWriter};
use gatewire_protocol::{encode_command, Command};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Whether a write reached the wire or found the transport already gone
enum SendOutcome {
    Sent,
    Closed,
}

pub(crate) struct SenderTask {
    pub writer: Box<dyn TransportWriter>,
    pub queue: Arc<CommandQueue>,
    pub timing: Arc<HeartbeatTiming>,
    pub session: Arc<Session>,
    pub limiter: CommandRateLimiter,
    pub signals: Arc<ConnectionSignals>,
    pub cancel: CancellationToken,
}

impl SenderTask {
    /// Run the loop to completion, closing the transport on every exit path
    pub async fn run(mut self) -> GatewayResult<()> {
        let result = self.run_inner().await;

        let reconnect_intended = !self.signals.is_graceful_shutdown();
        if let Err(e) = self.writer.close(reconnect_intended).await {
            tracing::debug!(error = %e, "transport close failed");
        }

        result
    }

    async fn run_inner(&mut self) -> GatewayResult<()> {
        loop {
            if self.cancel.is_cancelled() {
                return Ok(());
            }

            let now = Instant::now();

            // Heartbeats jump the queue and bypass the rate limiter.
            if self.signals.take_heartbeat_request() || self.timing.heartbeat_due(now) {
                if self.timing.is_connection_silent(now) {
                    return Err(GatewayError::internal(
                        "heartbeat unacknowledged and no traffic; connection presumed dead",
                        true,
                        false,
                    ));
                }

                let heartbeat = Command::Heartbeat(self.session.last_sequence());
                match self.send_command(&heartbeat).await? {
                    SendOutcome::Sent => {
                        self.timing.record_sent(Instant::now());
                        tracing::trace!("heartbeat sent");
                        continue;
                    }
                    SendOutcome::Closed => return Ok(()),
                }
            }

            let Some(command) = self.queue.peek() else {
                Self::idle(self.cancel.clone(), self.timing.allowed_sleep_budget(now)).await;
                continue;
            };

            match self.limiter.acquire(now) {
                Acquire::Ready => match self.send_command(&command).await? {
                    SendOutcome::Sent => {
                        self.queue.pop();
                        tracing::trace!(command = command.name(), "command sent");
                    }
                    SendOutcome::Closed => return Ok(()),
                },
                Acquire::RetryAfter(delay) => {
                    // Never sleep past the point where a heartbeat is due.
                    let budget = self.timing.allowed_sleep_budget(now);
                    Self::idle(self.cancel.clone(), delay.min(budget)).await;
                }
            }
        }
    }

    async fn send_command(&mut self, command: &Command) -> GatewayResult<SendOutcome> {
        let text = encode_command(command).map_err(|e| {
            GatewayError::internal(
                format!("failed to encode {} command: {e}", command.name()),
                true,
                false,
            )
        })?;

        match self.writer.send(text).await {
            Ok(()) => Ok(SendOutcome::Sent),
            Err(TransportError::ClosedNormally) => Ok(SendOutcome::Closed),
            Err(e) => Err(GatewayError::Transport(e)),
        }
    }

    // Takes the token by value: the idle future must not borrow the task,
    // whose writer half is not shareable across threads.
    async fn idle(cancel: CancellationToken, budget: Duration) {
        tokio::select! {
            () = cancel.cancelled() => {}
            () = tokio::time::sleep(budget) => {}
        }
    }
}
