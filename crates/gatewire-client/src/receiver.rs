//! Inbound receiver loop
//!
//! Owns the reader half of the transport for the lifetime of one physical
//! connection. Decodes each text frame, updates session and timing state,
//! and forwards dispatch events to the sink. Exits `Ok` when the server
//! asks for a reconnect or closes cleanly; any other termination is an
//! error the lifecycle machine classifies.

use crate::dispatch::EventSink;
use crate::error::{GatewayError, GatewayResult};
use crate::session::Session;
use crate::signals::ConnectionSignals;
use crate::timing::HeartbeatTiming;
use crate::transport::{TransportError, TransportMessage, TransportReader};
use gatewire_protocol::{decode_incoming, CloseCode, Event, Incoming};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Read deadline as a multiple of the heartbeat interval; the server sends
/// at least an acknowledgement per interval on a live connection.
const READ_TIMEOUT_FACTOR: u32 = 2;

/// Fallback read deadline when the interval is somehow unset
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) struct ReceiverTask {
    pub reader: Box<dyn TransportReader>,
    pub timing: Arc<HeartbeatTiming>,
    pub session: Arc<Session>,
    pub sink: Arc<dyn EventSink>,
    pub signals: Arc<ConnectionSignals>,
    pub cancel: CancellationToken,
    pub strict_decoding: bool,
}

/// What one handled envelope means for the loop
enum Step {
    Continue,
    Stop,
}

impl ReceiverTask {
    pub async fn run(mut self) -> GatewayResult<()> {
        loop {
            let deadline = self.read_deadline();

            let message = tokio::select! {
                () = self.cancel.cancelled() => return Ok(()),
                received = tokio::time::timeout(deadline, self.reader.recv()) => {
                    match received {
                        Ok(result) => result,
                        Err(_) => {
                            return Err(GatewayError::Timeout(
                                "no inbound traffic within twice the heartbeat interval",
                            ));
                        }
                    }
                }
            };

            match message {
                Ok(TransportMessage::Text(text)) => match self.handle_frame(&text)? {
                    Step::Continue => {}
                    Step::Stop => return Ok(()),
                },
                Ok(TransportMessage::Closed { code, reason }) => {
                    return close_result(code, reason);
                }
                Err(TransportError::ClosedNormally) => return Ok(()),
                Err(e) => return Err(GatewayError::Transport(e)),
            }
        }
    }

    fn handle_frame(&self, text: &str) -> GatewayResult<Step> {
        let incoming = decode_incoming(text, self.strict_decoding)?;

        match incoming {
            Incoming::Dispatch { seq, event } => {
                self.session.observe_sequence(seq);
                self.timing.record_event(Instant::now());
                tracing::trace!(seq, event = ?event.event_type(), "dispatch received");
                self.sink.submit(event);
            }
            Incoming::HeartbeatAck => {
                self.timing.record_ack(Instant::now());
                tracing::trace!(latency_ms = self.timing.latency().as_millis() as u64, "heartbeat acknowledged");
            }
            Incoming::HeartbeatRequest => {
                tracing::debug!("server requested an immediate heartbeat");
                self.signals.request_heartbeat();
            }
            Incoming::Reconnect => {
                tracing::info!("server requested reconnect; session kept for resume");
                self.session.set_resumable(true);
                self.signals.set_reconnect();
                self.sink.submit(Event::Reconnect);
                return Ok(Step::Stop);
            }
            Incoming::InvalidSession { resumable } => {
                tracing::warn!(resumable, "server invalidated the session");
                self.session.set_resumable(resumable);
                self.signals.set_reconnect();
                self.sink.submit(Event::SessionInvalidated { resumable });
                return Ok(Step::Stop);
            }
            Incoming::Hello(_) => {
                // The handshake consumed the real hello before this loop
                // started.
                tracing::warn!("unexpected hello after handshake; ignoring");
            }
            Incoming::Unknown { op } => {
                tracing::debug!(op, "skipping envelope with unrecognized opcode");
            }
        }

        Ok(Step::Continue)
    }

    fn read_deadline(&self) -> Duration {
        let interval = self.timing.interval();
        if interval.is_zero() {
            DEFAULT_READ_TIMEOUT
        } else {
            interval * READ_TIMEOUT_FACTOR
        }
    }
}

fn close_result(code: u16, reason: String) -> GatewayResult<()> {
    if code == TransportMessage::NORMAL_CLOSURE {
        tracing::info!(code, "transport closed cleanly");
        return Ok(());
    }

    match CloseCode::from_u16(code) {
        Some(close_code) => Err(GatewayError::Close(close_code)),
        None => Err(GatewayError::TransportClosed { code, reason }),
    }
}
