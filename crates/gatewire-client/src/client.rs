//! Gateway client lifecycle
//!
//! The supervisor that owns the connect/identify/resume/reconnect state
//! machine. It opens the transport, drives the handshake, spawns the sender
//! and receiver loops under a connection-scoped cancellation token, and
//! classifies whatever ends a connection into retry, resume, or terminate.

use crate::config::{GatewayConfig, TokenSource};
use crate::dispatch::EventSink;
use crate::error::{GatewayError, GatewayResult};
use crate::queue::{CommandQueue, PreShutdownHandle, PreShutdownRegistry};
use crate::ratelimit::CommandRateLimiter;
use crate::receiver::ReceiverTask;
use crate::rest::EndpointResolver;
use crate::sender::SenderTask;
use crate::session::Session;
use crate::signals::ConnectionSignals;
use crate::status::{ConnectionStatus, StatusCell};
use crate::timing::HeartbeatTiming;
use crate::transport::{Connector, TransportMessage, TransportReader, TransportWriter};
use gatewire_protocol::{decode_incoming, CloseCode, Command, Event, Incoming, Resume};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long to wait for the initial hello envelope
const HELLO_TIMEOUT: Duration = Duration::from_secs(30);

/// Supervisor poll interval while connected
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(100);

/// Longest a graceful shutdown waits for the outbound queue to drain
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnect backoff bounds
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// A persistent, auto-reconnecting gateway connection
///
/// One instance owns one logical session across any number of physical
/// connections. [`GatewayClient::run`] is the single long-running entry
/// point; everything else is non-blocking submission or observation.
pub struct GatewayClient {
    config: GatewayConfig,
    token: Arc<dyn TokenSource>,
    resolver: Arc<dyn EndpointResolver>,
    connector: Arc<dyn Connector>,
    sink: Arc<dyn EventSink>,
    session: Arc<Session>,
    timing: Arc<HeartbeatTiming>,
    queue: Arc<CommandQueue>,
    pre_shutdown: Arc<PreShutdownRegistry>,
    status: StatusCell,
}

/// What one pass through the connect routine produced
enum ConnectionOutcome {
    /// Caller cancellation observed; everything already torn down
    Shutdown,
    /// The connection ended; the error decides what happens next
    Failed(GatewayError),
}

impl GatewayClient {
    /// Create a client; nothing connects until [`run`](Self::run) is called
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        token: Arc<dyn TokenSource>,
        resolver: Arc<dyn EndpointResolver>,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let timing = HeartbeatTiming::new(config.heartbeat_safety_margin, config.min_safety_margin);

        Self {
            config,
            token,
            resolver,
            connector,
            sink,
            session: Arc::new(Session::new()),
            timing: Arc::new(timing),
            queue: Arc::new(CommandQueue::new()),
            pre_shutdown: Arc::new(PreShutdownRegistry::new()),
            status: StatusCell::new(),
        }
    }

    /// Submit a command to the outbound queue; never blocks
    ///
    /// Queued commands survive reconnects: whatever was not sent on one
    /// physical connection goes out on the next.
    pub fn enqueue(&self, command: Command) {
        self.queue.enqueue(command);
    }

    /// Register a command to be sent once, just before a graceful shutdown
    pub fn register_pre_shutdown(&self, command: Command) -> PreShutdownHandle {
        self.pre_shutdown.register(command)
    }

    /// Remove a previously registered pre-shutdown command
    pub fn deregister_pre_shutdown(&self, handle: PreShutdownHandle) {
        self.pre_shutdown.deregister(handle);
    }

    /// Current lifecycle status
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.get()
    }

    /// Latency of the last heartbeat round-trip; zero until the first ack
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.timing.latency()
    }

    /// Run the connection until a terminal error or caller cancellation
    ///
    /// Cancelling `shutdown` drains registered pre-shutdown commands, closes
    /// the transport cleanly, and returns `Ok`. Errors classified as
    /// terminal are returned; everything else reconnects with backoff.
    pub async fn run(&self, shutdown: CancellationToken) -> GatewayResult<()> {
        let mut backoff = Backoff::new();

        loop {
            if shutdown.is_cancelled() {
                return self.finish_offline();
            }

            match self.connect_once(&shutdown, &mut backoff).await {
                ConnectionOutcome::Shutdown => {
                    return self.finish_offline();
                }
                ConnectionOutcome::Failed(error) => {
                    let disposition = error.classify();

                    if disposition.terminate {
                        tracing::error!(error = %error, "gateway connection failed terminally");
                        self.session.wipe();
                        self.status.set(ConnectionStatus::Offline);
                        return Err(error);
                    }

                    if disposition.with_new_session {
                        self.session.wipe();
                    }
                    self.status.set(ConnectionStatus::Disconnected);

                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %error,
                        delay_ms = delay.as_millis() as u64,
                        resume = self.session.can_resume(),
                        "gateway connection lost; reconnecting",
                    );

                    tokio::select! {
                        () = shutdown.cancelled() => return self.finish_offline(),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    fn finish_offline(&self) -> GatewayResult<()> {
        self.session.wipe();
        self.status.set(ConnectionStatus::Offline);
        tracing::info!("gateway client stopped");
        Ok(())
    }

    /// One full pass: resolve, connect, handshake, supervise until the
    /// connection ends for any reason
    async fn connect_once(
        &self,
        shutdown: &CancellationToken,
        backoff: &mut Backoff,
    ) -> ConnectionOutcome {
        let url = match self.resolve_endpoint(shutdown).await {
            Ok(Some(url)) => url,
            Ok(None) => return ConnectionOutcome::Shutdown,
            Err(e) => return ConnectionOutcome::Failed(e),
        };

        let (writer, mut reader) = match self.connector.connect(&url).await {
            Ok(halves) => halves,
            Err(e) => return ConnectionOutcome::Failed(GatewayError::Transport(e)),
        };

        // The first envelope must be a hello; anything else means we are
        // not speaking to a gateway.
        let hello = match self.await_hello(&mut reader).await {
            Ok(hello) => hello,
            Err(e) => return ConnectionOutcome::Failed(e),
        };

        let interval = Duration::from_millis(hello.heartbeat_interval);
        self.timing.reset(Instant::now(), interval);
        tracing::debug!(interval_ms = hello.heartbeat_interval, "hello received");

        // Fresh cancellation scope per physical connection.
        let conn = CancellationToken::new();
        let signals = Arc::new(ConnectionSignals::new());

        // The handshake command goes to the head of the queue before the
        // sender starts, so nothing left over from a previous connection
        // can precede it.
        let resuming = self.enqueue_handshake_command();
        let sender_handle = self.spawn_sender(writer, interval, &conn, &signals);

        let handshake = if resuming {
            self.resume_handshake(&mut reader, &signals, &conn).await
        } else {
            self.identify_handshake(&mut reader, &signals).await
        };

        if let Err(e) = handshake {
            conn.cancel();
            let _ = sender_handle.await;
            return ConnectionOutcome::Failed(e);
        }

        let receiver_handle = self.spawn_receiver(reader, &conn, &signals);

        self.status.set(ConnectionStatus::Connected);
        backoff.reset();
        tracing::info!("gateway connected");

        self.supervise(shutdown, conn, signals, sender_handle, receiver_handle)
            .await
    }

    /// Resolve the endpoint, waiting out an exhausted session-start allowance
    ///
    /// Returns `Ok(None)` if the caller cancelled while waiting.
    async fn resolve_endpoint(
        &self,
        shutdown: &CancellationToken,
    ) -> GatewayResult<Option<String>> {
        loop {
            let endpoint = self.resolver.resolve().await.map_err(|e| {
                GatewayError::internal(format!("failed to resolve gateway endpoint: {e}"), false, true)
            })?;

            let limit = &endpoint.session_start_limit;
            if limit.remaining == 0 {
                tracing::warn!(
                    reset_ms = limit.reset_after.as_millis() as u64,
                    "session starts exhausted; waiting for reset",
                );
                tokio::select! {
                    () = shutdown.cancelled() => return Ok(None),
                    () = tokio::time::sleep(limit.reset_after) => continue,
                }
            }

            // A resume goes back to the endpoint the session was issued on.
            let url = if self.session.can_resume() {
                self.session.resume_url().unwrap_or(endpoint.url)
            } else {
                endpoint.url
            };

            return Ok(Some(url));
        }
    }

    async fn await_hello(
        &self,
        reader: &mut Box<dyn TransportReader>,
    ) -> GatewayResult<gatewire_protocol::Hello> {
        let incoming = self
            .receive_incoming(reader, HELLO_TIMEOUT, "no hello envelope after connect")
            .await?;

        match incoming {
            Incoming::Hello(hello) => Ok(hello),
            other => Err(GatewayError::internal(
                format!("expected hello as the first envelope, got {other:?}"),
                false,
                true,
            )),
        }
    }

    /// Put the identify or resume command at the head of the outbound queue
    ///
    /// Returns whether a resume was enqueued. Any handshake command left
    /// queued by a connection that died before sending it is discarded
    /// first; replaying it after this connection authenticates would draw
    /// an already-authenticated close.
    fn enqueue_handshake_command(&self) -> bool {
        self.queue.discard_stale_handshakes();

        if self.session.can_resume() {
            if let Some(session_id) = self.session.id() {
                let seq = self.session.last_sequence().unwrap_or(0);
                tracing::info!(session_id = %session_id, seq, "resuming session");
                self.queue.enqueue_front(Command::Resume(Resume {
                    token: self.token.token(),
                    session_id,
                    seq,
                }));
                return true;
            }
        }

        self.enqueue_identify();
        false
    }

    fn enqueue_identify(&self) {
        let identify = self.config.identify_payload(self.token.token());
        self.queue.enqueue_front(Command::Identify(identify));
    }

    /// Establish a brand-new session
    ///
    /// Heartbeat acks are absorbed; the first dispatch must be the ready
    /// event. A reconnect or invalid-session here aborts the attempt with
    /// the server's resumability hint.
    async fn identify_handshake(
        &self,
        reader: &mut Box<dyn TransportReader>,
        signals: &Arc<ConnectionSignals>,
    ) -> GatewayResult<()> {
        let deadline = self.timing.interval() * 2;
        loop {
            let incoming = self
                .receive_incoming(reader, deadline, "no ready envelope after identify")
                .await?;

            match incoming {
                Incoming::HeartbeatAck => self.timing.record_ack(Instant::now()),
                Incoming::HeartbeatRequest => signals.request_heartbeat(),
                Incoming::Unknown { op } => {
                    tracing::debug!(op, "skipping unrecognized opcode during identify");
                }
                Incoming::Dispatch { seq, event } => match event {
                    Event::Ready(ready) => {
                        self.session.observe_sequence(seq);
                        self.timing.record_event(Instant::now());
                        self.session
                            .record_ready(ready.session_id.clone(), ready.resume_gateway_url.clone());
                        self.session.set_resumable(true);
                        tracing::info!(session_id = %ready.session_id, "session established");
                        self.sink.submit(Event::Ready(ready));
                        return Ok(());
                    }
                    other => {
                        return Err(GatewayError::internal(
                            format!(
                                "handshake violation: expected ready, got {:?}",
                                other.event_type(),
                            ),
                            false,
                            true,
                        ));
                    }
                },
                Incoming::Reconnect => {
                    return Err(GatewayError::internal(
                        "server requested reconnect during identify",
                        true,
                        false,
                    ));
                }
                Incoming::InvalidSession { resumable } => {
                    return Err(GatewayError::internal(
                        "session invalidated during identify",
                        resumable,
                        false,
                    ));
                }
                Incoming::Hello(_) => {
                    return Err(GatewayError::internal(
                        "handshake violation: second hello during identify",
                        false,
                        true,
                    ));
                }
            }
        }
    }

    /// Reattach to the previous session
    ///
    /// Every dispatch received before the resumed marker is backlog being
    /// replayed; all of it is forwarded to the sink in order. An invalid
    /// session falls back to a fresh identify on the same connection after
    /// a small randomized delay.
    async fn resume_handshake(
        &self,
        reader: &mut Box<dyn TransportReader>,
        signals: &Arc<ConnectionSignals>,
        conn: &CancellationToken,
    ) -> GatewayResult<()> {
        let deadline = self.timing.interval() * 2;
        loop {
            let incoming = self
                .receive_incoming(reader, deadline, "no resumed envelope after resume")
                .await?;

            match incoming {
                Incoming::HeartbeatAck => self.timing.record_ack(Instant::now()),
                Incoming::HeartbeatRequest => signals.request_heartbeat(),
                Incoming::Unknown { op } => {
                    tracing::debug!(op, "skipping unrecognized opcode during resume");
                }
                Incoming::Dispatch { seq, event } => {
                    self.session.observe_sequence(seq);
                    self.timing.record_event(Instant::now());

                    let resumed = matches!(event, Event::Resumed);
                    self.sink.submit(event);

                    if resumed {
                        tracing::info!(seq, "session resumed");
                        return Ok(());
                    }
                }
                Incoming::InvalidSession { .. } => {
                    // The session is gone; identify fresh on this same
                    // connection after a short randomized delay.
                    let delay = Duration::from_millis(rand::thread_rng().gen_range(1_000..=5_000));
                    tracing::warn!(
                        delay_ms = delay.as_millis() as u64,
                        "resume rejected; falling back to identify",
                    );
                    self.session.wipe();

                    tokio::select! {
                        () = conn.cancelled() => {
                            return Err(GatewayError::internal(
                                "connection cancelled during resume fallback",
                                false,
                                false,
                            ));
                        }
                        () = tokio::time::sleep(delay) => {}
                    }

                    self.enqueue_identify();
                    return self.identify_handshake(reader, signals).await;
                }
                Incoming::Reconnect => {
                    return Err(GatewayError::internal(
                        "server requested reconnect during resume",
                        true,
                        false,
                    ));
                }
                Incoming::Hello(_) => {
                    return Err(GatewayError::internal(
                        "handshake violation: second hello during resume",
                        false,
                        true,
                    ));
                }
            }
        }
    }

    async fn receive_incoming(
        &self,
        reader: &mut Box<dyn TransportReader>,
        deadline: Duration,
        timeout_message: &'static str,
    ) -> GatewayResult<Incoming> {
        let message = tokio::time::timeout(deadline, reader.recv())
            .await
            .map_err(|_| GatewayError::Timeout(timeout_message))??;

        match message {
            TransportMessage::Text(text) => {
                Ok(decode_incoming(&text, self.config.strict_decoding)?)
            }
            TransportMessage::Closed { code, reason } => match CloseCode::from_u16(code) {
                Some(close_code) => Err(GatewayError::Close(close_code)),
                None => Err(GatewayError::TransportClosed { code, reason }),
            },
        }
    }

    fn spawn_sender(
        &self,
        writer: Box<dyn TransportWriter>,
        interval: Duration,
        conn: &CancellationToken,
        signals: &Arc<ConnectionSignals>,
    ) -> JoinHandle<GatewayResult<()>> {
        let task = SenderTask {
            writer,
            queue: Arc::clone(&self.queue),
            timing: Arc::clone(&self.timing),
            session: Arc::clone(&self.session),
            limiter: CommandRateLimiter::new(
                self.config.commands_per_window,
                interval,
                self.config.heartbeat_headroom,
            ),
            signals: Arc::clone(signals),
            cancel: conn.clone(),
        };

        tokio::spawn(task.run())
    }

    fn spawn_receiver(
        &self,
        reader: Box<dyn TransportReader>,
        conn: &CancellationToken,
        signals: &Arc<ConnectionSignals>,
    ) -> JoinHandle<GatewayResult<()>> {
        let task = ReceiverTask {
            reader,
            timing: Arc::clone(&self.timing),
            session: Arc::clone(&self.session),
            sink: Arc::clone(&self.sink),
            signals: Arc::clone(signals),
            cancel: conn.clone(),
            strict_decoding: self.config.strict_decoding,
        };

        tokio::spawn(task.run())
    }

    /// Idle while connected, watching for either loop to finish or the
    /// caller to request shutdown
    async fn supervise(
        &self,
        shutdown: &CancellationToken,
        conn: CancellationToken,
        signals: Arc<ConnectionSignals>,
        sender_handle: JoinHandle<GatewayResult<()>>,
        receiver_handle: JoinHandle<GatewayResult<()>>,
    ) -> ConnectionOutcome {
        loop {
            if sender_handle.is_finished() || receiver_handle.is_finished() {
                break;
            }

            tokio::select! {
                () = shutdown.cancelled() => {
                    return self
                        .graceful_shutdown(conn, signals, sender_handle, receiver_handle)
                        .await;
                }
                () = tokio::time::sleep(SUPERVISE_INTERVAL) => {}
            }
        }

        // One loop ended; kill the sibling and collect both results.
        conn.cancel();
        let sender_result = flatten_join(sender_handle.await);
        let receiver_result = flatten_join(receiver_handle.await);

        let error = match (sender_result, receiver_result) {
            // The receiver's error usually carries the close code.
            (_, Err(e)) => e,
            (Err(e), Ok(())) => e,
            (Ok(()), Ok(())) => {
                if signals.should_reconnect() {
                    GatewayError::internal(
                        "server requested reconnect",
                        self.session.can_resume(),
                        false,
                    )
                } else {
                    GatewayError::internal("transport closed", true, false)
                }
            }
        };

        ConnectionOutcome::Failed(error)
    }

    /// Drain pre-shutdown commands, let the sender flush, then tear down
    async fn graceful_shutdown(
        &self,
        conn: CancellationToken,
        signals: Arc<ConnectionSignals>,
        sender_handle: JoinHandle<GatewayResult<()>>,
        receiver_handle: JoinHandle<GatewayResult<()>>,
    ) -> ConnectionOutcome {
        tracing::info!("shutdown requested; draining outbound queue");
        signals.begin_graceful_shutdown();

        for command in self.pre_shutdown.drain() {
            self.queue.enqueue(command);
        }

        let drain_deadline = Instant::now() + SHUTDOWN_DRAIN_TIMEOUT;
        while !self.queue.is_empty()
            && Instant::now() < drain_deadline
            && !sender_handle.is_finished()
        {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        if !self.queue.is_empty() {
            tracing::warn!(pending = self.queue.len(), "shutdown drain incomplete");
        }

        conn.cancel();
        let _ = flatten_join(sender_handle.await);
        let _ = flatten_join(receiver_handle.await);

        ConnectionOutcome::Shutdown
    }
}

fn flatten_join(result: Result<GatewayResult<()>, tokio::task::JoinError>) -> GatewayResult<()> {
    match result {
        Ok(inner) => inner,
        Err(e) => Err(GatewayError::internal(
            format!("connection task failed: {e}"),
            false,
            false,
        )),
    }
}

/// Exponential reconnect backoff with jitter
struct Backoff {
    attempt: u32,
}

impl Backoff {
    fn new() -> Self {
        Self { attempt: 0 }
    }

    fn next_delay(&mut self) -> Duration {
        let exp = BACKOFF_BASE
            .saturating_mul(2_u32.saturating_pow(self.attempt))
            .min(BACKOFF_MAX);
        self.attempt = self.attempt.saturating_add(1);

        exp + Duration::from_millis(rand::thread_rng().gen_range(0..=250))
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}
