//! Test helpers for integration tests
//!
//! An in-process mock gateway: a channel-backed transport whose server end
//! is handed to the test, a canned endpoint resolver, and an event sink
//! that collects everything the client dispatches.

use async_trait::async_trait;
use gatewire_client::{
    Connector, EndpointResolver, EventSink, GatewayClient, GatewayConfig, GatewayEndpoint,
    SessionStartLimit, TokenSource, TransportError, TransportMessage, TransportReader,
    TransportWriter,
};
use gatewire_protocol::{decode_command, Command, Event, RawEnvelope};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Generous per-step deadline; scenario tests should never hit it
pub const STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize test logging once
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// The server side of one mock transport connection
///
/// Frames the client writes arrive on `from_client`; anything pushed to
/// `to_client` comes out of the client's reader.
pub struct ServerEnd {
    to_client: mpsc::UnboundedSender<TransportMessage>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    /// Push a raw text frame to the client
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(TransportMessage::Text(text.into()));
    }

    /// Push an envelope to the client
    pub fn send_envelope(&self, envelope: &RawEnvelope) {
        self.send_text(envelope.to_json().expect("envelope encodes"));
    }

    /// Simulate the peer closing the connection
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.to_client.send(TransportMessage::Closed {
            code,
            reason: reason.to_string(),
        });
    }

    /// Receive the next command the client sent
    pub async fn recv_command(&mut self) -> Command {
        let frame = tokio::time::timeout(STEP_TIMEOUT, self.from_client.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client writer dropped");
        decode_command(&frame).expect("client sent a decodable command")
    }

    /// Receive the next non-heartbeat command, acknowledging any heartbeats
    /// absorbed along the way
    pub async fn recv_command_skipping_heartbeats(&mut self) -> Command {
        loop {
            match self.recv_command().await {
                Command::Heartbeat(_) => self.send_envelope(&RawEnvelope::heartbeat_ack()),
                other => return other,
            }
        }
    }
}

/// Connector producing channel-backed connections
///
/// Each accepted connection's [`ServerEnd`] is delivered to the receiver
/// returned by [`MockConnector::new`], in connection order.
pub struct MockConnector {
    accepted: mpsc::UnboundedSender<ServerEnd>,
    connections: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEnd>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                accepted: tx,
                connections: AtomicUsize::new(0),
            }),
            rx,
        )
    }

    /// How many connections have been opened so far
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _url: &str,
    ) -> Result<(Box<dyn TransportWriter>, Box<dyn TransportReader>), TransportError> {
        let (to_client, client_rx) = mpsc::unbounded_channel();
        let (client_tx, from_client) = mpsc::unbounded_channel();

        let server = ServerEnd {
            to_client,
            from_client,
        };
        self.accepted
            .send(server)
            .map_err(|_| TransportError::Connect("test harness dropped".to_string()))?;

        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok((
            Box::new(MockWriter { tx: client_tx }),
            Box::new(MockReader { rx: client_rx }),
        ))
    }
}

struct MockWriter {
    tx: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl TransportWriter for MockWriter {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(text)
            .map_err(|_| TransportError::ClosedNormally)
    }

    async fn close(&mut self, _reconnect_intended: bool) -> Result<(), TransportError> {
        Ok(())
    }
}

struct MockReader {
    rx: mpsc::UnboundedReceiver<TransportMessage>,
}

#[async_trait]
impl TransportReader for MockReader {
    async fn recv(&mut self) -> Result<TransportMessage, TransportError> {
        match self.rx.recv().await {
            Some(message) => Ok(message),
            // Server end dropped without a close frame.
            None => Ok(TransportMessage::Closed {
                code: 1006,
                reason: "connection reset".to_string(),
            }),
        }
    }
}

/// Resolver returning a canned endpoint
pub struct MockResolver {
    remaining: AtomicUsize,
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(1000),
        })
    }
}

#[async_trait]
impl EndpointResolver for MockResolver {
    async fn resolve(&self) -> Result<GatewayEndpoint, anyhow::Error> {
        Ok(GatewayEndpoint {
            url: "ws://mock.gateway/".to_string(),
            session_start_limit: SessionStartLimit {
                total: 1000,
                remaining: self.remaining.load(Ordering::SeqCst) as u32,
                reset_after: Duration::from_secs(1),
            },
            recommended_shards: 1,
        })
    }
}

/// Sink that collects every dispatched event
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Event>>,
}

impl CollectingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for CollectingSink {
    fn submit(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// A fully wired client against the mock gateway
pub struct TestHarness {
    pub client: Arc<GatewayClient>,
    pub connector: Arc<MockConnector>,
    pub accepted: mpsc::UnboundedReceiver<ServerEnd>,
    pub sink: Arc<CollectingSink>,
}

impl TestHarness {
    pub fn new(config: GatewayConfig) -> Self {
        init_tracing();

        let (connector, accepted) = MockConnector::new();
        let sink = CollectingSink::new();
        let token: Arc<dyn TokenSource> = Arc::new("test-token".to_string());

        let client = Arc::new(GatewayClient::new(
            config,
            token,
            MockResolver::new(),
            Arc::clone(&connector) as Arc<dyn Connector>,
            Arc::clone(&sink) as Arc<dyn EventSink>,
        ));

        Self {
            client,
            connector,
            accepted,
            sink,
        }
    }

    /// Wait for the client to open its next connection
    pub async fn accept(&mut self) -> ServerEnd {
        tokio::time::timeout(STEP_TIMEOUT, self.accepted.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("connector dropped")
    }

    /// Poll until the client reports the given status
    pub async fn wait_for_status(&self, status: gatewire_client::ConnectionStatus) {
        let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
        while self.client.status() != status {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for status {status}, still {}",
                self.client.status(),
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until the sink holds at least `count` events
    pub async fn wait_for_events(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
        while self.sink.len() < count {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} events, have {}",
                self.sink.len(),
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
