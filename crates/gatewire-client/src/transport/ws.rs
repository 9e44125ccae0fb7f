//! WebSocket transport over tokio-tungstenite

use super::{Connector, TransportError, TransportMessage, TransportReader, TransportWriter};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code sent when a reconnect is intended; anything other than a
/// normal closure keeps the session resumable on the remote side.
const RECONNECT_CLOSE_CODE: u16 = 4000;

/// Connector producing real WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Create a WebSocket connector
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportWriter>, Box<dyn TransportReader>), TransportError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(url = %url, "WebSocket connected");

        let (sink, source) = stream.split();
        Ok((
            Box::new(WsWriter { sink }),
            Box::new(WsReader { source }),
        ))
    }
}

struct WsWriter {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportWriter for WsWriter {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.sink.send(Message::Text(text.into())).await.map_err(map_ws_error)
    }

    async fn close(&mut self, reconnect_intended: bool) -> Result<(), TransportError> {
        let code = if reconnect_intended {
            WsCloseCode::from(RECONNECT_CLOSE_CODE)
        } else {
            WsCloseCode::Normal
        };

        let frame = CloseFrame {
            code,
            reason: "".into(),
        };

        match self.sink.send(Message::Close(Some(frame))).await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }
}

struct WsReader {
    source: SplitStream<WsStream>,
}

#[async_trait]
impl TransportReader for WsReader {
    async fn recv(&mut self) -> Result<TransportMessage, TransportError> {
        loop {
            match self.source.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(TransportMessage::Text(text.to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((TransportMessage::NORMAL_CLOSURE, String::new()));
                    return Ok(TransportMessage::Closed { code, reason });
                }
                // Control frames are handled by tungstenite; binary frames
                // are not part of this protocol.
                Some(Ok(other)) => {
                    tracing::trace!(kind = ?other, "skipping non-text frame");
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Ok(TransportMessage::Closed {
                        code: 1006,
                        reason: "connection reset".to_string(),
                    });
                }
                Some(Err(e)) => return Err(TransportError::Recv(e.to_string())),
            }
        }
    }
}

fn map_ws_error(error: WsError) -> TransportError {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::ClosedNormally,
        other => TransportError::Send(other.to_string()),
    }
}
