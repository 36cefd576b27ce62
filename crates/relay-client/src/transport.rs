//! Transport abstraction and the production WebSocket implementation.
//!
//! The connection handle talks to the wire through the [`Transport`] seam:
//! `open` yields a sink/stream pair speaking classified frames. Production
//! uses [`WsTransport`] over `tokio-tungstenite`; tests substitute a
//! channel-backed transport that counts open calls.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use relay_core::TransportError;
use relay_wire::{ClientFrame, ServerFrame, codec};

type WsConn = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Boxed outbound half of an open transport.
pub type BoxedSink = Box<dyn FrameSink>;
/// Boxed inbound half of an open transport.
pub type BoxedStream = Box<dyn FrameStream>;

/// Outbound half of an open transport.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one frame.
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError>;
    /// Close the transport. Best-effort; errors are swallowed.
    async fn close(&mut self);
}

/// Inbound half of an open transport.
#[async_trait]
pub trait FrameStream: Send {
    /// Next inbound frame. `None` when the peer closed the channel.
    async fn next(&mut self) -> Option<Result<ServerFrame, TransportError>>;
}

/// Factory for physical transport sessions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a new transport to `endpoint`.
    async fn open(&self, endpoint: &str) -> Result<(BoxedSink, BoxedStream), TransportError>;
}

/// Production transport over `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, endpoint: &str) -> Result<(BoxedSink, BoxedStream), TransportError> {
        let (ws, _response) =
            connect_async(endpoint)
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    endpoint: endpoint.to_owned(),
                    reason: e.to_string(),
                })?;
        let (tx, rx) = ws.split();
        Ok((Box::new(WsSink { inner: tx }), Box::new(WsFrameStream { inner: rx })))
    }
}

struct WsSink {
    inner: SplitSink<WsConn, WsMessage>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: ClientFrame) -> Result<(), TransportError> {
        let text = codec::encode(&frame)?;
        self.inner
            .send(WsMessage::Text(text.into()))
            .await
            .map_err(|e| TransportError::SendFailed {
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) {
        let _ = self.inner.send(WsMessage::Close(None)).await;
        let _ = self.inner.close().await;
    }
}

struct WsFrameStream {
    inner: SplitStream<WsConn>,
}

#[async_trait]
impl FrameStream for WsFrameStream {
    async fn next(&mut self) -> Option<Result<ServerFrame, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(WsMessage::Text(text)) => return Some(codec::decode(&text)),
                Ok(WsMessage::Binary(data)) => match std::str::from_utf8(&data) {
                    Ok(text) => return Some(codec::decode(text)),
                    Err(_) => {
                        return Some(Err(TransportError::MalformedFrame {
                            detail: "non-UTF8 binary frame".into(),
                        }));
                    }
                },
                Ok(WsMessage::Close(frame)) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by server".into());
                    return Some(Err(TransportError::ConnectionClosed { reason }));
                }
                // Protocol-level keepalive frames are handled by tungstenite.
                Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => {}
                Err(e) => {
                    return Some(Err(TransportError::ConnectionClosed {
                        reason: e.to_string(),
                    }));
                }
            }
        }
    }
}
