// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transport abstraction for the render channel.
//!
//! A [`Connector`] opens a [`Connection`]: a pair of text-frame queues. The
//! channel supervisor only ever sees those queues, so any framing can plug in
//! behind the trait:
//! - [`WsConnector`]: one JSON message per WebSocket text frame (the render service)
//! - [`TcpConnector`]: newline-delimited JSON over plain TCP

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Frames buffered in each direction
const FRAME_BUFFER: usize = 64;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not reach the service
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        /// Address tried
        addr: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// The WebSocket handshake failed
    #[error("Failed to open {url}: {source}")]
    Handshake {
        /// Endpoint tried
        url: String,
        /// Underlying error
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    /// The connection was closed
    #[error("Connection closed")]
    Closed,
}

/// An open connection, as a pair of text-frame queues.
///
/// `incoming` yields `None` once the peer goes away; sending on `outgoing`
/// fails once the connection is gone.
#[derive(Debug)]
pub struct Connection {
    /// Frames to the service
    pub outgoing: mpsc::Sender<String>,
    /// Frames from the service
    pub incoming: mpsc::Receiver<String>,
}

/// Opens connections to the render service
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection
    async fn connect(&self) -> Result<Connection, TransportError>;
}

/// Choose a transport for a configured endpoint.
///
/// `ws://` and `wss://` URLs get a [`WsConnector`]; `tcp://host:port` or a
/// bare `host:port` gets a [`TcpConnector`].
pub fn connector_for(endpoint: &str) -> Arc<dyn Connector> {
    if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
        return Arc::new(WsConnector::new(endpoint));
    }
    let addr = endpoint.strip_prefix("tcp://").unwrap_or(endpoint);
    Arc::new(TcpConnector::new(addr))
}

/// JSON text frames over a WebSocket
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Connect to a `ws://` URL such as `ws://127.0.0.1:8000/ws/preview`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|source| TransportError::Handshake {
                url: self.url.clone(),
                source: Box::new(source),
            })?;
        let (mut sink, mut frames) = stream.split();

        let (incoming_tx, incoming) = mpsc::channel::<String>(FRAME_BUFFER);
        let (outgoing, mut outgoing_rx) = mpsc::channel::<String>(FRAME_BUFFER);

        // Reader: text frames only; control frames are handled by the socket
        tokio::spawn(async move {
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!("Render channel read failed: {err}");
                        break;
                    }
                }
            }
        });

        // Writer: one text frame per message, then a close frame
        tokio::spawn(async move {
            while let Some(frame) = outgoing_rx.recv().await {
                if let Err(err) = sink.send(Message::Text(frame)).await {
                    tracing::warn!("Render channel write failed: {err}");
                    return;
                }
            }
            sink.close().await.ok();
        });

        Ok(Connection { outgoing, incoming })
    }
}

/// Newline-delimited JSON over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    /// Connect to `host:port`
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Target address
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| TransportError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        let (read_half, mut write_half) = stream.into_split();

        let (incoming_tx, incoming) = mpsc::channel::<String>(FRAME_BUFFER);
        let (outgoing, mut outgoing_rx) = mpsc::channel::<String>(FRAME_BUFFER);

        // Reader: one frame per line; dropping the sender signals closure
        tokio::spawn(async move {
            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => {
                        if incoming_tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::warn!("Render channel read failed: {err}");
                        break;
                    }
                }
            }
        });

        // Writer: newline-terminated frames until either side goes away
        tokio::spawn(async move {
            while let Some(mut frame) = outgoing_rx.recv().await {
                frame.push('\n');
                if let Err(err) = write_half.write_all(frame.as_bytes()).await {
                    tracing::warn!("Render channel write failed: {err}");
                    break;
                }
            }
        });

        Ok(Connection { outgoing, incoming })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_frames_are_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = socket.into_split();
            write_half.write_all(b"{\"type\":\"pong\"}\n\n").await.unwrap();
            let mut lines = BufReader::new(read_half).lines();
            lines.next_line().await.unwrap()
        });

        let mut connection = TcpConnector::new(addr).connect().await.unwrap();
        assert_eq!(connection.incoming.recv().await.as_deref(), Some("{\"type\":\"pong\"}"));

        connection.outgoing.send("{\"type\":\"ping\"}".into()).await.unwrap();
        assert_eq!(server.await.unwrap().as_deref(), Some("{\"type\":\"ping\"}"));

        // Server side dropped: the incoming queue ends
        assert_eq!(connection.incoming.recv().await, None);
    }

    #[tokio::test]
    async fn test_websocket_frames_are_messages() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/preview", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(socket).await.unwrap();
            socket.send(Message::Text("{\"type\":\"pong\"}".into())).await.unwrap();
            socket.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
            let request = socket.next().await.unwrap().unwrap();
            socket.close(None).await.unwrap();
            request
        });

        let mut connection = connector_for(&url).connect().await.unwrap();
        assert_eq!(connection.incoming.recv().await.as_deref(), Some("{\"type\":\"pong\"}"));

        connection.outgoing.send("{\"type\":\"ping\"}".into()).await.unwrap();
        assert_eq!(server.await.unwrap(), Message::Text("{\"type\":\"ping\"}".into()));

        // Closed by the service: the incoming queue ends
        assert_eq!(connection.incoming.recv().await, None);
    }

    #[tokio::test]
    async fn test_websocket_handshake_failure_names_url() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/preview", listener.local_addr().unwrap());
        drop(listener);

        let err = WsConnector::new(url.clone()).connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Handshake { url: ref tried, .. } if *tried == url));
    }

    #[tokio::test]
    async fn test_connect_failure_names_address() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpConnector::new(addr.clone()).connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { addr: ref tried, .. } if *tried == addr));
    }
}
