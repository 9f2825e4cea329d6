/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Native WebSocket signaling socket using `tokio-tungstenite`.
//!
//! The socket is split into a writer task fed by an unbounded queue and a
//! reader task that forwards inbound text frames to a channel.  Sending never
//! blocks the caller, which lets the orchestration layer send from inside
//! synchronous event handlers.
//!
//! # Example
//!
//! ```no_run
//! use videocall_sfu_transport::SignalingSocket;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let (socket, mut inbound_rx) = SignalingSocket::connect("wss://sfu:443/signaling").await?;
//!
//! socket.send_text(r#"{"type":"getRtpCapabilities","data":{}}"#.to_string())?;
//!
//! while let Some(text) = inbound_rx.recv().await {
//!     println!("Received {text}");
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Capacity of the inbound text-frame channel.
const INBOUND_CHANNEL_CAPACITY: usize = 256;

/// Error type for signaling connection attempts.
///
/// Preserves the HTTP status code when the server rejects the WebSocket
/// upgrade (401 for a bad room token, 404 for an unknown room, ...).
#[derive(Debug, thiserror::Error)]
pub enum SignalingConnectError {
    /// The server rejected the upgrade with an HTTP error status.
    #[error("HTTP {status}: WebSocket upgrade rejected")]
    HttpError {
        /// The HTTP status code returned by the server.
        status: u16,
    },
    /// A transport-level or protocol-level error occurred.
    #[error("WebSocket connection failed: {0}")]
    Other(String),
}

impl SignalingConnectError {
    /// Returns the HTTP status code if this was an HTTP rejection, else `None`.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status } => Some(*status),
            Self::Other(_) => None,
        }
    }
}

/// A WebSocket carrying JSON signaling frames.
///
/// Cloning yields another handle to the same socket.
#[derive(Clone)]
pub struct SignalingSocket {
    outbound: mpsc::UnboundedSender<Message>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for SignalingSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingSocket")
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl SignalingSocket {
    /// Connect to a signaling endpoint.
    ///
    /// Returns the socket and a receiver of inbound text frames.  The
    /// receiver yields `None` once the server closes the connection or a read
    /// error occurs.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<String>)> {
        Self::try_connect(url).await.map_err(|e| anyhow!("{e}"))
    }

    /// Connect, returning a typed error on failure.
    pub async fn try_connect(
        url: &str,
    ) -> std::result::Result<(Self, mpsc::Receiver<String>), SignalingConnectError> {
        info!("Signaling socket connecting to {url}");

        let (ws_stream, response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| match e {
                    tokio_tungstenite::tungstenite::Error::Http(resp) => {
                        SignalingConnectError::HttpError {
                            status: resp.status().as_u16(),
                        }
                    }
                    other => SignalingConnectError::Other(format!(
                        "WebSocket connection to '{url}' failed: {other}"
                    )),
                })?;

        info!("Signaling socket connected to {url} (HTTP {})", response.status());

        Ok(Self::from_stream(ws_stream))
    }

    /// Split an established stream and spawn the reader and writer tasks.
    pub fn from_stream<S>(ws_stream: WebSocketStream<S>) -> (Self, mpsc::Receiver<String>)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let (mut writer, mut reader) = ws_stream.split();

        let closed = Arc::new(AtomicBool::new(false));
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        let closed_writer = closed.clone();
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let is_close = matches!(message, Message::Close(_));
                if let Err(e) = writer.send(message).await {
                    if !closed_writer.load(Ordering::Relaxed) {
                        warn!("Signaling socket send error: {e}");
                    }
                    closed_writer.store(true, Ordering::Relaxed);
                    break;
                }
                if is_close {
                    break;
                }
            }
            debug!("Signaling socket writer loop ended");
        });

        let closed_reader = closed.clone();
        tokio::spawn(async move {
            while let Some(msg_result) = reader.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Err(e) = inbound_tx.send(text).await {
                            debug!("Inbound channel closed: {e}");
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!("Signaling socket received close frame: {frame:?}");
                        break;
                    }
                    Ok(Message::Ping(payload)) => {
                        debug!("Signaling socket ping received ({} bytes)", payload.len());
                    }
                    Ok(Message::Pong(_)) => {
                        debug!("Signaling socket pong received");
                    }
                    Ok(Message::Binary(data)) => {
                        debug!(
                            "Signaling socket binary frame ignored ({} bytes, protocol uses text)",
                            data.len()
                        );
                    }
                    Ok(Message::Frame(_)) => {
                        debug!("Signaling socket raw frame ignored");
                    }
                    Err(e) => {
                        if !closed_reader.load(Ordering::Relaxed) {
                            error!("Signaling socket read error: {e}");
                        }
                        break;
                    }
                }
            }
            closed_reader.store(true, Ordering::Relaxed);
            debug!("Signaling socket reader loop ended");
        });

        let socket = Self {
            outbound: outbound_tx,
            closed,
        };
        (socket, inbound_rx)
    }

    /// Queue a text frame for sending.
    ///
    /// Fails if the socket has been closed; the frame is not queued.
    pub fn send_text(&self, text: String) -> Result<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(anyhow!("Signaling socket is closed"));
        }
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| anyhow!("Signaling socket writer has stopped"))
    }

    /// Whether the socket is still open.
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    /// Close the socket gracefully.  Calling this more than once is a no-op.
    pub fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            if self.outbound.send(Message::Close(None)).is_err() {
                debug!("Signaling socket writer already stopped before close");
            }
        }
    }
}
