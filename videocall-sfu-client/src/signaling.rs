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

//! Signaling glue: outbound requests, inbound routing.
//!
//! Outbound records are wrapped in an [`Envelope`] and written to the
//! [`SignalingChannel`].  Inbound text frames are decoded, offered to the
//! request correlator, and whatever is not a reply is published on the
//! [`CorrelationBus`] under its message type.

use crate::bus::CorrelationBus;
use crate::correlator::Correlator;
use crate::error::SessionError;
use log::{debug, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use videocall_sfu_transport::SignalingSocket;
use videocall_sfu_types::envelope::decode_payload;
use videocall_sfu_types::{Envelope, SignalingMessage, SignalingRequest};

/// A duplex, message-oriented connection to the SFU.
pub trait SignalingChannel: Send + Sync {
    /// Queue a text frame.  Returns `false` if the channel is not open.
    fn send_text(&self, text: String) -> bool;

    fn is_open(&self) -> bool;

    fn close(&self);
}

impl SignalingChannel for SignalingSocket {
    fn send_text(&self, text: String) -> bool {
        match SignalingSocket::send_text(self, text) {
            Ok(()) => true,
            Err(e) => {
                debug!("WebSocket send failed: {e}");
                false
            }
        }
    }

    fn is_open(&self) -> bool {
        self.is_connected()
    }

    fn close(&self) {
        SignalingSocket::close(self);
    }
}

pub(crate) struct Signaling {
    channel: RwLock<Option<Arc<dyn SignalingChannel>>>,
    bus: CorrelationBus,
    correlator: Correlator,
    cancel: CancellationToken,
    request_timeout: Duration,
}

impl Signaling {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            channel: RwLock::new(None),
            bus: CorrelationBus::new(),
            correlator: Correlator::new(),
            cancel: CancellationToken::new(),
            request_timeout,
        }
    }

    pub fn attach(&self, channel: Arc<dyn SignalingChannel>) {
        *self.channel.write() = Some(channel);
    }

    pub fn bus(&self) -> &CorrelationBus {
        &self.bus
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Number of requests awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.correlator.in_flight()
    }

    /// Fire-and-forget send.  Dropped when the channel is not open.
    pub fn notify<M: SignalingMessage>(&self, message: &M) {
        let Some(channel) = self.open_channel() else {
            debug!("Signaling channel not open, dropping '{}'", M::TYPE);
            return;
        };
        match Envelope::new(message, None).and_then(|envelope| envelope.encode()) {
            Ok(text) => {
                if !channel.send_text(text) {
                    debug!("Signaling channel closed, dropping '{}'", M::TYPE);
                }
            }
            Err(e) => warn!("Failed to encode '{}': {e}", M::TYPE),
        }
    }

    /// Send `request` and wait for its reply.
    ///
    /// Fails with `Timeout` after the request timeout, `Cancelled` once the
    /// session starts disconnecting, and `ChannelClosed` if the channel is not
    /// open or closes before the reply arrives.
    pub async fn request<R: SignalingRequest>(
        &self,
        request: &R,
    ) -> Result<R::Reply, SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Cancelled);
        }
        let channel = self.open_channel().ok_or(SessionError::ChannelClosed)?;

        let (id, reply_rx) = self.correlator.register(R::TYPE, R::REPLY);
        let _pending = self.correlator.forget_on_drop(id);
        let text = Envelope::new(request, Some(id)).and_then(|envelope| envelope.encode())?;
        debug!("-> '{}' #{id}", R::TYPE);
        if !channel.send_text(text) {
            return Err(SessionError::ChannelClosed);
        }

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled),
            reply = reply_rx => reply.unwrap_or(Err(SessionError::ChannelClosed)),
            _ = tokio::time::sleep(self.request_timeout) => {
                warn!("'{}' #{id} timed out after {:?}", R::TYPE, self.request_timeout);
                Err(SessionError::Timeout { request: R::TYPE })
            }
        };

        let data = outcome?;
        debug!("<- '{}' #{id}", R::REPLY);
        Ok(decode_payload(&data)?)
    }

    /// Route one inbound text frame.
    pub fn dispatch(&self, text: &str) {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping undecodable signaling frame: {e}");
                return;
            }
        };
        if let Some(notification) = self.correlator.resolve(envelope) {
            debug!("<- '{}'", notification.message_type);
            self.bus
                .publish(&notification.message_type, &notification.data);
        }
    }

    /// The inbound stream ended: every waiter fails with `ChannelClosed`.
    pub fn channel_lost(&self) {
        self.correlator.fail_all(|| SessionError::ChannelClosed);
    }

    /// Unblock every suspended request with `Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.correlator.fail_all(|| SessionError::Cancelled);
    }

    pub fn close_channel(&self) {
        if let Some(channel) = self.channel.write().take() {
            channel.close();
        }
    }

    fn open_channel(&self) -> Option<Arc<dyn SignalingChannel>> {
        self.channel
            .read()
            .as_ref()
            .filter(|channel| channel.is_open())
            .cloned()
    }
}
