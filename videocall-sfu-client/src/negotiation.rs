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

use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::ClientEvent;
use crate::media_engine::NegotiationHandler;
use crate::signaling::Signaling;
use crate::transport::{mark_connected, TransportDirection, TransportState};
use futures::future::BoxFuture;
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::oneshot;
use videocall_sfu_types::requests::{
    CloseProducer, ConnectConsumerTransport, ConnectProducerTransport, Produce,
};
use videocall_sfu_types::{DtlsParameters, MediaKind, RtpParameters};

/// Forwards an engine transport's negotiation events to the server.
///
/// Holds the signaling layer weakly: the engine transport owns this handler
/// and the session owns the engine transport.
pub(crate) struct TransportNegotiator {
    signaling: Weak<Signaling>,
    events: Arc<EventBus>,
    transport_id: String,
    direction: TransportDirection,
    // Remote participant of a receive transport.
    participant_id: Option<String>,
    state: Arc<Mutex<TransportState>>,
}

impl TransportNegotiator {
    pub fn send(
        signaling: &Arc<Signaling>,
        events: Arc<EventBus>,
        transport_id: String,
        state: Arc<Mutex<TransportState>>,
    ) -> Self {
        Self {
            signaling: Arc::downgrade(signaling),
            events,
            transport_id,
            direction: TransportDirection::Send,
            participant_id: None,
            state,
        }
    }

    pub fn recv(
        signaling: &Arc<Signaling>,
        events: Arc<EventBus>,
        transport_id: String,
        participant_id: String,
        state: Arc<Mutex<TransportState>>,
    ) -> Self {
        Self {
            signaling: Arc::downgrade(signaling),
            events,
            transport_id,
            direction: TransportDirection::Recv,
            participant_id: Some(participant_id),
            state,
        }
    }
}

impl NegotiationHandler for TransportNegotiator {
    fn connect(&self, dtls_parameters: DtlsParameters) -> BoxFuture<'static, Result<(), SessionError>> {
        let signaling = self.signaling.clone();
        let events = self.events.clone();
        let transport_id = self.transport_id.clone();
        let direction = self.direction;
        let participant_id = self.participant_id.clone();
        let state = self.state.clone();

        Box::pin(async move {
            let signaling = signaling.upgrade().ok_or(SessionError::ChannelClosed)?;
            match participant_id {
                None => {
                    signaling
                        .request(&ConnectProducerTransport {
                            transport_id: transport_id.clone(),
                            dtls_parameters,
                        })
                        .await?;
                }
                Some(participant_id) => {
                    signaling
                        .request(&ConnectConsumerTransport {
                            participant_id,
                            transport_id: transport_id.clone(),
                            dtls_parameters,
                        })
                        .await?;
                }
            }
            mark_connected(&state)?;
            info!("{direction} transport {transport_id} connected");
            events.emit(ClientEvent::TransportConnected {
                transport_id,
                direction,
            });
            Ok(())
        })
    }

    fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> BoxFuture<'static, Result<String, SessionError>> {
        let signaling = self.signaling.clone();
        let transport_id = self.transport_id.clone();
        let direction = self.direction;

        Box::pin(async move {
            if direction != TransportDirection::Send {
                return Err(SessionError::InvalidState {
                    expected: "send transport",
                    actual: format!("{direction} transport"),
                });
            }
            let signaling = signaling.upgrade().ok_or(SessionError::ChannelClosed)?;

            // The request outlives the caller so that a producer the server
            // confirms after the caller gave up can be closed again.
            let (reply, outcome) = oneshot::channel();
            tokio::spawn(async move {
                let result = signaling
                    .request(&Produce {
                        transport_id,
                        kind,
                        rtp_parameters,
                    })
                    .await
                    .map(|produced| produced.id);
                if let Err(Ok(producer_id)) = reply.send(result) {
                    warn!("Closing producer {producer_id}, its produce was abandoned");
                    signaling.notify(&CloseProducer { producer_id });
                }
            });
            outcome.await.unwrap_or(Err(SessionError::Cancelled))
        })
    }
}
