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

//! Producer flow: one send transport per session, one producer per local
//! track.

use crate::error::SessionError;
use crate::events::ClientEvent;
use crate::media_engine::{LocalTrack, MediaProducer};
use crate::negotiation::TransportNegotiator;
use crate::registry::InsertionOrderedMap;
use crate::session::SessionContext;
use crate::transport::{TransportDirection, TransportHandle, TransportState};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use videocall_sfu_types::requests::{CloseProducer, CreateProducerTransport};

struct ProducerRecord {
    track_id: String,
    producer: Box<dyn MediaProducer>,
}

#[derive(Default)]
struct ProducerState {
    transport: Option<Arc<TransportHandle>>,
    producers: InsertionOrderedMap<String, ProducerRecord>,
    // Track ids with a produce in flight or a live producer.
    tracks: HashSet<String>,
    closed: bool,
}

/// Resources released by [`ProducerFlow::shutdown`], in close order.
pub(crate) struct ProducerTeardown {
    pub producers: Vec<(String, Box<dyn MediaProducer>)>,
    pub transport: Option<Arc<TransportHandle>>,
}

/// Claim on a track id while its produce is in flight.  Released on drop,
/// which covers failures as well as callers that stop waiting.
struct TrackReservation<'a> {
    state: &'a Mutex<ProducerState>,
    track_id: Option<String>,
}

impl TrackReservation<'_> {
    /// The producer is registered; the track stays claimed until it closes.
    fn keep(mut self) {
        self.track_id = None;
    }
}

impl Drop for TrackReservation<'_> {
    fn drop(&mut self) {
        if let Some(track_id) = self.track_id.take() {
            self.state.lock().tracks.remove(&track_id);
        }
    }
}

pub(crate) struct ProducerFlow {
    ctx: SessionContext,
    state: Mutex<ProducerState>,
    // Serializes send transport creation.
    creation: tokio::sync::Mutex<()>,
}

impl ProducerFlow {
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            state: Mutex::new(ProducerState::default()),
            creation: tokio::sync::Mutex::new(()),
        }
    }

    /// Send `track` to the room, returning the server-assigned producer id.
    pub async fn produce(&self, track: LocalTrack) -> Result<String, SessionError> {
        self.ctx.capabilities.capability_set()?;
        let reservation = self.reserve_track(&track.id)?;
        let producer_id = self.produce_reserved(track).await?;
        reservation.keep();
        Ok(producer_id)
    }

    async fn produce_reserved(&self, track: LocalTrack) -> Result<String, SessionError> {
        let transport = self
            .send_transport()
            .await
            .map_err(|e| SessionError::TransportUnavailable(Box::new(e)))?;

        let track_id = track.id.clone();
        let producer = transport.media().produce(track).await?;
        let producer_id = producer.id().to_string();
        let kind = producer.kind();

        let rejected = {
            let mut state = self.state.lock();
            if state.closed {
                Some(producer)
            } else {
                state
                    .producers
                    .insert(producer_id.clone(), ProducerRecord { track_id, producer });
                None
            }
        };
        if let Some(producer) = rejected {
            producer.close();
            return Err(SessionError::Cancelled);
        }

        info!("Producing {kind} as {producer_id}");
        self.ctx.events.emit(ClientEvent::ProducerCreated {
            producer_id: producer_id.clone(),
            kind,
        });
        Ok(producer_id)
    }

    fn reserve_track(&self, track_id: &str) -> Result<TrackReservation<'_>, SessionError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SessionError::NotConnected);
        }
        if !state.tracks.insert(track_id.to_string()) {
            return Err(SessionError::DuplicateTrack(track_id.to_string()));
        }
        Ok(TrackReservation {
            state: &self.state,
            track_id: Some(track_id.to_string()),
        })
    }

    /// Resolve the send transport, creating it on first use.  Concurrent
    /// callers wait for the creation already in progress.
    async fn send_transport(&self) -> Result<Arc<TransportHandle>, SessionError> {
        if let Some(transport) = self.current_transport() {
            return Ok(transport);
        }
        let _creating = self.creation.lock().await;
        if let Some(transport) = self.current_transport() {
            return Ok(transport);
        }
        if self.state.lock().closed {
            return Err(SessionError::Cancelled);
        }

        let options = self
            .ctx
            .signaling
            .request(&CreateProducerTransport::default())
            .await?;
        let transport_id = options.id.clone();
        debug!("Creating send transport {transport_id}");

        let transport_state = Arc::new(Mutex::new(TransportState::Uncreated));
        let handler = Arc::new(TransportNegotiator::send(
            &self.ctx.signaling,
            self.ctx.events.clone(),
            transport_id.clone(),
            transport_state.clone(),
        ));
        let media = self.ctx.engine.create_send_transport(options, handler)?;
        let transport = Arc::new(TransportHandle::new(
            TransportDirection::Send,
            media,
            transport_state,
        ));

        let installed = {
            let mut state = self.state.lock();
            if state.closed {
                false
            } else {
                state.transport = Some(transport.clone());
                true
            }
        };
        if !installed {
            transport.close();
            return Err(SessionError::Cancelled);
        }

        self.ctx.events.emit(ClientEvent::TransportCreated {
            transport_id,
            direction: TransportDirection::Send,
        });
        Ok(transport)
    }

    fn current_transport(&self) -> Option<Arc<TransportHandle>> {
        self.state
            .lock()
            .transport
            .clone()
            .filter(|transport| !transport.is_closed())
    }

    /// Close one local producer and tell the server.
    pub fn close_producer(&self, producer_id: &str) -> Result<(), SessionError> {
        let record = {
            let mut state = self.state.lock();
            let record = state
                .producers
                .remove(producer_id)
                .ok_or_else(|| SessionError::UnknownProducer(producer_id.to_string()))?;
            state.tracks.remove(&record.track_id);
            record
        };
        record.producer.close();
        self.ctx.signaling.notify(&CloseProducer {
            producer_id: producer_id.to_string(),
        });
        self.ctx.events.emit(ClientEvent::ProducerClosed {
            producer_id: producer_id.to_string(),
        });
        Ok(())
    }

    /// Take every producer and the send transport, refusing further work.
    pub fn shutdown(&self) -> ProducerTeardown {
        let mut state = self.state.lock();
        state.closed = true;
        state.tracks.clear();
        let producers = state
            .producers
            .drain_ordered()
            .into_iter()
            .map(|(id, record)| (id, record.producer))
            .collect();
        ProducerTeardown {
            producers,
            transport: state.transport.take(),
        }
    }

    pub fn producer_ids(&self) -> Vec<String> {
        self.state.lock().producers.ordered_keys().to_vec()
    }

    pub fn transport_state(&self) -> TransportState {
        self.state
            .lock()
            .transport
            .as_ref()
            .map_or(TransportState::Uncreated, |transport| transport.state())
    }
}
