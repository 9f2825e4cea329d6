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

//! The session facade.
//!
//! A [`Session`] joins one SFU room.  It owns the signaling channel, the
//! send transport and its producers, one receive transport per remote
//! participant with its consumers, and the per-session event bus.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use videocall_sfu_client::{LocalTrack, MediaEngine, MediaKind, Session, SessionOptions};
//!
//! async fn join(engine: Arc<dyn MediaEngine>) -> Result<(), videocall_sfu_client::SessionError> {
//!     let session = Session::new(SessionOptions::new("alice"), engine)?;
//!     session.connect("wss://sfu.example.com/ws").await?;
//!
//!     // Once capabilities are ready:
//!     let _producer_id = session.produce(LocalTrack::new("mic-0", MediaKind::Audio)).await?;
//!     let _track = session.consume("bob", "producer-7").await?;
//!
//!     session.disconnect();
//!     Ok(())
//! }
//! ```

use crate::bus::CorrelationBus;
use crate::capabilities::{CapabilityNegotiator, CapabilitySet, CapabilityState};
use crate::consumer::ConsumerFlow;
use crate::error::SessionError;
use crate::event_bus::EventBus;
use crate::events::ClientEvent;
use crate::media_engine::{LocalTrack, MediaEngine, RemoteTrack};
use crate::options::SessionOptions;
use crate::participants::Roster;
use crate::producer::ProducerFlow;
use crate::signaling::{Signaling, SignalingChannel};
use crate::transport::{TransportHandle, TransportState};
use async_broadcast::Receiver;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use videocall_sfu_transport::SignalingSocket;
use videocall_sfu_types::requests::{GetRtpCapabilities, Join};
use videocall_sfu_types::responses::{
    Joined, NewProducer, ParticipantJoined, ParticipantLeft, ProducerClosed, RouterCapabilities,
    ServerError,
};
use videocall_sfu_types::{message_type, ProducerInfo};

/// Connection state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, `connect` not called yet.
    Idle,
    Connected,
    /// `disconnect` was called.  Terminal.
    Disconnected,
}

/// Collaborators shared by the flows and the notification handlers.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub participant_id: Arc<str>,
    pub signaling: Arc<Signaling>,
    pub engine: Arc<dyn MediaEngine>,
    pub capabilities: Arc<CapabilityNegotiator>,
    pub roster: Arc<Roster>,
    pub events: Arc<EventBus>,
}

struct SessionInner {
    options: SessionOptions,
    state: Mutex<SessionState>,
    ctx: SessionContext,
    producers: ProducerFlow,
    consumers: ConsumerFlow,
}

/// Client side of one SFU room.  Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("participant_id", &self.inner.options.participant_id)
            .field("state", &self.state())
            .field("capabilities", &self.capability_state())
            .finish()
    }
}

impl Session {
    pub fn new(options: SessionOptions, engine: Arc<dyn MediaEngine>) -> Result<Self, SessionError> {
        options.validate()?;

        let ctx = SessionContext {
            participant_id: Arc::from(options.participant_id.as_str()),
            signaling: Arc::new(Signaling::new(options.request_timeout())),
            engine,
            capabilities: Arc::new(CapabilityNegotiator::new()),
            roster: Arc::new(Roster::new()),
            events: Arc::new(EventBus::new(options.event_capacity)),
        };
        install_handlers(&ctx);

        Ok(Self {
            inner: Arc::new(SessionInner {
                producers: ProducerFlow::new(ctx.clone()),
                consumers: ConsumerFlow::new(),
                state: Mutex::new(SessionState::Idle),
                options,
                ctx,
            }),
        })
    }

    /// Open a WebSocket to `url` and join the room.
    pub async fn connect(&self, url: &str) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Idle => {}
            SessionState::Connected => return Err(SessionError::AlreadyConnected),
            SessionState::Disconnected => return Err(invalid_state("Idle", SessionState::Disconnected)),
        }
        let (socket, inbound) = SignalingSocket::connect(url)
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        self.connect_with(Arc::new(socket), inbound)
    }

    /// Join the room over an already-open channel.  `inbound` yields the
    /// channel's text frames and ends when the channel closes.
    pub fn connect_with(
        &self,
        channel: Arc<dyn SignalingChannel>,
        inbound: mpsc::Receiver<String>,
    ) -> Result<(), SessionError> {
        if let Err(e) = self.begin_connected() {
            channel.close();
            return Err(e);
        }

        let ctx = &self.inner.ctx;
        ctx.signaling.attach(channel);
        self.inner.consumers.start(ctx.clone());
        spawn_dispatch_loop(ctx.clone(), inbound);

        info!("Connected as {}", ctx.participant_id);
        ctx.events.emit(ClientEvent::Connected);
        ctx.signaling.notify(&Join {
            participant_id: self.inner.options.participant_id.clone(),
            display_name: self.inner.options.display_name.clone(),
        });
        ctx.signaling.notify(&GetRtpCapabilities::default());
        Ok(())
    }

    /// Publish a local track.  Returns the server-assigned producer id.
    pub async fn produce(&self, track: LocalTrack) -> Result<String, SessionError> {
        self.ensure_connected()?;
        self.inner.producers.produce(track).await
    }

    /// Receive a remote producer.  Requests are served one at a time, in the
    /// order they were made.
    pub async fn consume(
        &self,
        participant_id: &str,
        producer_id: &str,
    ) -> Result<RemoteTrack, SessionError> {
        self.ensure_connected()?;
        self.inner.ctx.capabilities.capability_set()?;
        self.inner.consumers.consume(participant_id, producer_id).await
    }

    /// Like [`consume`](Self::consume), logging the failure and returning
    /// `None` instead of an error.
    pub async fn consume_track(&self, participant_id: &str, producer_id: &str) -> Option<RemoteTrack> {
        match self.consume(participant_id, producer_id).await {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("No track for {producer_id} from {participant_id}: {e}");
                None
            }
        }
    }

    /// Stop publishing one local track.
    pub fn close_producer(&self, producer_id: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.producers.close_producer(producer_id)
    }

    /// Leave the room and release every resource.  Suspended operations fail
    /// with `Cancelled`.  Safe to call more than once.
    pub fn disconnect(&self) {
        self.inner.shutdown();
    }

    /// Subscribe to session events emitted from now on.
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.inner.ctx.events.subscribe()
    }

    /// Raw server notifications, keyed by message type.
    pub fn bus(&self) -> &CorrelationBus {
        self.inner.ctx.signaling.bus()
    }

    pub fn participant_id(&self) -> &str {
        &self.inner.options.participant_id
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    pub fn capability_state(&self) -> CapabilityState {
        self.inner.ctx.capabilities.state()
    }

    /// The negotiated capabilities, once the media engine is ready.
    pub fn capability_set(&self) -> Option<Arc<CapabilitySet>> {
        self.inner.ctx.capabilities.capability_set().ok()
    }

    /// Known remote participants, in the order they were first seen.
    pub fn participants(&self) -> Vec<String> {
        self.inner.ctx.roster.participants()
    }

    pub fn producer_ids(&self) -> Vec<String> {
        self.inner.producers.producer_ids()
    }

    pub fn consumer_ids(&self) -> Vec<String> {
        self.inner.ctx.roster.consumer_ids()
    }

    pub fn has_consumer_transport(&self, participant_id: &str) -> bool {
        self.inner.ctx.roster.transport(participant_id).is_some()
    }

    pub fn consumer_transport_state(&self, participant_id: &str) -> TransportState {
        self.inner.ctx.roster.transport_state(participant_id)
    }

    pub fn producer_transport_state(&self) -> TransportState {
        self.inner.producers.transport_state()
    }

    /// Requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.inner.ctx.signaling.in_flight()
    }

    fn begin_connected(&self) -> Result<(), SessionError> {
        let mut state = self.inner.state.lock();
        match *state {
            SessionState::Idle => {
                *state = SessionState::Connected;
                Ok(())
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected),
            SessionState::Disconnected => Err(invalid_state("Idle", SessionState::Disconnected)),
        }
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Connected => Ok(()),
            _ => Err(SessionError::NotConnected),
        }
    }
}

impl SessionInner {
    fn shutdown(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), SessionState::Disconnected);
        if previous == SessionState::Disconnected {
            return;
        }
        let ctx = &self.ctx;
        info!("Disconnecting {}", ctx.participant_id);

        ctx.signaling.cancel();
        self.consumers.stop();
        let producers = self.producers.shutdown();
        let roster = ctx.roster.shutdown();

        for (producer_id, producer) in producers.producers {
            producer.close();
            ctx.events.emit(ClientEvent::ProducerClosed { producer_id });
        }
        for (consumer_id, record) in roster.consumers {
            record.consumer.close();
            ctx.events.emit(ClientEvent::ConsumerClosed {
                consumer_id,
                participant_id: record.participant_id,
            });
        }
        if let Some(transport) = producers.transport {
            close_transport(ctx, &transport);
        }
        for transport in roster.transports {
            close_transport(ctx, &transport);
        }
        ctx.signaling.close_channel();

        if previous == SessionState::Connected {
            ctx.events.emit(ClientEvent::Disconnected);
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn invalid_state(expected: &'static str, actual: SessionState) -> SessionError {
    SessionError::InvalidState {
        expected,
        actual: format!("{actual:?}"),
    }
}

fn close_transport(ctx: &SessionContext, transport: &TransportHandle) {
    if transport.close() {
        ctx.events.emit(ClientEvent::TransportClosed {
            transport_id: transport.id().to_string(),
            direction: transport.direction(),
        });
    }
}

fn spawn_dispatch_loop(ctx: SessionContext, mut inbound: mpsc::Receiver<String>) {
    tokio::spawn(async move {
        let cancel = ctx.signaling.cancellation().clone();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                frame = inbound.recv() => match frame {
                    Some(text) => ctx.signaling.dispatch(&text),
                    None => {
                        warn!("Signaling channel closed");
                        ctx.signaling.channel_lost();
                        ctx.events.emit(ClientEvent::ConnectionLost(
                            "signaling channel closed".to_string(),
                        ));
                        break;
                    }
                },
            }
        }
        debug!("Dispatch loop stopped");
    });
}

/// Republish a producer announcement so it takes the live `newProducer` path.
fn republish_producer(signaling: &Signaling, info: &ProducerInfo) {
    match serde_json::to_value(info) {
        Ok(payload) => {
            signaling
                .bus()
                .publish(message_type::NEW_PRODUCER, &payload);
        }
        Err(e) => warn!("Failed to republish producer {}: {e}", info.producer_id),
    }
}

/// Wire the server notifications to the session state.
///
/// Handlers hold the signaling layer weakly since the bus they are
/// registered on belongs to it.
fn install_handlers(ctx: &SessionContext) {
    let bus = ctx.signaling.bus();

    let signaling = Arc::downgrade(&ctx.signaling);
    bus.subscribe_typed(message_type::JOINED, move |joined: Joined| {
        info!(
            "Joined room as {} with {} existing producer(s)",
            joined.participant_id.as_deref().unwrap_or("?"),
            joined.existing_producers.len()
        );
        if let Some(signaling) = signaling.upgrade() {
            for producer in &joined.existing_producers {
                republish_producer(&signaling, producer);
            }
        }
    });

    let capabilities = ctx.capabilities.clone();
    let roster = ctx.roster.clone();
    let events = ctx.events.clone();
    bus.subscribe_typed(message_type::NEW_PRODUCER, move |announced: NewProducer| {
        let Some(info) = capabilities.offer(announced) else {
            debug!("Buffering producer announcement until capabilities are loaded");
            return;
        };
        roster.join(&info.participant_id);
        events.emit(ClientEvent::NewProducer {
            participant_id: info.participant_id,
            producer_id: info.producer_id,
            kind: info.kind,
        });
    });

    let capabilities = ctx.capabilities.clone();
    let engine = ctx.engine.clone();
    let events = ctx.events.clone();
    let signaling = Arc::downgrade(&ctx.signaling);
    bus.subscribe_typed(
        message_type::RTP_CAPABILITIES,
        move |router: RouterCapabilities| {
            if !capabilities.begin_loading(router.rtp_capabilities.clone()) {
                return;
            }
            tokio::spawn(load_capabilities(
                router,
                engine.clone(),
                capabilities.clone(),
                events.clone(),
                signaling.clone(),
            ));
        },
    );

    let roster = ctx.roster.clone();
    let events = ctx.events.clone();
    bus.subscribe_typed(
        message_type::PARTICIPANT_JOINED,
        move |joined: ParticipantJoined| {
            info!("{} joined", joined.participant_id);
            roster.join(&joined.participant_id);
            events.emit(ClientEvent::ParticipantJoined(joined.participant_id));
        },
    );

    let roster = ctx.roster.clone();
    let events = ctx.events.clone();
    bus.subscribe_typed(message_type::PARTICIPANT_LEFT, move |left: ParticipantLeft| {
        info!("{} left", left.participant_id);
        let departure = roster.leave(&left.participant_id);
        for (consumer_id, record) in departure.consumers {
            record.consumer.close();
            events.emit(ClientEvent::ConsumerClosed {
                consumer_id,
                participant_id: record.participant_id,
            });
        }
        if let Some(transport) = departure.transport {
            if transport.close() {
                events.emit(ClientEvent::TransportClosed {
                    transport_id: transport.id().to_string(),
                    direction: transport.direction(),
                });
            }
        }
        events.emit(ClientEvent::ParticipantLeft(left.participant_id));
    });

    let roster = ctx.roster.clone();
    let events = ctx.events.clone();
    bus.subscribe_typed(message_type::PRODUCER_CLOSED, move |closed: ProducerClosed| {
        debug!(
            "Producer {} of {} closed",
            closed.producer_id, closed.participant_id
        );
        for (consumer_id, record) in roster.remove_consumers_of(&closed.producer_id) {
            record.consumer.close();
            events.emit(ClientEvent::ConsumerClosed {
                consumer_id,
                participant_id: record.participant_id,
            });
        }
    });

    let events = ctx.events.clone();
    bus.subscribe_typed(message_type::ERROR, move |server_error: ServerError| {
        warn!("Server error: {}", server_error.message);
        events.emit(ClientEvent::ServerError(server_error.message));
    });
}

async fn load_capabilities(
    router: RouterCapabilities,
    engine: Arc<dyn MediaEngine>,
    capabilities: Arc<CapabilityNegotiator>,
    events: Arc<EventBus>,
    signaling: Weak<Signaling>,
) {
    match engine.load(router.rtp_capabilities).await {
        Ok(local) => match capabilities.complete(local) {
            Ok(buffered) => {
                events.emit(ClientEvent::CapabilitiesReady);
                if let Some(signaling) = signaling.upgrade() {
                    for info in &buffered {
                        republish_producer(&signaling, info);
                    }
                }
            }
            Err(e) => warn!("Capabilities loaded out of turn: {e}"),
        },
        Err(e) => {
            error!("Media engine failed to load capabilities: {e}");
            capabilities.fail(e.to_string());
            events.emit(ClientEvent::CapabilitiesFailed(e.to_string()));
        }
    }
}
