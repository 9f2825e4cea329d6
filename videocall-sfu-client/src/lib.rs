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

//! This crate provides the client side of an SFU room: the signaling
//! orchestration and session state machine that turns the server's stream of
//! notifications into a correctly sequenced local session.  It takes care of
//! capability negotiation, the transport lifecycle, per-participant
//! producer and consumer bookkeeping, and serialization of concurrent
//! negotiation flows.
//!
//! The crate does not move media.  Encoding, packetization, ICE and DTLS are
//! the job of a [`MediaEngine`] supplied by the application; the session only
//! forwards the server's parameters to it and keeps the two in step.
//!
//! # Outline of usage
//!
//! ## Session creation and connection:
//! ```no_run
//! # use std::sync::Arc;
//! # use videocall_sfu_client::*;
//! # async fn run(engine: Arc<dyn MediaEngine>) -> Result<(), SessionError> {
//! let session = Session::new(SessionOptions::new("alice"), engine)?;
//! let _events = session.subscribe();
//! session.connect("wss://sfu.example.com/ws").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Reacting to the room:
//! ```no_run
//! # use videocall_sfu_client::*;
//! # async fn run(session: Session) -> Result<(), SessionError> {
//! let mut events = session.subscribe();
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         ClientEvent::CapabilitiesReady => {
//!             session.produce(LocalTrack::new("cam-0", MediaKind::Video)).await?;
//!         }
//!         ClientEvent::NewProducer { participant_id, producer_id, .. } => {
//!             let _track = session.consume(&participant_id, &producer_id).await?;
//!         }
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Leaving:
//! ```no_run
//! # fn run(session: videocall_sfu_client::Session) {
//! session.disconnect();
//! # }
//! ```

mod bus;
mod capabilities;
mod consumer;
mod correlator;
mod error;
mod event_bus;
mod events;
mod media_engine;
mod negotiation;
mod options;
mod participants;
mod pending_producers;
mod producer;
mod registry;
mod session;
mod signaling;
mod transport;

pub use bus::{CorrelationBus, SubscriptionId};
pub use capabilities::{CapabilitySet, CapabilityState};
pub use error::{EngineError, SessionError};
pub use event_bus::DEFAULT_EVENT_CAPACITY;
pub use events::ClientEvent;
pub use media_engine::{
    ConsumerDescriptor, EngineResult, LocalTrack, MediaConsumer, MediaEngine, MediaProducer,
    MediaTransport, NegotiationHandler, RemoteTrack,
};
pub use options::{SessionOptions, DEFAULT_REQUEST_TIMEOUT_MS};
pub use session::{Session, SessionState};
pub use signaling::SignalingChannel;
pub use transport::{TransportDirection, TransportState};
pub use videocall_sfu_types::{
    DtlsParameters, MediaKind, ProducerInfo, RtpCapabilities, RtpParameters,
};
pub use videocall_sfu_types::responses::TransportOptions;
