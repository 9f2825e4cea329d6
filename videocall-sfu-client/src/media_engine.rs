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

//! Contract with the media engine.
//!
//! The session never touches RTP, ICE, or DTLS itself.  It hands the server's
//! parameters to a [`MediaEngine`] and receives opaque transport, producer,
//! and consumer handles back.  When a transport needs the server's
//! cooperation (its DTLS `connect`, or registering a new producer) the engine
//! calls the [`NegotiationHandler`] it was given at creation time and resumes
//! once the returned future resolves.

use crate::error::{EngineError, SessionError};
use futures::future::BoxFuture;
use std::sync::Arc;
use videocall_sfu_types::responses::{Consumed, TransportOptions};
use videocall_sfu_types::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters};

pub type EngineResult<T> = Result<T, EngineError>;

/// A captured local track, identified by the engine's own track id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: String,
    pub kind: MediaKind,
}

impl LocalTrack {
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// A remote track delivered by a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    /// Engine track id.
    pub id: String,
    pub kind: MediaKind,
    pub participant_id: String,
    pub producer_id: String,
    pub consumer_id: String,
}

/// What the engine needs to instantiate a consumer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerDescriptor {
    pub id: String,
    pub producer_id: String,
    pub participant_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

impl ConsumerDescriptor {
    pub(crate) fn from_reply(participant_id: &str, consumed: Consumed) -> Self {
        Self {
            id: consumed.id,
            producer_id: consumed.producer_id,
            participant_id: participant_id.to_string(),
            kind: consumed.kind,
            rtp_parameters: consumed.rtp_parameters,
        }
    }
}

/// Negotiation events raised by an engine transport.
///
/// Implemented by the session; engines only call it.
pub trait NegotiationHandler: Send + Sync {
    /// Forward the local DTLS parameters to the server and resolve once the
    /// server confirms the transport is connected.
    fn connect(&self, dtls_parameters: DtlsParameters) -> BoxFuture<'static, Result<(), SessionError>>;

    /// Register a new producer with the server and resolve with the
    /// server-assigned producer id.  Only raised by send transports.
    fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> BoxFuture<'static, Result<String, SessionError>>;
}

/// A local outbound track bound to a send transport.
pub trait MediaProducer: Send + Sync {
    fn id(&self) -> &str;
    fn kind(&self) -> MediaKind;
    fn close(&self);
}

/// An inbound remote track bound to a receive transport.
pub trait MediaConsumer: Send + Sync {
    fn id(&self) -> &str;
    fn producer_id(&self) -> &str;
    fn kind(&self) -> MediaKind;
    fn track(&self) -> RemoteTrack;
    fn close(&self);
}

/// One engine-side transport.
pub trait MediaTransport: Send + Sync {
    fn id(&self) -> &str;

    /// Start sending `track`.  Raises `connect` on first use, then `produce`.
    fn produce(&self, track: LocalTrack) -> BoxFuture<'_, EngineResult<Box<dyn MediaProducer>>>;

    /// Start receiving the stream described by `descriptor`.  Raises
    /// `connect` on first use.
    fn consume(
        &self,
        descriptor: ConsumerDescriptor,
    ) -> BoxFuture<'_, EngineResult<Box<dyn MediaConsumer>>>;

    /// Close the transport and every producer or consumer on it.
    fn close(&self);
}

/// The media engine collaborator.
pub trait MediaEngine: Send + Sync {
    /// Load the device against the router's capabilities, resolving with the
    /// capabilities the device will use when consuming.
    fn load(&self, router_capabilities: RtpCapabilities)
        -> BoxFuture<'_, EngineResult<RtpCapabilities>>;

    fn create_send_transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> EngineResult<Arc<dyn MediaTransport>>;

    fn create_recv_transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> EngineResult<Arc<dyn MediaTransport>>;
}
