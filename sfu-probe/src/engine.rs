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

//! A media engine that negotiates with the SFU but never moves media.
//!
//! Capabilities are accepted as announced, transports complete their
//! `connect` handshake with placeholder DTLS parameters, and consumers are
//! bookkeeping only.  Enough to exercise every signaling step of a consume.

use futures::future::BoxFuture;
use log::debug;
use serde_json::json;
use std::sync::Arc;
use videocall_sfu_client::{
    ConsumerDescriptor, EngineError, EngineResult, LocalTrack, MediaConsumer, MediaEngine,
    MediaKind, MediaProducer, MediaTransport, NegotiationHandler, RemoteTrack, RtpCapabilities,
    TransportOptions,
};

#[derive(Debug, Default)]
pub struct ProbeEngine;

impl ProbeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }

    fn transport(
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> Arc<dyn MediaTransport> {
        Arc::new(ProbeTransport {
            id: options.id,
            handler,
            connected: tokio::sync::Mutex::new(false),
        })
    }
}

impl MediaEngine for ProbeEngine {
    fn load(&self, router_capabilities: RtpCapabilities) -> BoxFuture<'_, EngineResult<RtpCapabilities>> {
        Box::pin(async move { Ok(router_capabilities) })
    }

    fn create_send_transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> EngineResult<Arc<dyn MediaTransport>> {
        Ok(Self::transport(options, handler))
    }

    fn create_recv_transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> EngineResult<Arc<dyn MediaTransport>> {
        Ok(Self::transport(options, handler))
    }
}

struct ProbeTransport {
    id: String,
    handler: Arc<dyn NegotiationHandler>,
    connected: tokio::sync::Mutex<bool>,
}

impl ProbeTransport {
    async fn ensure_connected(&self) -> EngineResult<()> {
        let mut connected = self.connected.lock().await;
        if !*connected {
            let dtls = json!({ "role": "client", "fingerprints": [] });
            self.handler.connect(dtls.into()).await?;
            *connected = true;
        }
        Ok(())
    }
}

impl MediaTransport for ProbeTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn produce(&self, track: LocalTrack) -> BoxFuture<'_, EngineResult<Box<dyn MediaProducer>>> {
        Box::pin(async move {
            Err(EngineError::Produce(format!(
                "the probe does not publish media (track {})",
                track.id
            )))
        })
    }

    fn consume(
        &self,
        descriptor: ConsumerDescriptor,
    ) -> BoxFuture<'_, EngineResult<Box<dyn MediaConsumer>>> {
        Box::pin(async move {
            self.ensure_connected().await?;
            Ok(Box::new(ProbeConsumer { descriptor }) as Box<dyn MediaConsumer>)
        })
    }

    fn close(&self) {
        debug!("Transport {} closed", self.id);
    }
}

struct ProbeConsumer {
    descriptor: ConsumerDescriptor,
}

impl MediaConsumer for ProbeConsumer {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    fn producer_id(&self) -> &str {
        &self.descriptor.producer_id
    }

    fn kind(&self) -> MediaKind {
        self.descriptor.kind
    }

    fn track(&self) -> RemoteTrack {
        RemoteTrack {
            id: self.descriptor.id.clone(),
            kind: self.descriptor.kind,
            participant_id: self.descriptor.participant_id.clone(),
            producer_id: self.descriptor.producer_id.clone(),
            consumer_id: self.descriptor.id.clone(),
        }
    }

    fn close(&self) {
        debug!("Consumer {} closed", self.descriptor.id);
    }
}
