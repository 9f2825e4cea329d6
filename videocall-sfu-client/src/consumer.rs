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

//! Consumer flow.
//!
//! Every consume request, whatever participant it targets, goes through one
//! FIFO queue drained by a single worker task, so consume negotiations never
//! overlap and complete in the order they were requested.  A failed request
//! is reported to its caller and the worker moves on to the next one.

use crate::error::SessionError;
use crate::events::ClientEvent;
use crate::media_engine::{ConsumerDescriptor, RemoteTrack};
use crate::negotiation::TransportNegotiator;
use crate::session::SessionContext;
use crate::transport::{TransportDirection, TransportHandle, TransportState};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use videocall_sfu_types::requests::{Consume, CreateConsumerTransport};

type ConsumeResult = Result<RemoteTrack, SessionError>;

struct ConsumeJob {
    participant_id: String,
    producer_id: String,
    reply: oneshot::Sender<ConsumeResult>,
}

pub(crate) struct ConsumerFlow {
    queue: Mutex<Option<mpsc::UnboundedSender<ConsumeJob>>>,
}

impl ConsumerFlow {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(None),
        }
    }

    /// Spawn the queue worker.  Must be called from within a tokio runtime.
    pub fn start(&self, ctx: SessionContext) {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.queue.lock() = Some(sender);
        tokio::spawn(run_queue(ctx, receiver));
    }

    /// Drop the queue.  Jobs not yet started fail with `Cancelled`.
    pub fn stop(&self) {
        self.queue.lock().take();
    }

    /// Enqueue a consume request and wait for its turn and its outcome.
    pub async fn consume(&self, participant_id: &str, producer_id: &str) -> ConsumeResult {
        let (reply, outcome) = oneshot::channel();
        let sender = self.queue.lock().clone().ok_or(SessionError::NotConnected)?;
        sender
            .send(ConsumeJob {
                participant_id: participant_id.to_string(),
                producer_id: producer_id.to_string(),
                reply,
            })
            .map_err(|_| SessionError::Cancelled)?;
        outcome.await.unwrap_or(Err(SessionError::Cancelled))
    }
}

async fn run_queue(ctx: SessionContext, mut jobs: mpsc::UnboundedReceiver<ConsumeJob>) {
    let cancel = ctx.signaling.cancellation().clone();
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let result = consume_one(&ctx, &job.participant_id, &job.producer_id)
            .await
            .map_err(|source| SessionError::Consume {
                participant_id: job.participant_id.clone(),
                producer_id: job.producer_id.clone(),
                source: Box::new(source),
            });
        if let Err(e) = &result {
            warn!("{e}");
        }
        if job.reply.send(result).is_err() {
            debug!(
                "Consume of {} finished after its caller went away",
                job.producer_id
            );
        }
    }
    debug!("Consume queue stopped");
}

async fn consume_one(
    ctx: &SessionContext,
    participant_id: &str,
    producer_id: &str,
) -> ConsumeResult {
    let capabilities = ctx.capabilities.capability_set()?;
    let (transport, epoch) = recv_transport(ctx, participant_id).await?;

    let consumed = ctx
        .signaling
        .request(&Consume {
            participant_id: ctx.participant_id.to_string(),
            producer_participant_id: participant_id.to_string(),
            producer_id: producer_id.to_string(),
            rtp_capabilities: capabilities.local.clone(),
        })
        .await?;

    let descriptor = ConsumerDescriptor::from_reply(participant_id, consumed);
    let consumer = transport.media().consume(descriptor).await?;
    let track = consumer.track();
    let consumer_id = consumer.id().to_string();
    let kind = consumer.kind();

    if let Err(consumer) = ctx
        .roster
        .register_consumer(participant_id, epoch, producer_id, consumer)
    {
        consumer.close();
        return Err(SessionError::ParticipantLeft(participant_id.to_string()));
    }

    info!("Consuming {kind} {producer_id} from {participant_id} as {consumer_id}");
    ctx.events.emit(ClientEvent::ConsumerCreated {
        consumer_id,
        participant_id: participant_id.to_string(),
        producer_id: producer_id.to_string(),
        kind,
    });
    Ok(track)
}

/// The participant's receive transport, created on first use.
async fn recv_transport(
    ctx: &SessionContext,
    participant_id: &str,
) -> Result<(Arc<TransportHandle>, u64), SessionError> {
    let epoch = ctx.roster.ensure(participant_id)?;
    if let Some(transport) = ctx.roster.transport(participant_id) {
        return Ok((transport, epoch));
    }

    let options = ctx
        .signaling
        .request(&CreateConsumerTransport {
            participant_id: participant_id.to_string(),
        })
        .await?;
    let transport_id = options.id.clone();
    debug!("Creating recv transport {transport_id} for {participant_id}");

    let transport_state = Arc::new(Mutex::new(TransportState::Uncreated));
    let handler = Arc::new(TransportNegotiator::recv(
        &ctx.signaling,
        ctx.events.clone(),
        transport_id.clone(),
        participant_id.to_string(),
        transport_state.clone(),
    ));
    let media = ctx.engine.create_recv_transport(options, handler)?;
    let transport = Arc::new(TransportHandle::new(
        TransportDirection::Recv,
        media,
        transport_state,
    ));

    if let Err(transport) = ctx
        .roster
        .install_transport(participant_id, epoch, transport.clone())
    {
        warn!("{participant_id} left while its transport was being created");
        transport.close();
        return Err(SessionError::ParticipantLeft(participant_id.to_string()));
    }

    ctx.events.emit(ClientEvent::TransportCreated {
        transport_id,
        direction: TransportDirection::Recv,
    });
    Ok((transport, epoch))
}
