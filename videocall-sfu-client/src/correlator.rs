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

//! Matches server replies to outstanding requests.
//!
//! Every request is assigned a fresh `requestId` which the server echoes on
//! its reply.  Replies without an id are handed to the oldest outstanding
//! request awaiting that reply type, so servers that do not echo ids still
//! get deterministic first-in-first-out matching.

use crate::error::SessionError;
use log::{debug, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use videocall_sfu_types::responses::ServerError;
use videocall_sfu_types::{message_type, Envelope};

pub(crate) type Reply = Result<Value, SessionError>;

struct PendingRequest {
    id: u64,
    request_type: &'static str,
    reply_type: &'static str,
    reply_tx: oneshot::Sender<Reply>,
}

pub(crate) struct PendingGuard<'a> {
    correlator: &'a Correlator,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.correlator.forget(self.id);
    }
}

pub(crate) struct Correlator {
    next_id: AtomicU64,
    // Kept in send order for the id-less fallback.
    pending: Mutex<Vec<PendingRequest>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Allocate a request id and start waiting for its reply.
    pub fn register(
        &self,
        request_type: &'static str,
        reply_type: &'static str,
    ) -> (u64, oneshot::Receiver<Reply>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().push(PendingRequest {
            id,
            request_type,
            reply_type,
            reply_tx,
        });
        (id, reply_rx)
    }

    /// Stop waiting for `id` (timed out or cancelled).
    pub fn forget(&self, id: u64) {
        self.pending.lock().retain(|p| p.id != id);
    }

    /// Forget `id` when the returned guard goes out of scope, including when
    /// the future awaiting it is dropped.
    pub fn forget_on_drop(&self, id: u64) -> PendingGuard<'_> {
        PendingGuard {
            correlator: self,
            id,
        }
    }

    /// Number of requests still awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Fail every outstanding request.
    pub fn fail_all(&self, make_error: impl Fn() -> SessionError) {
        let drained: Vec<PendingRequest> = std::mem::take(&mut *self.pending.lock());
        for request in drained {
            debug!("Failing pending '{}' #{}", request.request_type, request.id);
            let _ = request.reply_tx.send(Err(make_error()));
        }
    }

    /// Route an inbound envelope.
    ///
    /// Returns the envelope back when it does not answer any outstanding
    /// request, so the caller can publish it as a notification.
    pub fn resolve(&self, envelope: Envelope) -> Option<Envelope> {
        let is_error = envelope.message_type == message_type::ERROR;

        let request = {
            let mut pending = self.pending.lock();
            let index = match envelope.request_id {
                Some(id) => pending.iter().position(|p| p.id == id),
                None if is_error => None,
                None => pending
                    .iter()
                    .position(|p| p.reply_type == envelope.message_type),
            };
            index.map(|i| pending.remove(i))
        };

        let Some(request) = request else {
            if let (Some(id), false) = (envelope.request_id, is_error) {
                debug!(
                    "Dropping '{}' for request #{id} that is no longer pending",
                    envelope.message_type
                );
                return None;
            }
            return Some(envelope);
        };

        let reply = if is_error {
            let message = envelope
                .payload::<ServerError>()
                .map(|e| e.message)
                .unwrap_or_else(|_| envelope.data.to_string());
            warn!(
                "Server rejected '{}' #{}: {message}",
                request.request_type, request.id
            );
            Err(SessionError::Server(message))
        } else if envelope.message_type != request.reply_type {
            Err(SessionError::UnexpectedReply {
                expected: request.reply_type,
                actual: envelope.message_type,
            })
        } else {
            Ok(envelope.data)
        };

        if request.reply_tx.send(reply).is_err() {
            debug!(
                "Reply to '{}' #{} arrived after the caller stopped waiting",
                request.request_type, request.id
            );
        }
        None
    }
}
