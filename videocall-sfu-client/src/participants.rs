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

//! Remote participants and the inbound resources bound to them.
//!
//! Participants, their receive transports, and every consumer live under a
//! single lock, so a departure removes all of them in one step.  Each
//! participant entry carries an epoch: work that started before a departure
//! (a transport being created, a consumer being instantiated) compares its
//! epoch on completion and is discarded if the participant it was started
//! for is gone.

use crate::error::SessionError;
use crate::media_engine::MediaConsumer;
use crate::registry::InsertionOrderedMap;
use crate::transport::{TransportHandle, TransportState};
use parking_lot::Mutex;
use std::sync::Arc;

struct ParticipantEntry {
    epoch: u64,
    transport: Option<Arc<TransportHandle>>,
}

pub(crate) struct ConsumerRecord {
    pub participant_id: String,
    pub producer_id: String,
    pub consumer: Box<dyn MediaConsumer>,
}

/// Everything removed by a departure, for the caller to close.
pub(crate) struct Departure {
    pub consumers: Vec<(String, ConsumerRecord)>,
    pub transport: Option<Arc<TransportHandle>>,
}

/// Everything removed on shutdown, in registration order.
pub(crate) struct Teardown {
    pub consumers: Vec<(String, ConsumerRecord)>,
    pub transports: Vec<Arc<TransportHandle>>,
}

#[derive(Default)]
struct RosterState {
    participants: InsertionOrderedMap<String, ParticipantEntry>,
    consumers: InsertionOrderedMap<String, ConsumerRecord>,
    next_epoch: u64,
    closed: bool,
}

impl RosterState {
    fn entry_epoch(&mut self, participant_id: &str) -> u64 {
        if let Some(entry) = self.participants.get(participant_id) {
            return entry.epoch;
        }
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        self.participants.insert(
            participant_id.to_string(),
            ParticipantEntry {
                epoch,
                transport: None,
            },
        );
        epoch
    }

    fn is_current(&self, participant_id: &str, epoch: u64) -> bool {
        self.participants
            .get(participant_id)
            .is_some_and(|entry| entry.epoch == epoch)
    }
}

#[derive(Default)]
pub(crate) struct Roster {
    inner: Mutex<RosterState>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a participant.  Returns `false` if it was already known or the
    /// roster is shut down.
    pub fn join(&self, participant_id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed || inner.participants.contains_key(participant_id) {
            return false;
        }
        inner.entry_epoch(participant_id);
        true
    }

    /// The epoch of `participant_id`, recording the participant if needed.
    pub fn ensure(&self, participant_id: &str) -> Result<u64, SessionError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(SessionError::Cancelled);
        }
        Ok(inner.entry_epoch(participant_id))
    }

    pub fn transport(&self, participant_id: &str) -> Option<Arc<TransportHandle>> {
        self.inner
            .lock()
            .participants
            .get(participant_id)
            .and_then(|entry| entry.transport.clone())
            .filter(|transport| !transport.is_closed())
    }

    /// Bind a freshly created receive transport.  Handed back if the
    /// participant left (or left and came back) while it was being created.
    pub fn install_transport(
        &self,
        participant_id: &str,
        epoch: u64,
        transport: Arc<TransportHandle>,
    ) -> Result<(), Arc<TransportHandle>> {
        let mut inner = self.inner.lock();
        if inner.closed || !inner.is_current(participant_id, epoch) {
            return Err(transport);
        }
        match inner.participants.get_mut(participant_id) {
            Some(entry) => {
                entry.transport = Some(transport);
                Ok(())
            }
            None => Err(transport),
        }
    }

    /// Register a consumer under its server-assigned id.  Handed back if the
    /// participant is gone.
    pub fn register_consumer(
        &self,
        participant_id: &str,
        epoch: u64,
        producer_id: &str,
        consumer: Box<dyn MediaConsumer>,
    ) -> Result<(), Box<dyn MediaConsumer>> {
        let mut inner = self.inner.lock();
        if inner.closed || !inner.is_current(participant_id, epoch) {
            return Err(consumer);
        }
        let consumer_id = consumer.id().to_string();
        inner.consumers.insert(
            consumer_id,
            ConsumerRecord {
                participant_id: participant_id.to_string(),
                producer_id: producer_id.to_string(),
                consumer,
            },
        );
        Ok(())
    }

    /// Forget a participant along with its transport and consumers.
    pub fn leave(&self, participant_id: &str) -> Departure {
        let mut inner = self.inner.lock();
        let transport = inner
            .participants
            .remove(participant_id)
            .and_then(|entry| entry.transport);
        let consumers = inner
            .consumers
            .extract_if(|record| record.participant_id == participant_id);
        Departure {
            consumers,
            transport,
        }
    }

    /// Remove every consumer of a remote producer.
    pub fn remove_consumers_of(&self, producer_id: &str) -> Vec<(String, ConsumerRecord)> {
        self.inner
            .lock()
            .consumers
            .extract_if(|record| record.producer_id == producer_id)
    }

    /// Empty the roster and refuse further registrations.
    pub fn shutdown(&self) -> Teardown {
        let mut inner = self.inner.lock();
        inner.closed = true;
        let consumers = inner.consumers.drain_ordered();
        let transports = inner
            .participants
            .drain_ordered()
            .into_iter()
            .filter_map(|(_, entry)| entry.transport)
            .collect();
        Teardown {
            consumers,
            transports,
        }
    }

    pub fn participants(&self) -> Vec<String> {
        self.inner.lock().participants.ordered_keys().to_vec()
    }

    pub fn consumer_ids(&self) -> Vec<String> {
        self.inner.lock().consumers.ordered_keys().to_vec()
    }

    pub fn transport_state(&self, participant_id: &str) -> TransportState {
        self.inner
            .lock()
            .participants
            .get(participant_id)
            .and_then(|entry| entry.transport.as_ref().map(|t| t.state()))
            .unwrap_or(TransportState::Uncreated)
    }
}
