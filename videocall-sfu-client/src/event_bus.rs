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

//! Per-session event bus for framework-agnostic client events.
//!
//! This module provides a MPMC (multi-producer, multi-consumer) broadcast channel
//! for [`ClientEvent`]s. Every subscriber receives every event emitted after it
//! subscribed.
//!
//! # Example
//!
//! ```ignore
//! let mut rx = session.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         match event {
//!             ClientEvent::NewProducer { participant_id, producer_id, .. } => {
//!                 // decide whether to consume it
//!             }
//!             ClientEvent::ParticipantLeft(id) => {
//!                 // tear down the tile for `id`
//!             }
//!             _ => {}
//!         }
//!     }
//! });
//! ```

use crate::events::ClientEvent;
use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender};
use log::trace;

/// Default capacity of the event bus channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
pub(crate) struct EventBus {
    sender: Sender<ClientEvent>,
    // Keeps the channel open while nobody is subscribed.
    _keepalive: InactiveReceiver<ClientEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (mut sender, receiver) = broadcast(capacity.max(1));
        // Slow subscribers lose the oldest events instead of stalling the session.
        sender.set_overflow(true);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        self.sender.new_receiver()
    }

    /// Emit an event to all subscribers.
    ///
    /// Never blocks; with no active subscriber the event is discarded.
    pub fn emit(&self, event: ClientEvent) {
        trace!("Emitting {event:?}");
        let _ = self.sender.try_broadcast(event);
    }
}
