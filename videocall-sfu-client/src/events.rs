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

//! Framework-agnostic event types for the SFU session.
//!
//! These events are emitted on the session's event bus and can be consumed by
//! any frontend or bot that needs to react to room activity.

use crate::transport::TransportDirection;
use videocall_sfu_types::MediaKind;

/// Events emitted by a [`Session`](crate::Session).
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    // === Connection Events ===
    /// The signaling channel is open and `join` has been sent
    Connected,

    /// The signaling channel closed without `disconnect()` being called
    ConnectionLost(String),

    /// `disconnect()` finished releasing every resource
    Disconnected,

    // === Capability Events ===
    /// The media engine loaded its capabilities against the router
    CapabilitiesReady,

    /// The media engine failed to load capabilities
    CapabilitiesFailed(String),

    // === Participant Events ===
    /// A remote participant joined the room
    ParticipantJoined(String),

    /// A remote participant left the room; its consumers are already closed
    ParticipantLeft(String),

    /// A remote producer is available for consumption
    NewProducer {
        participant_id: String,
        producer_id: String,
        kind: MediaKind,
    },

    // === Local Media Events ===
    /// A local track was registered with the server
    ProducerCreated { producer_id: String, kind: MediaKind },

    /// A local producer was closed
    ProducerClosed { producer_id: String },

    /// A remote track is now being received
    ConsumerCreated {
        consumer_id: String,
        participant_id: String,
        producer_id: String,
        kind: MediaKind,
    },

    /// A consumer was closed (participant left, producer closed, or disconnect)
    ConsumerClosed {
        consumer_id: String,
        participant_id: String,
    },

    // === Transport Events ===
    /// A transport was created on both the server and the media engine
    TransportCreated {
        transport_id: String,
        direction: TransportDirection,
    },

    /// A transport completed its DTLS handshake with the server
    TransportConnected {
        transport_id: String,
        direction: TransportDirection,
    },

    /// A transport was closed
    TransportClosed {
        transport_id: String,
        direction: TransportDirection,
    },

    // === Server Events ===
    /// The server sent an `error` that did not answer any request
    ServerError(String),
}
