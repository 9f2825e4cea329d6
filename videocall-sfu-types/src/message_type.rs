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
 */

//! Values of the envelope `type` field.

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

pub const JOIN: &str = "join";
pub const GET_RTP_CAPABILITIES: &str = "getRtpCapabilities";
pub const CREATE_PRODUCER_TRANSPORT: &str = "createProducerTransport";
pub const CONNECT_PRODUCER_TRANSPORT: &str = "connectProducerTransport";
pub const PRODUCE: &str = "produce";
pub const CREATE_CONSUMER_TRANSPORT: &str = "createConsumerTransport";
pub const CONNECT_CONSUMER_TRANSPORT: &str = "connectConsumerTransport";
pub const CONSUME: &str = "consume";
pub const CLOSE_PRODUCER: &str = "closeProducer";

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

pub const JOINED: &str = "joined";
pub const RTP_CAPABILITIES: &str = "rtpCapabilities";
pub const PRODUCER_TRANSPORT_CREATED: &str = "producerTransportCreated";
pub const PRODUCER_TRANSPORT_CONNECTED: &str = "producerTransportConnected";
pub const PRODUCED: &str = "produced";
pub const CONSUMER_TRANSPORT_CREATED: &str = "consumerTransportCreated";
pub const CONSUMER_TRANSPORT_CONNECTED: &str = "consumerTransportConnected";
pub const CONSUMED: &str = "consumed";
pub const PARTICIPANT_JOINED: &str = "participantJoined";
pub const NEW_PRODUCER: &str = "newProducer";
pub const PARTICIPANT_LEFT: &str = "participantLeft";
pub const PRODUCER_CLOSED: &str = "producerClosed";
pub const ERROR: &str = "error";
