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

//! Client → server records.
//!
//! Records implementing [`SignalingRequest`] are answered by exactly one
//! reply; the rest are fire-and-forget and their effects arrive as
//! notifications.

use crate::envelope::{SignalingMessage, SignalingRequest};
use crate::media::{DtlsParameters, MediaKind, RtpCapabilities, RtpParameters};
use crate::message_type;
use crate::responses::{Consumed, Produced, TransportConnected, TransportOptions};
use serde::{Deserialize, Serialize};

/// Announces this client to the room. Answered by a `joined` notification.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    pub participant_id: String,

    /// Display name shown to other participants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SignalingMessage for Join {
    const TYPE: &'static str = message_type::JOIN;
}

/// Asks for the router capabilities. Answered by an `rtpCapabilities`
/// notification.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GetRtpCapabilities {}

impl SignalingMessage for GetRtpCapabilities {
    const TYPE: &'static str = message_type::GET_RTP_CAPABILITIES;
}

/// Request body for `createProducerTransport`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CreateProducerTransport {}

impl SignalingMessage for CreateProducerTransport {
    const TYPE: &'static str = message_type::CREATE_PRODUCER_TRANSPORT;
}

impl SignalingRequest for CreateProducerTransport {
    const REPLY: &'static str = message_type::PRODUCER_TRANSPORT_CREATED;
    type Reply = TransportOptions;
}

/// Request body for `connectProducerTransport`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectProducerTransport {
    pub transport_id: String,
    pub dtls_parameters: DtlsParameters,
}

impl SignalingMessage for ConnectProducerTransport {
    const TYPE: &'static str = message_type::CONNECT_PRODUCER_TRANSPORT;
}

impl SignalingRequest for ConnectProducerTransport {
    const REPLY: &'static str = message_type::PRODUCER_TRANSPORT_CONNECTED;
    type Reply = TransportConnected;
}

/// Request body for `produce`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Produce {
    pub transport_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

impl SignalingMessage for Produce {
    const TYPE: &'static str = message_type::PRODUCE;
}

impl SignalingRequest for Produce {
    const REPLY: &'static str = message_type::PRODUCED;
    type Reply = Produced;
}

/// Request body for `createConsumerTransport`.
///
/// `participant_id` names the remote participant the transport will receive
/// from; the server keeps one receive transport per remote participant.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsumerTransport {
    pub participant_id: String,
}

impl SignalingMessage for CreateConsumerTransport {
    const TYPE: &'static str = message_type::CREATE_CONSUMER_TRANSPORT;
}

impl SignalingRequest for CreateConsumerTransport {
    const REPLY: &'static str = message_type::CONSUMER_TRANSPORT_CREATED;
    type Reply = TransportOptions;
}

/// Request body for `connectConsumerTransport`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConnectConsumerTransport {
    pub participant_id: String,
    pub transport_id: String,
    pub dtls_parameters: DtlsParameters,
}

impl SignalingMessage for ConnectConsumerTransport {
    const TYPE: &'static str = message_type::CONNECT_CONSUMER_TRANSPORT;
}

impl SignalingRequest for ConnectConsumerTransport {
    const REPLY: &'static str = message_type::CONSUMER_TRANSPORT_CONNECTED;
    type Reply = TransportConnected;
}

/// Request body for `consume`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Consume {
    /// The requesting (local) participant.
    pub participant_id: String,
    /// Owner of the producer being consumed.
    pub producer_participant_id: String,
    pub producer_id: String,
    /// Capabilities loaded by the local media engine.
    pub rtp_capabilities: RtpCapabilities,
}

impl SignalingMessage for Consume {
    const TYPE: &'static str = message_type::CONSUME;
}

impl SignalingRequest for Consume {
    const REPLY: &'static str = message_type::CONSUMED;
    type Reply = Consumed;
}

/// Tells the server a local producer was closed.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CloseProducer {
    pub producer_id: String,
}

impl SignalingMessage for CloseProducer {
    const TYPE: &'static str = message_type::CLOSE_PRODUCER;
}
