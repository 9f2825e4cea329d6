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

//! The signaling frame envelope and the traits that bind typed records to it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// A record that travels inside an [`Envelope`] under a fixed `type`.
pub trait SignalingMessage: Serialize {
    /// Value of the envelope `type` field for this record.
    const TYPE: &'static str;
}

/// A client request the server answers with exactly one reply.
///
/// The server echoes the request's `requestId` on the reply envelope so the
/// client can match the two without relying on message ordering.
pub trait SignalingRequest: SignalingMessage {
    /// Value of the reply envelope's `type` field.
    const REPLY: &'static str;

    /// Payload of the reply envelope.
    type Reply: DeserializeOwned;
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Top-level signaling frame.
///
/// # Request example
///
/// ```json
/// { "type": "consume", "requestId": 12, "data": { "producerId": "p1", ... } }
/// ```
///
/// # Notification example
///
/// ```json
/// { "type": "participantLeft", "data": { "participantId": "bob" } }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,

    /// Correlation id. Present on client requests and on the server replies
    /// that answer them; absent on unsolicited notifications.
    #[serde(rename = "requestId", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,

    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Wrap a typed record.
    pub fn new<M: SignalingMessage>(
        message: &M,
        request_id: Option<u64>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            message_type: M::TYPE.to_string(),
            request_id,
            data: serde_json::to_value(message)?,
        })
    }

    /// Build an envelope from an already-encoded payload.
    pub fn from_parts(message_type: &str, request_id: Option<u64>, data: Value) -> Self {
        Self {
            message_type: message_type.to_string(),
            request_id,
            data,
        }
    }

    /// Parse a text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode the payload as `T`.
    ///
    /// A missing or `null` payload is treated as an empty object so that
    /// field-less replies such as `producerTransportConnected` decode.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        decode_payload(&self.data)
    }
}

/// Decode a bare payload value, treating `null` as `{}`.
pub fn decode_payload<T: DeserializeOwned>(data: &Value) -> Result<T, serde_json::Error> {
    match data {
        Value::Null => serde_json::from_value(Value::Object(Default::default())),
        other => T::deserialize(other),
    }
}
