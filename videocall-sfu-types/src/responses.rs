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

//! Server → client replies and notifications.

use crate::media::{
    DtlsParameters, IceCandidate, IceParameters, MediaKind, ProducerInfo, RtpCapabilities,
    RtpParameters, SctpParameters,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Payload of `joined`, sent once after the client's `join`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Joined {
    #[serde(default)]
    pub participant_id: Option<String>,

    /// Producers that already existed in the room when this client joined,
    /// in the order the server lists them.
    #[serde(default)]
    pub existing_producers: Vec<ProducerInfo>,
}

/// Payload of `rtpCapabilities`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouterCapabilities {
    pub rtp_capabilities: RtpCapabilities,
}

/// Payload of `participantJoined`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantJoined {
    pub participant_id: String,
}

/// Payload of `participantLeft`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantLeft {
    pub participant_id: String,
}

/// Payload of `newProducer`.
pub type NewProducer = ProducerInfo;

/// Payload of `producerClosed`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProducerClosed {
    pub participant_id: String,
    pub producer_id: String,
}

/// Payload of `error`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerError {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

/// Payload of `producerTransportCreated` and `consumerTransportCreated`:
/// everything the media engine needs to build its side of the transport.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    pub id: String,
    pub ice_parameters: IceParameters,
    #[serde(default)]
    pub ice_candidates: Vec<IceCandidate>,
    pub dtls_parameters: DtlsParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sctp_parameters: Option<SctpParameters>,
}

/// Payload of `producerTransportConnected` and `consumerTransportConnected`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransportConnected {
    #[serde(default)]
    pub transport_id: Option<String>,
}

/// Payload of `produced`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Produced {
    /// Server-assigned producer id.
    pub id: String,
}

/// Payload of `consumed`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consumed {
    /// Server-assigned consumer id.
    pub id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Envelope;

    #[test]
    fn test_joined_with_existing_producers() {
        let envelope = Envelope::decode(
            r#"{"type":"joined","data":{"existingProducers":[
                {"participantId":"bob","producerId":"p1","kind":"audio"},
                {"participantId":"carol","producerId":"p2","kind":"video"}]}}"#,
        )
        .unwrap();
        let joined: Joined = envelope.payload().unwrap();
        assert_eq!(joined.existing_producers.len(), 2);
        assert_eq!(joined.existing_producers[0].producer_id, "p1");
        assert_eq!(joined.existing_producers[1].kind, MediaKind::Video);
    }

    #[test]
    fn test_joined_without_producers() {
        let joined: Joined = serde_json::from_str("{}").unwrap();
        assert!(joined.existing_producers.is_empty());
    }

    #[test]
    fn test_transport_options_defaults() {
        let options: TransportOptions = serde_json::from_str(
            r#"{"id":"t1","iceParameters":{"usernameFragment":"u"},"dtlsParameters":{"role":"auto"}}"#,
        )
        .unwrap();
        assert_eq!(options.id, "t1");
        assert!(options.ice_candidates.is_empty());
        assert!(options.sctp_parameters.is_none());
    }
}
