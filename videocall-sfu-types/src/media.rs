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

//! Media kinds and the opaque negotiation blobs exchanged with the SFU.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Declares a transparent wrapper around a JSON value.
///
/// The client never inspects these structures; it only forwards them
/// between the server and the media engine.
macro_rules! opaque_json {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Value);

        impl From<Value> for $name {
            fn from(value: Value) -> Self {
                Self(value)
            }
        }
    };
}

opaque_json!(
    /// Codec and header-extension capabilities of a router or a device.
    RtpCapabilities
);
opaque_json!(
    /// Per-stream RTP parameters of a producer or consumer.
    RtpParameters
);
opaque_json!(
    /// DTLS role and fingerprints of one side of a transport.
    DtlsParameters
);
opaque_json!(
    /// ICE username fragment and password of a server transport.
    IceParameters
);
opaque_json!(
    /// A single ICE candidate of a server transport.
    IceCandidate
);
opaque_json!(
    /// SCTP parameters, present when the server enables data channels.
    SctpParameters
);

/// A remote producer as announced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerInfo {
    pub participant_id: String,
    pub producer_id: String,
    pub kind: MediaKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_wire_names() {
        assert_eq!(serde_json::to_string(&MediaKind::Audio).unwrap(), "\"audio\"");
        let kind: MediaKind = serde_json::from_str("\"video\"").unwrap();
        assert_eq!(kind, MediaKind::Video);
        assert!(serde_json::from_str::<MediaKind>("\"screen\"").is_err());
    }

    #[test]
    fn test_opaque_blob_is_transparent() {
        let caps = RtpCapabilities(serde_json::json!({"codecs": [{"mimeType": "audio/opus"}]}));
        let text = serde_json::to_string(&caps).unwrap();
        assert_eq!(text, r#"{"codecs":[{"mimeType":"audio/opus"}]}"#);
    }

    #[test]
    fn test_producer_info_camel_case() {
        let info: ProducerInfo = serde_json::from_str(
            r#"{"participantId":"alice","producerId":"p-1","kind":"audio"}"#,
        )
        .unwrap();
        assert_eq!(info.participant_id, "alice");
        assert_eq!(info.producer_id, "p-1");
        assert_eq!(info.kind, MediaKind::Audio);
    }
}
