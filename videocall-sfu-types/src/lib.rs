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

//! Shared signaling types for the videocall.rs SFU client.
//!
//! This crate defines the JSON contract spoken over the signaling channel
//! between a client and an SFU media server. Every frame is an [`Envelope`]:
//!
//! ```json
//! { "type": "produce", "requestId": 7, "data": { "transportId": "t1", ... } }
//! ```
//!
//! Client→server records live in [`requests`], server→client replies and
//! notifications live in [`responses`]. Codec and transport parameters are
//! carried as opaque JSON ([`media`]) because only the media engine interprets
//! them.

pub mod envelope;
pub mod media;
pub mod message_type;
pub mod requests;
pub mod responses;

pub use envelope::{Envelope, SignalingMessage, SignalingRequest};
pub use media::{
    DtlsParameters, IceCandidate, IceParameters, MediaKind, ProducerInfo, RtpCapabilities,
    RtpParameters, SctpParameters,
};
