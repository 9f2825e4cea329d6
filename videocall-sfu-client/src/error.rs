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

//! Error types for the SFU session.

use thiserror::Error;

/// Errors returned by [`Session`](crate::Session) operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Produce or consume attempted before capability negotiation completed.
    #[error("media engine not initialized: capabilities are not loaded yet")]
    NotReady,

    /// The session has not been connected, or has already been disconnected.
    #[error("session is not connected")]
    NotConnected,

    /// `connect` was called on a session that is already connected.
    #[error("session is already connected")]
    AlreadyConnected,

    /// An operation was issued from a state that does not allow it.
    #[error("invalid state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },

    /// The session options are unusable.
    #[error("invalid session options: {0}")]
    InvalidOptions(String),

    /// The outbound transport does not exist and could not be created.
    #[error("producer transport unavailable: {0}")]
    TransportUnavailable(#[source] Box<SessionError>),

    /// A step of the consume sequence failed.
    #[error("consume of producer {producer_id} from {participant_id} failed: {source}")]
    Consume {
        participant_id: String,
        producer_id: String,
        #[source]
        source: Box<SessionError>,
    },

    /// The server did not answer a request in time.
    #[error("no reply to '{request}' within the request timeout")]
    Timeout { request: &'static str },

    /// The operation was abandoned because the session is disconnecting.
    #[error("operation cancelled")]
    Cancelled,

    /// The signaling channel is closed.
    #[error("signaling channel is closed")]
    ChannelClosed,

    /// The signaling channel could not be opened.
    #[error("failed to open signaling channel: {0}")]
    Connect(String),

    /// The server answered a request with an `error` message.
    #[error("server error: {0}")]
    Server(String),

    /// The server answered a request with a reply of the wrong type.
    #[error("unexpected reply '{actual}' to request awaiting '{expected}'")]
    UnexpectedReply {
        expected: &'static str,
        actual: String,
    },

    /// The remote participant left while a consume was in progress.
    #[error("participant {0} left the room")]
    ParticipantLeft(String),

    /// The same local track was produced twice.
    #[error("track {0} is already being produced")]
    DuplicateTrack(String),

    /// No producer with the given id is registered.
    #[error("unknown producer {0}")]
    UnknownProducer(String),

    /// The media engine failed.
    #[error("media engine error: {0}")]
    Engine(EngineError),

    /// A signaling payload could not be encoded or decoded.
    #[error("malformed signaling payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SessionError {
    /// The innermost cause, unwrapping `Consume` and `TransportUnavailable`.
    pub fn root_cause(&self) -> &SessionError {
        match self {
            SessionError::Consume { source, .. } | SessionError::TransportUnavailable(source) => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Errors raised by a [`MediaEngine`](crate::MediaEngine) implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Loading capabilities against the router failed.
    #[error("failed to load capabilities: {0}")]
    Load(String),

    /// The engine could not build a transport from the server's options.
    #[error("failed to create transport: {0}")]
    Transport(String),

    /// Producing a local track failed.
    #[error("failed to produce track: {0}")]
    Produce(String),

    /// Instantiating a consumer failed.
    #[error("failed to consume: {0}")]
    Consume(String),

    /// A negotiation callback into the session failed.
    #[error("negotiation failed: {0}")]
    Signaling(Box<SessionError>),
}

impl From<EngineError> for SessionError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Signaling(inner) => *inner,
            other => SessionError::Engine(other),
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        EngineError::Signaling(Box::new(err))
    }
}
