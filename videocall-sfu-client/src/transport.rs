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

use crate::error::SessionError;
use crate::media_engine::MediaTransport;
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportDirection {
    /// Outbound: carries local producers.
    Send,
    /// Inbound: carries consumers of one remote participant.
    Recv,
}

impl fmt::Display for TransportDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportDirection::Send => write!(f, "send"),
            TransportDirection::Recv => write!(f, "recv"),
        }
    }
}

/// Lifecycle of a producer or consumer transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Uncreated,
    Created,
    Connected,
    Closed,
}

/// A transport that exists on both the server and the media engine.
///
/// The handle only exists once the transport is `Created`; the `Uncreated`
/// state is represented by the absence of a handle in the owning slot.
pub(crate) struct TransportHandle {
    id: String,
    direction: TransportDirection,
    media: Arc<dyn MediaTransport>,
    state: Arc<Mutex<TransportState>>,
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl TransportHandle {
    /// Wrap an engine transport.  `state` is shared with the transport's
    /// negotiation handler, which marks it connected.
    pub fn new(
        direction: TransportDirection,
        media: Arc<dyn MediaTransport>,
        state: Arc<Mutex<TransportState>>,
    ) -> Self {
        *state.lock() = TransportState::Created;
        Self {
            id: media.id().to_string(),
            direction,
            media,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn direction(&self) -> TransportDirection {
        self.direction
    }

    pub fn media(&self) -> &Arc<dyn MediaTransport> {
        &self.media
    }

    pub fn state(&self) -> TransportState {
        *self.state.lock()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == TransportState::Closed
    }

    /// Close the engine transport.  Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        {
            let mut state = self.state.lock();
            if *state == TransportState::Closed {
                return false;
            }
            *state = TransportState::Closed;
        }
        debug!("Closing {} transport {}", self.direction, self.id);
        self.media.close();
        true
    }
}

/// `Created -> Connected`, the only transition a negotiation handler makes.
pub(crate) fn mark_connected(state: &Mutex<TransportState>) -> Result<(), SessionError> {
    let mut state = state.lock();
    match *state {
        TransportState::Created => {
            *state = TransportState::Connected;
            Ok(())
        }
        other => Err(SessionError::InvalidState {
            expected: "Created",
            actual: format!("{other:?}"),
        }),
    }
}
