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
use crate::event_bus::DEFAULT_EVENT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default time to wait for the server to answer a request.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Identity announced in `join`.  Opaque to the client; must not be empty.
    pub participant_id: String,

    pub display_name: Option<String>,

    /// How long a request waits for its reply before failing with `Timeout`.
    pub request_timeout_ms: u64,

    /// Buffered events per subscriber before the oldest are dropped.
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            participant_id: String::new(),
            display_name: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionOptions {
    pub fn new(participant_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            ..Self::default()
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), SessionError> {
        if self.participant_id.trim().is_empty() {
            return Err(SessionError::InvalidOptions(
                "participant_id must not be empty".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(SessionError::InvalidOptions(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
