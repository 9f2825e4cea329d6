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

//! Capability negotiation gate.
//!
//! Produce and consume are refused until the media engine has loaded its
//! capabilities against the router's.  Producer announcements that arrive
//! earlier are parked in a [`PendingProducerBuffer`] and released, in arrival
//! order, the moment the negotiator becomes ready.

use crate::error::SessionError;
use crate::pending_producers::PendingProducerBuffer;
use log::{info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use videocall_sfu_types::{ProducerInfo, RtpCapabilities};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityState {
    /// Waiting for the server's router capabilities.
    NotReady,
    /// The media engine is loading.
    Loading,
    Ready,
    /// The engine rejected the router capabilities.  A later announcement
    /// retries.
    Failed(String),
}

impl fmt::Display for CapabilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityState::NotReady => write!(f, "not ready"),
            CapabilityState::Loading => write!(f, "loading"),
            CapabilityState::Ready => write!(f, "ready"),
            CapabilityState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Router capabilities plus what the engine loaded against them.  Immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitySet {
    pub router: RtpCapabilities,
    pub local: RtpCapabilities,
}

struct NegotiatorState {
    state: CapabilityState,
    router: Option<RtpCapabilities>,
    set: Option<Arc<CapabilitySet>>,
    pending: PendingProducerBuffer,
}

pub(crate) struct CapabilityNegotiator {
    inner: Mutex<NegotiatorState>,
}

impl CapabilityNegotiator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(NegotiatorState {
                state: CapabilityState::NotReady,
                router: None,
                set: None,
                pending: PendingProducerBuffer::new(),
            }),
        }
    }

    pub fn state(&self) -> CapabilityState {
        self.inner.lock().state.clone()
    }

    /// `NotReady | Failed -> Loading`.  Returns `false`, leaving the state
    /// untouched, if a load is already running or has completed.
    pub fn begin_loading(&self, router: RtpCapabilities) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            CapabilityState::Loading | CapabilityState::Ready => {
                warn!(
                    "Ignoring router capabilities while capabilities are {}",
                    inner.state
                );
                false
            }
            CapabilityState::NotReady | CapabilityState::Failed(_) => {
                inner.state = CapabilityState::Loading;
                inner.router = Some(router);
                true
            }
        }
    }

    /// `Loading -> Ready`.  Returns the buffered announcements, in arrival
    /// order, for the caller to republish.
    pub fn complete(&self, local: RtpCapabilities) -> Result<Vec<ProducerInfo>, SessionError> {
        let mut inner = self.inner.lock();
        if inner.state != CapabilityState::Loading {
            return Err(SessionError::InvalidState {
                expected: "Loading",
                actual: inner.state.to_string(),
            });
        }
        let router = inner.router.take().unwrap_or_default();
        inner.set = Some(Arc::new(CapabilitySet { router, local }));
        inner.state = CapabilityState::Ready;
        let flushed = inner.pending.flush();
        info!(
            "Media engine ready, releasing {} buffered producer(s)",
            flushed.len()
        );
        Ok(flushed)
    }

    /// `Loading -> Failed`.
    pub fn fail(&self, reason: String) {
        let mut inner = self.inner.lock();
        if inner.state == CapabilityState::Loading {
            inner.router = None;
            inner.state = CapabilityState::Failed(reason);
        }
    }

    /// Offer a producer announcement.  Returned when it can be announced
    /// right away, buffered otherwise.
    pub fn offer(&self, info: ProducerInfo) -> Option<ProducerInfo> {
        let mut inner = self.inner.lock();
        if inner.state == CapabilityState::Ready {
            Some(info)
        } else {
            inner.pending.push(info);
            None
        }
    }

    pub fn capability_set(&self) -> Result<Arc<CapabilitySet>, SessionError> {
        self.inner.lock().set.clone().ok_or(SessionError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use videocall_sfu_types::MediaKind;

    fn info(participant_id: &str, producer_id: &str) -> ProducerInfo {
        ProducerInfo {
            participant_id: participant_id.into(),
            producer_id: producer_id.into(),
            kind: MediaKind::Video,
        }
    }

    fn caps(tag: &str) -> RtpCapabilities {
        RtpCapabilities(json!({ "tag": tag }))
    }

    #[test]
    fn test_not_ready_until_loaded() {
        let negotiator = CapabilityNegotiator::new();
        assert!(matches!(
            negotiator.capability_set(),
            Err(SessionError::NotReady)
        ));
        assert!(negotiator.begin_loading(caps("router")));
        assert_eq!(negotiator.state(), CapabilityState::Loading);
        assert!(negotiator.capability_set().is_err());

        negotiator.complete(caps("local")).unwrap();
        let set = negotiator.capability_set().unwrap();
        assert_eq!(set.router, caps("router"));
        assert_eq!(set.local, caps("local"));
    }

    #[test]
    fn test_buffered_announcements_released_once_in_order() {
        let negotiator = CapabilityNegotiator::new();
        assert!(negotiator.offer(info("bob", "p1")).is_none());
        assert!(negotiator.offer(info("carol", "p2")).is_none());

        negotiator.begin_loading(caps("router"));
        let flushed = negotiator.complete(caps("local")).unwrap();
        assert_eq!(flushed, vec![info("bob", "p1"), info("carol", "p2")]);

        // Later announcements pass straight through instead of queueing
        // behind the flushed ones.
        let live = negotiator.offer(info("dave", "p3"));
        assert_eq!(live, Some(info("dave", "p3")));
    }

    #[test]
    fn test_failed_load_keeps_buffer_for_retry() {
        let negotiator = CapabilityNegotiator::new();
        negotiator.begin_loading(caps("router"));
        assert!(negotiator.offer(info("bob", "p1")).is_none());
        negotiator.fail("no codecs".into());
        assert!(negotiator.offer(info("carol", "p2")).is_none());

        assert!(negotiator.begin_loading(caps("router")));
        let flushed = negotiator.complete(caps("local")).unwrap();
        assert_eq!(flushed, vec![info("bob", "p1"), info("carol", "p2")]);
    }

    #[test]
    fn test_announcement_ignored_while_loading_or_ready() {
        let negotiator = CapabilityNegotiator::new();
        assert!(negotiator.begin_loading(caps("first")));
        assert!(!negotiator.begin_loading(caps("second")));
        negotiator.complete(caps("local")).unwrap();
        assert!(!negotiator.begin_loading(caps("third")));
        assert_eq!(negotiator.capability_set().unwrap().router, caps("first"));
    }

    #[test]
    fn test_failed_load_can_retry() {
        let negotiator = CapabilityNegotiator::new();
        negotiator.begin_loading(caps("router"));
        negotiator.fail("unsupported codec".into());
        assert_eq!(
            negotiator.state(),
            CapabilityState::Failed("unsupported codec".into())
        );
        assert!(negotiator.capability_set().is_err());

        assert!(negotiator.begin_loading(caps("router")));
        negotiator.complete(caps("local")).unwrap();
        assert_eq!(negotiator.state(), CapabilityState::Ready);
    }

    #[test]
    fn test_complete_requires_loading() {
        let negotiator = CapabilityNegotiator::new();
        assert!(matches!(
            negotiator.complete(caps("local")),
            Err(SessionError::InvalidState { expected: "Loading", .. })
        ));
    }
}
