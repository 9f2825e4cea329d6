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

//! Correlation bus: in-process publish/subscribe keyed by message type.
//!
//! Every server notification that is not the reply to an outstanding request
//! is published here under its envelope `type`.  Handlers run synchronously,
//! in registration order, on the task that publishes.
//!
//! ```ignore
//! let bus = CorrelationBus::new();
//! bus.subscribe("participantLeft", |payload| println!("left: {payload}"));
//! bus.subscribe_once("joined", |_| println!("first join only"));
//! bus.publish("participantLeft", &serde_json::json!({"participantId": "bob"}));
//! ```

use log::{debug, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use videocall_sfu_types::envelope::decode_payload;

type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by [`CorrelationBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    once: bool,
    handler: Handler,
}

/// Publish/subscribe multiplexer keyed by message-type strings.
#[derive(Default)]
pub struct CorrelationBus {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<String, Vec<Subscription>>>,
}

impl std::fmt::Debug for CorrelationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock();
        let counts: HashMap<&str, usize> =
            handlers.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("CorrelationBus")
            .field("handlers", &counts)
            .finish()
    }
}

impl CorrelationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent handler for `message_type`.
    pub fn subscribe<F>(&self, message_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.register(message_type, false, Arc::new(handler))
    }

    /// Register a handler that is removed before its first invocation.
    pub fn subscribe_once<F>(&self, message_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.register(message_type, true, Arc::new(handler))
    }

    /// Register a persistent handler that receives the payload decoded as `T`.
    ///
    /// Payloads that fail to decode are logged and skipped.
    pub fn subscribe_typed<T, F>(&self, message_type: &str, handler: F) -> SubscriptionId
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let name = message_type.to_string();
        self.subscribe(message_type, move |payload| {
            match decode_payload::<T>(payload) {
                Ok(decoded) => handler(decoded),
                Err(e) => warn!("Dropping malformed '{name}' payload: {e}"),
            }
        })
    }

    /// Remove a subscription.  Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        for subscriptions in handlers.values_mut() {
            if let Some(index) = subscriptions.iter().position(|s| s.id == id) {
                subscriptions.remove(index);
                return true;
            }
        }
        false
    }

    /// Invoke every handler registered for `message_type`, in registration
    /// order.  Returns the number of handlers invoked.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe,
    /// unsubscribe, or publish without deadlocking.  A handler removed by an
    /// earlier handler of the same publish is skipped.
    pub fn publish(&self, message_type: &str, payload: &Value) -> usize {
        let snapshot: Vec<(SubscriptionId, bool, Handler)> = {
            let handlers = self.handlers.lock();
            match handlers.get(message_type) {
                Some(subscriptions) => subscriptions
                    .iter()
                    .map(|s| (s.id, s.once, s.handler.clone()))
                    .collect(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            debug!("No handler for '{message_type}'");
            return 0;
        }

        let mut invoked = 0;
        for (id, once, handler) in snapshot {
            let live = if once {
                self.unsubscribe(id)
            } else {
                self.is_subscribed(message_type, id)
            };
            if !live {
                continue;
            }
            handler(payload);
            invoked += 1;
        }
        invoked
    }

    /// Number of handlers currently registered for `message_type`.
    pub fn handler_count(&self, message_type: &str) -> usize {
        self.handlers
            .lock()
            .get(message_type)
            .map_or(0, |subscriptions| subscriptions.len())
    }

    fn register(&self, message_type: &str, once: bool, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .lock()
            .entry(message_type.to_string())
            .or_default()
            .push(Subscription { id, once, handler });
        id
    }

    fn is_subscribed(&self, message_type: &str, id: SubscriptionId) -> bool {
        self.handlers
            .lock()
            .get(message_type)
            .is_some_and(|subscriptions| subscriptions.iter().any(|s| s.id == id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |tag: &str| -> Handler {
            let log = log_clone.clone();
            let tag = tag.to_string();
            Arc::new(move |_payload: &Value| log.lock().push(tag.clone()))
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = CorrelationBus::new();
        let (log, make) = recorder();
        let first = make("first");
        let second = make("second");
        bus.subscribe("newProducer", move |p| first(p));
        bus.subscribe("newProducer", move |p| second(p));

        assert_eq!(bus.publish("newProducer", &json!({})), 2);
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_handlers_only_see_their_type() {
        let bus = CorrelationBus::new();
        let (log, make) = recorder();
        let joined = make("joined");
        bus.subscribe("participantJoined", move |p| joined(p));

        assert_eq!(bus.publish("participantLeft", &json!({})), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_once_handler_fires_once() {
        let bus = CorrelationBus::new();
        let (log, make) = recorder();
        let once = make("once");
        bus.subscribe_once("consumed", move |p| once(p));

        assert_eq!(bus.publish("consumed", &json!({})), 1);
        assert_eq!(bus.publish("consumed", &json!({})), 0);
        assert_eq!(log.lock().len(), 1);
        assert_eq!(bus.handler_count("consumed"), 0);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = Arc::new(CorrelationBus::new());
        let calls = Arc::new(Mutex::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let id = {
            let bus_ref = Arc::downgrade(&bus);
            let calls = calls.clone();
            let slot = slot.clone();
            bus.subscribe("error", move |_| {
                *calls.lock() += 1;
                if let (Some(bus), Some(id)) = (bus_ref.upgrade(), *slot.lock()) {
                    bus.unsubscribe(id);
                }
            })
        };
        *slot.lock() = Some(id);

        bus.publish("error", &json!({}));
        bus.publish("error", &json!({}));
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_handler_removed_mid_publish_is_skipped() {
        let bus = Arc::new(CorrelationBus::new());
        let (log, make) = recorder();
        let victim_slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        {
            let bus_ref = Arc::downgrade(&bus);
            let victim_slot = victim_slot.clone();
            let killer = make("killer");
            bus.subscribe("newProducer", move |p| {
                killer(p);
                if let (Some(bus), Some(id)) = (bus_ref.upgrade(), *victim_slot.lock()) {
                    bus.unsubscribe(id);
                }
            });
        }
        let victim = make("victim");
        *victim_slot.lock() = Some(bus.subscribe("newProducer", move |p| victim(p)));

        assert_eq!(bus.publish("newProducer", &json!({})), 1);
        assert_eq!(*log.lock(), vec!["killer"]);
    }

    #[test]
    fn test_handler_may_publish_reentrantly() {
        let bus = Arc::new(CorrelationBus::new());
        let (log, make) = recorder();
        {
            let bus_ref = Arc::downgrade(&bus);
            let outer = make("outer");
            bus.subscribe("joined", move |p| {
                outer(p);
                if let Some(bus) = bus_ref.upgrade() {
                    bus.publish("newProducer", p);
                }
            });
        }
        let inner = make("inner");
        bus.subscribe("newProducer", move |p| inner(p));

        bus.publish("joined", &json!({}));
        assert_eq!(*log.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_typed_subscription_skips_malformed_payloads() {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Left {
            participant_id: String,
        }

        let bus = CorrelationBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe_typed("participantLeft", move |left: Left| {
            seen_clone.lock().push(left.participant_id)
        });

        bus.publish("participantLeft", &json!({"participantId": "bob"}));
        bus.publish("participantLeft", &json!({"wrong": 1}));
        assert_eq!(*seen.lock(), vec!["bob".to_string()]);
    }
}
