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

//! Fake SFU and fake media engine shared by the integration tests.

#![allow(dead_code)]

use async_broadcast::Receiver;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use videocall_sfu_client::{
    ClientEvent, ConsumerDescriptor, EngineError, EngineResult, LocalTrack, MediaConsumer,
    MediaEngine, MediaKind, MediaProducer, MediaTransport, NegotiationHandler, RemoteTrack,
    RtpCapabilities, RtpParameters, Session, SessionOptions, TransportOptions,
};

// ---------------------------------------------------------------------------
// Fake SFU
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SfuConfig {
    existing_producers: Vec<Value>,
    hold_capabilities: bool,
    muted: HashSet<String>,
    rejected: HashMap<String, String>,
    consume_delay: Option<Duration>,
    produce_delays: HashMap<String, Duration>,
    rejected_producers: HashSet<String>,
    departing: HashSet<String>,
    close_log: Option<EngineLog>,
}

/// Scripted SFU behind a [`SignalingChannel`](videocall_sfu_client::SignalingChannel).
///
/// Answers every request it understands, records what it received, and
/// measures how many `consume` requests are awaiting `consumed` at once.
pub struct FakeSfu {
    inbound: Mutex<Option<mpsc::Sender<String>>>,
    received: Mutex<Vec<Value>>,
    config: Mutex<SfuConfig>,
    open: AtomicBool,
    next_id: AtomicUsize,
    consumes_in_flight: Arc<AtomicUsize>,
    max_consumes_in_flight: Arc<AtomicUsize>,
}

impl FakeSfu {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(1024);
        let sfu = Arc::new(Self {
            inbound: Mutex::new(Some(sender)),
            received: Mutex::new(Vec::new()),
            config: Mutex::new(SfuConfig::default()),
            open: AtomicBool::new(true),
            next_id: AtomicUsize::new(1),
            consumes_in_flight: Arc::new(AtomicUsize::new(0)),
            max_consumes_in_flight: Arc::new(AtomicUsize::new(0)),
        });
        (sfu, receiver)
    }

    /// Producers listed in `joined`.
    pub fn with_existing_producer(&self, participant_id: &str, producer_id: &str, kind: &str) {
        self.config.lock().existing_producers.push(json!({
            "participantId": participant_id,
            "producerId": producer_id,
            "kind": kind,
        }));
    }

    /// Do not answer `getRtpCapabilities` until [`announce_capabilities`].
    pub fn hold_capabilities(&self) {
        self.config.lock().hold_capabilities = true;
    }

    /// Never answer requests of this type.
    pub fn mute(&self, request_type: &str) {
        self.config.lock().muted.insert(request_type.to_string());
    }

    /// Answer requests of this type with an `error` carrying their id.
    pub fn reject(&self, request_type: &str, message: &str) {
        self.config
            .lock()
            .rejected
            .insert(request_type.to_string(), message.to_string());
    }

    pub fn delay_consume(&self, delay: Duration) {
        self.config.lock().consume_delay = Some(delay);
    }

    /// Delay the `produced` reply for the given local track.
    pub fn delay_produce(&self, track_id: &str, delay: Duration) {
        self.config
            .lock()
            .produce_delays
            .insert(track_id.to_string(), delay);
    }

    /// Answer `consume` for this producer with an `error`.
    pub fn reject_producer(&self, producer_id: &str) {
        self.config
            .lock()
            .rejected_producers
            .insert(producer_id.to_string());
    }

    /// Announce that `participant_id` left just before answering the
    /// `createConsumerTransport` issued for it.
    pub fn depart_during_transport_creation(&self, participant_id: &str) {
        self.config
            .lock()
            .departing
            .insert(participant_id.to_string());
    }

    /// Record the channel close in `log`, after the engine's own entries.
    pub fn log_close_into(&self, log: EngineLog) {
        self.config.lock().close_log = Some(log);
    }

    pub fn announce_capabilities(&self) {
        self.push("rtpCapabilities", json!({ "rtpCapabilities": router_capabilities() }));
    }

    /// Send an unsolicited notification.
    pub fn push(&self, message_type: &str, data: Value) {
        self.push_raw(json!({ "type": message_type, "data": data }));
    }

    /// Drop the server side of the channel, as if the connection died.
    pub fn hang_up(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.inbound.lock().take();
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    pub fn received_types(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter_map(|envelope| envelope["type"].as_str().map(str::to_string))
            .collect()
    }

    pub fn count(&self, message_type: &str) -> usize {
        self.received_types()
            .iter()
            .filter(|t| t.as_str() == message_type)
            .count()
    }

    pub fn max_consumes_in_flight(&self) -> usize {
        self.max_consumes_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn push_raw(&self, envelope: Value) {
        if let Some(sender) = self.inbound.lock().as_ref() {
            let _ = sender.try_send(envelope.to_string());
        }
    }

    fn reply_later(&self, envelope: Value, delay: Duration) {
        let sender = self.inbound.lock().clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = sender {
                let _ = sender.send(envelope.to_string()).await;
            }
        });
    }

    fn next(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn handle(&self, envelope: Value) {
        let message_type = envelope["type"].as_str().unwrap_or_default().to_string();
        let request_id = envelope["requestId"].clone();
        let data = envelope["data"].clone();

        let (muted, rejected, hold_capabilities, consume_delay, existing) = {
            let config = self.config.lock();
            (
                config.muted.contains(&message_type),
                config.rejected.get(&message_type).cloned(),
                config.hold_capabilities,
                config.consume_delay,
                config.existing_producers.clone(),
            )
        };
        if muted {
            return;
        }
        if let Some(message) = rejected {
            self.push_raw(json!({
                "type": "error",
                "requestId": request_id,
                "data": { "message": message },
            }));
            return;
        }

        let reply = |reply_type: &str, data: Value| {
            json!({ "type": reply_type, "requestId": request_id, "data": data })
        };

        match message_type.as_str() {
            "join" => self.push("joined", json!({
                "participantId": data["participantId"],
                "existingProducers": existing,
            })),
            "getRtpCapabilities" if !hold_capabilities => self.announce_capabilities(),
            "createProducerTransport" => {
                let id = self.next("send");
                self.push_raw(reply("producerTransportCreated", transport_options(&id)));
            }
            "connectProducerTransport" => {
                self.push_raw(reply("producerTransportConnected", json!({})));
            }
            "produce" => {
                let track = data["rtpParameters"]["track"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let produced = reply("produced", json!({ "id": format!("producer-{track}") }));
                let delay = self.config.lock().produce_delays.get(&track).copied();
                match delay {
                    Some(delay) => self.reply_later(produced, delay),
                    None => self.push_raw(produced),
                }
            }
            "createConsumerTransport" => {
                let participant = data["participantId"].as_str().unwrap_or_default();
                if self.config.lock().departing.remove(participant) {
                    self.push("participantLeft", json!({ "participantId": participant }));
                }
                let id = self.next(&format!("recv-{participant}"));
                self.push_raw(reply("consumerTransportCreated", transport_options(&id)));
            }
            "connectConsumerTransport" => {
                self.push_raw(reply("consumerTransportConnected", json!({})));
            }
            "consume" => {
                let producer_id = data["producerId"].as_str().unwrap_or_default();
                if self.config.lock().rejected_producers.contains(producer_id) {
                    self.push_raw(reply("error", json!({ "message": "producer not found" })));
                    return;
                }
                let in_flight = self.consumes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_consumes_in_flight.fetch_max(in_flight, Ordering::SeqCst);

                let consumed = reply(
                    "consumed",
                    json!({
                        "id": self.next("consumer"),
                        "producerId": data["producerId"],
                        "kind": "video",
                        "rtpParameters": { "producer": data["producerId"] },
                    }),
                );
                let sender = self.inbound.lock().clone();
                let in_flight = self.consumes_in_flight.clone();
                tokio::spawn(async move {
                    if let Some(delay) = consume_delay {
                        tokio::time::sleep(delay).await;
                    }
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    if let Some(sender) = sender {
                        let _ = sender.send(consumed.to_string()).await;
                    }
                });
            }
            _ => {}
        }
    }
}

impl videocall_sfu_client::SignalingChannel for FakeSfu {
    fn send_text(&self, text: String) -> bool {
        if !self.is_open() {
            return false;
        }
        let envelope: Value = serde_json::from_str(&text).expect("client sent invalid JSON");
        self.received.lock().push(envelope.clone());
        self.handle(envelope);
        true
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            if let Some(log) = self.config.lock().close_log.as_ref() {
                log.lock().push("close channel".to_string());
            }
        }
    }
}

pub fn router_capabilities() -> Value {
    json!({ "codecs": [{ "mimeType": "audio/opus" }, { "mimeType": "video/VP8" }] })
}

fn transport_options(id: &str) -> Value {
    json!({
        "id": id,
        "iceParameters": { "usernameFragment": id, "password": "secret" },
        "iceCandidates": [],
        "dtlsParameters": { "role": "auto", "fingerprints": [] },
    })
}

// ---------------------------------------------------------------------------
// Fake media engine
// ---------------------------------------------------------------------------

/// Ordered record of everything the engine was asked to do.
pub type EngineLog = Arc<Mutex<Vec<String>>>;

#[derive(Default)]
pub struct FakeEngine {
    log: EngineLog,
    fail_load: AtomicBool,
    fail_recv_transport: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_load() -> Arc<Self> {
        let engine = Self::default();
        engine.fail_load.store(true, Ordering::SeqCst);
        Arc::new(engine)
    }

    pub fn fail_recv_transport(&self, fail: bool) {
        self.fail_recv_transport.store(fail, Ordering::SeqCst);
    }

    pub fn log_handle(&self) -> EngineLog {
        self.log.clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    /// Log entries starting with `prefix`.
    pub fn entries(&self, prefix: &str) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> Arc<dyn MediaTransport> {
        Arc::new(FakeTransport {
            id: options.id,
            handler,
            connected: tokio::sync::Mutex::new(false),
            log: self.log.clone(),
        })
    }
}

impl MediaEngine for FakeEngine {
    fn load(&self, router_capabilities: RtpCapabilities) -> BoxFuture<'_, EngineResult<RtpCapabilities>> {
        Box::pin(async move {
            self.log.lock().push("load".to_string());
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(EngineError::Load("no common codecs".into()));
            }
            Ok(RtpCapabilities(json!({
                "device": true,
                "router": router_capabilities.0,
            })))
        })
    }

    fn create_send_transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> EngineResult<Arc<dyn MediaTransport>> {
        self.log.lock().push(format!("create transport {}", options.id));
        Ok(self.transport(options, handler))
    }

    fn create_recv_transport(
        &self,
        options: TransportOptions,
        handler: Arc<dyn NegotiationHandler>,
    ) -> EngineResult<Arc<dyn MediaTransport>> {
        if self.fail_recv_transport.load(Ordering::SeqCst) {
            return Err(EngineError::Transport("ice failure".into()));
        }
        self.log.lock().push(format!("create transport {}", options.id));
        Ok(self.transport(options, handler))
    }
}

struct FakeTransport {
    id: String,
    handler: Arc<dyn NegotiationHandler>,
    connected: tokio::sync::Mutex<bool>,
    log: EngineLog,
}

impl FakeTransport {
    async fn ensure_connected(&self) -> EngineResult<()> {
        let mut connected = self.connected.lock().await;
        if !*connected {
            self.handler
                .connect(json!({ "role": "client", "transport": self.id }).into())
                .await?;
            *connected = true;
        }
        Ok(())
    }
}

impl MediaTransport for FakeTransport {
    fn id(&self) -> &str {
        &self.id
    }

    fn produce(&self, track: LocalTrack) -> BoxFuture<'_, EngineResult<Box<dyn MediaProducer>>> {
        Box::pin(async move {
            self.ensure_connected().await?;
            let id = self
                .handler
                .produce(track.kind, RtpParameters(json!({ "track": track.id })))
                .await?;
            self.log.lock().push(format!("produce {id}"));
            Ok(Box::new(FakeProducer {
                id,
                kind: track.kind,
                log: self.log.clone(),
            }) as Box<dyn MediaProducer>)
        })
    }

    fn consume(
        &self,
        descriptor: ConsumerDescriptor,
    ) -> BoxFuture<'_, EngineResult<Box<dyn MediaConsumer>>> {
        Box::pin(async move {
            self.ensure_connected().await?;
            self.log.lock().push(format!("consume {}", descriptor.id));
            Ok(Box::new(FakeConsumer {
                descriptor,
                log: self.log.clone(),
            }) as Box<dyn MediaConsumer>)
        })
    }

    fn close(&self) {
        self.log.lock().push(format!("close transport {}", self.id));
    }
}

struct FakeProducer {
    id: String,
    kind: MediaKind,
    log: EngineLog,
}

impl MediaProducer for FakeProducer {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn close(&self) {
        self.log.lock().push(format!("close producer {}", self.id));
    }
}

struct FakeConsumer {
    descriptor: ConsumerDescriptor,
    log: EngineLog,
}

impl MediaConsumer for FakeConsumer {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    fn producer_id(&self) -> &str {
        &self.descriptor.producer_id
    }

    fn kind(&self) -> MediaKind {
        self.descriptor.kind
    }

    fn track(&self) -> RemoteTrack {
        RemoteTrack {
            id: format!("track-{}", self.descriptor.id),
            kind: self.descriptor.kind,
            participant_id: self.descriptor.participant_id.clone(),
            producer_id: self.descriptor.producer_id.clone(),
            consumer_id: self.descriptor.id.clone(),
        }
    }

    fn close(&self) {
        self.log
            .lock()
            .push(format!("close consumer {}", self.descriptor.id));
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub session: Session,
    pub sfu: Arc<FakeSfu>,
    pub engine: Arc<FakeEngine>,
    pub events: Receiver<ClientEvent>,
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A session connected to a fresh fake SFU.  Configure the SFU in `setup`
/// before the session joins.
pub fn connect_with(
    options: SessionOptions,
    engine: Arc<FakeEngine>,
    setup: impl FnOnce(&FakeSfu),
) -> Harness {
    init_logger();
    let (sfu, inbound) = FakeSfu::new();
    sfu.log_close_into(engine.log_handle());
    setup(&sfu);
    let session = Session::new(options, engine.clone()).expect("valid options");
    let events = session.subscribe();
    session
        .connect_with(sfu.clone(), inbound)
        .expect("first connect succeeds");
    Harness {
        session,
        sfu,
        engine,
        events,
    }
}

pub fn connect(setup: impl FnOnce(&FakeSfu)) -> Harness {
    connect_with(SessionOptions::new("alice"), FakeEngine::new(), setup)
}

/// Connect and wait until capabilities are loaded.
pub async fn connect_ready(setup: impl FnOnce(&FakeSfu)) -> Harness {
    let mut harness = connect(setup);
    wait_for(&mut harness.events, |e| *e == ClientEvent::CapabilitiesReady).await;
    harness
}

/// Receive events until one matches, returning it.
pub async fn wait_for(
    events: &mut Receiver<ClientEvent>,
    mut predicate: impl FnMut(&ClientEvent) -> bool,
) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event stream failed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Drain the events already emitted.
pub fn drain(events: &mut Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Wait until `condition` holds, yielding to other tasks in between.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(30), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition never became true")
}
