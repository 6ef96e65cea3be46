//! The Face engine (C6, §4.7): the public API surface of this crate.
//!
//! Grounded on the teacher's `forwarder.rs`: shared mutable state lives
//! behind one `Rc<RefCell<_>>`, and `Face` itself is a cheap, cloneable
//! handle onto it (the same split the teacher uses between `Forwarder` and
//! the `Rc<RefCell<Faces<P>>>` it hands callbacks a clone of). Unlike the
//! teacher's multi-face `Forwarder`, a `Face` drives its own inline event
//! loop (§5.1) rather than being driven by a background-thread reactor —
//! it owns exactly one transport, so there is nothing to overlap.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::codec::{
    decode_element, encode_data, encode_forwarding_entry, encode_interest, Data, Element,
    ForwardingEntry, Interest, SignedInfo,
};
use crate::config::FaceConfig;
use crate::cst::Cst;
use crate::error::FaceError;
use crate::host_strategy::HostStrategy;
use crate::keycache::KeyCache;
use crate::name::Name;
use crate::pit::{DataOutcome, Pit, PitId};
use crate::platform::Platform;
use crate::timestamp::Timestamp;
use crate::transport::Transport;
use crate::verifier::Verifier;
use crate::verify_flow::{self, VerifyDecision};

/// What an inbound Data (or its absence) delivers to the sink that
/// expressed the original Interest (§7's error-kind table).
pub enum DataEvent<'a> {
    Content { data: &'a Data },
    ContentUnverified { data: &'a Data },
    ContentBad { data: &'a Data },
    TimedOut,
}

/// The sink's answer to a timeout: whether to retransmit with a fresh
/// timer (§4.2's `on_timer_fire`). Ignored for every other `DataEvent`.
pub enum ReexpressDecision {
    Stop,
    Reexpress,
}

/// Registered-prefix handlers decide, per inbound Interest, whether to
/// answer with a Data packet (§4.7.4).
pub enum InterestAction {
    Ignore,
    Respond(Data),
}

pub type ResponseSink = Box<dyn for<'a> FnMut(DataEvent<'a>) -> ReexpressDecision>;
pub type InterestSink = Box<dyn FnMut(&Name) -> InterestAction>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadyState {
    Unopen,
    Opened,
    Closed,
}

enum DeferredSend {
    Interest(Interest, Option<ResponseSink>),
    Register(Name, InterestSink, u32),
}

struct Inner<T, P, V> {
    config: FaceConfig,
    state: ReadyState,
    host: Option<String>,
    port: Option<u16>,
    ndnd_id: Option<Vec<u8>>,
    ndnd_id_fetch_in_flight: bool,
    transport: T,
    platform: P,
    verifier: V,
    pit: Pit<ResponseSink>,
    cst: Cst<InterestSink>,
    key_cache: KeyCache,
    host_strategy: Option<HostStrategy>,
    probing_candidate: Option<String>,
    probing_pit_id: Option<PitId>,
    probe_deadline: Option<Timestamp>,
    pending_after_open: Vec<DeferredSend>,
    on_open: Option<Box<dyn FnMut()>>,
    on_close: Option<Box<dyn FnMut()>>,
}

/// A cheap, cloneable handle onto one Face's shared state (§4.9).
pub struct Face<T, P, V> {
    inner: Rc<RefCell<Inner<T, P, V>>>,
}

impl<T, P, V> Clone for Face<T, P, V> {
    fn clone(&self) -> Self {
        Face { inner: self.inner.clone() }
    }
}

impl<T: Transport + 'static, P: Platform + 'static, V: Verifier + 'static> Face<T, P, V> {
    pub fn new(config: FaceConfig, transport: T, platform: P, verifier: V) -> Self {
        let key_cache = KeyCache::new(config.key_cache_capacity);
        let host = config.host.clone();
        let port = config.port;
        let inner = Inner {
            config,
            state: ReadyState::Unopen,
            host,
            port,
            ndnd_id: None,
            ndnd_id_fetch_in_flight: false,
            transport,
            platform,
            verifier,
            pit: Pit::new(),
            cst: Cst::new(),
            key_cache,
            host_strategy: None,
            probing_candidate: None,
            probing_pit_id: None,
            probe_deadline: None,
            pending_after_open: Vec::new(),
            on_open: None,
            on_close: None,
        };
        Face { inner: Rc::new(RefCell::new(inner)) }
    }

    pub fn set_on_open(&self, cb: impl FnMut() + 'static) {
        self.inner.borrow_mut().on_open = Some(Box::new(cb));
    }

    pub fn set_on_close(&self, cb: impl FnMut() + 'static) {
        self.inner.borrow_mut().on_close = Some(Box::new(cb));
    }

    pub fn is_open(&self) -> bool {
        self.inner.borrow().state == ReadyState::Opened
    }

    /// Number of entries currently held in the key cache (§4.6); exposed
    /// for observability and tests, not part of the verification flow
    /// itself.
    pub fn key_cache_len(&self) -> usize {
        self.inner.borrow().key_cache.len()
    }

    /// §4.7.1: express an Interest for `name`. `sink` is invoked with the
    /// eventual outcome; `template` supplies selector fields and an
    /// explicit lifetime (copied verbatim, including `0` — §8's boundary
    /// case relies on this).
    ///
    /// Returns the id of the resulting PIT entry, for use with
    /// `cancel_interest`, when one was created immediately. Returns `None`
    /// when `sink` is absent (nothing to cancel) or the send is deferred
    /// behind host-probing (§4.8) — there is no PIT entry yet to cancel in
    /// that case.
    pub fn express_interest(
        &self,
        name: Name,
        sink: Option<ResponseSink>,
        template: Option<Interest>,
    ) -> Option<PitId> {
        let interest = match template {
            Some(mut t) => {
                t.name = name;
                t
            }
            None => {
                let lifetime = self.inner.borrow().config.default_interest_lifetime_ms;
                let mut i = Interest::new(name);
                i.interest_lifetime_ms = lifetime;
                i
            }
        };
        self.send_interest_or_defer(interest, sink)
    }

    /// Cancels a pending Interest by the id `express_interest` returned.
    /// The spec calls this a trivial add-on (§5): remove the PIT entry so
    /// its sink is never invoked; there is no separate timer object to
    /// cancel since PIT entries are walked directly by deadline (§4.2), so
    /// removing the entry is all cancellation requires. Idempotent: a
    /// second cancellation, or one racing a just-delivered Data, returns
    /// `false`.
    pub fn cancel_interest(&self, id: PitId) -> bool {
        self.inner.borrow_mut().pit.remove(id).is_some()
    }

    fn send_interest_or_defer(&self, interest: Interest, sink: Option<ResponseSink>) -> Option<PitId> {
        let needs_host = { let inner = self.inner.borrow(); inner.host.is_none() || inner.port.is_none() };
        if needs_host {
            self.begin_host_probe(DeferredSend::Interest(interest, sink));
            return None;
        }

        let already_connected = {
            let inner = self.inner.borrow();
            inner.transport.is_open()
                && inner.transport.connected_host() == inner.host.as_deref()
                && inner.transport.connected_port() == inner.port
        };
        if !already_connected {
            let (host, port) = {
                let inner = self.inner.borrow();
                (inner.host.clone().unwrap(), inner.port.unwrap())
            };
            let mut inner = self.inner.borrow_mut();
            if let Err(err) = inner.transport.connect(&host, port) {
                log::warn!("connect to {host}:{port} failed: {err}");
                return None;
            }
        }
        // A Face constructed with a preset host/port never goes through
        // `try_next_candidate`/`on_probe_answered`, so this is the only
        // place that transition fires for it (§3.8's `ready = Opened` ⇔
        // connected invariant).
        self.mark_opened_if_needed();
        self.transmit_interest(interest, sink)
    }

    /// Transitions `Unopen -> Opened` and fires `on_open` exactly once, for
    /// Faces that reach a connected transport without going through the
    /// host-probing state machine (§4.8).
    fn mark_opened_if_needed(&self) {
        if self.inner.borrow().state != ReadyState::Unopen {
            return;
        }
        let open_cb = {
            let mut inner = self.inner.borrow_mut();
            inner.state = ReadyState::Opened;
            inner.on_open.take()
        };
        if let Some(mut cb) = open_cb {
            cb();
            self.inner.borrow_mut().on_open = Some(cb);
        }
    }

    fn transmit_interest(&self, mut interest: Interest, sink: Option<ResponseSink>) -> Option<PitId> {
        if interest.nonce.is_none() {
            interest.nonce = Some(rand::random());
        }
        let bytes = encode_interest(&interest);
        let mut inner = self.inner.borrow_mut();
        let now = inner.platform.now();
        let id = sink.map(|s| inner.pit.insert(interest, s, now));
        if let Err(err) = inner.transport.send(&bytes) {
            log::warn!("send failed: {err}");
        }
        id
    }

    /// §4.7.2: register a local handler for Interests under `name`.
    pub fn register_prefix(&self, name: Name, sink: InterestSink, flags: u32) {
        let flags = flags | 3;
        let needs_host = { let inner = self.inner.borrow(); inner.host.is_none() || inner.port.is_none() };
        if needs_host {
            self.begin_host_probe(DeferredSend::Register(name, sink, flags));
            return;
        }
        let ndnd_id_known = self.inner.borrow().ndnd_id.is_some();
        if !ndnd_id_known {
            self.inner.borrow_mut().pending_after_open.push(DeferredSend::Register(name, sink, flags));
            self.fetch_ndnd_id();
            return;
        }
        self.send_selfreg(name, sink, flags);
    }

    fn fetch_ndnd_id(&self) {
        if self.inner.borrow().ndnd_id_fetch_in_flight {
            return;
        }
        self.inner.borrow_mut().ndnd_id_fetch_in_flight = true;

        let face = self.clone();
        let sink: ResponseSink = Box::new(move |event| {
            match event {
                DataEvent::Content { data } | DataEvent::ContentUnverified { data } => {
                    match data.signed_info.publisher_public_key_digest.clone() {
                        Some(digest) => face.on_ndnd_id_resolved(digest),
                        None => log::warn!("ndnd KEY response carried no publisher key digest"),
                    }
                }
                DataEvent::ContentBad { .. } => log::warn!("ndnd KEY response failed verification"),
                DataEvent::TimedOut => {
                    log::warn!("timed out fetching ndnd-id; aborting pending registrations");
                    face.abort_pending_registrations();
                }
            }
            ReexpressDecision::Stop
        });
        let bootstrap_name = Name::from_uri("/%C1.M.S.localhost/%C1.M.SRV/ndnd/KEY");
        self.express_interest(bootstrap_name, Some(sink), None);
    }

    fn on_ndnd_id_resolved(&self, digest: Vec<u8>) {
        let pending = {
            let mut inner = self.inner.borrow_mut();
            inner.ndnd_id = Some(digest);
            inner.ndnd_id_fetch_in_flight = false;
            std::mem::take(&mut inner.pending_after_open)
        };
        for item in pending {
            match item {
                DeferredSend::Register(name, sink, flags) => self.send_selfreg(name, sink, flags),
                other => {
                    let mut inner = self.inner.borrow_mut();
                    inner.pending_after_open.push(other);
                }
            }
        }
    }

    fn abort_pending_registrations(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.ndnd_id_fetch_in_flight = false;
        inner.pending_after_open.retain(|item| !matches!(item, DeferredSend::Register(..)));
    }

    fn send_selfreg(&self, name: Name, sink: InterestSink, flags: u32) {
        let ndnd_id = self.inner.borrow().ndnd_id.clone().expect("ndnd_id resolved before selfreg");

        let entry = ForwardingEntry::selfreg(name.clone(), flags);
        let fe_bytes = encode_forwarding_entry(&entry);
        let now_ms = self.inner.borrow().platform.now().ms_since_1970;
        let mut envelope = Data {
            name: name.clone(),
            content: fe_bytes,
            signed_info: SignedInfo {
                key_locator: None,
                publisher_public_key_digest: None,
                timestamp_ms: Some(now_ms),
                content_type: 0,
                freshness_seconds: None,
            },
            signature_type: self.inner.borrow().verifier.signature_type(),
            signature: Vec::new(),
            witness: None,
        };
        let signed_bytes = envelope.signed_portion();
        envelope.signature = self.inner.borrow().verifier.sign(&signed_bytes);
        let envelope_bytes = encode_data(&envelope);

        let selfreg_name = Name::from_uri("/ndnx")
            .append(ndnd_id)
            .append(b"selfreg".to_vec())
            .append(envelope_bytes);
        let mut interest = Interest::new(selfreg_name);
        interest.scope = Some(1);

        self.transmit_interest(interest, None);
        self.inner.borrow_mut().cst.register(name, sink, flags);
    }

    /// §4.7.3: close the Face. Clears the PIT and CST so no sink is ever
    /// invoked again afterward (§8 invariant 4).
    pub fn close(&self) -> Result<(), FaceError> {
        // `on_close` is taken out and the borrow dropped before it runs, the
        // same pattern `handle_transport_closed` uses, so a callback that
        // itself calls back into this Face (e.g. `is_open`) doesn't hit an
        // already-mutably-borrowed `RefCell`.
        let cb = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != ReadyState::Opened {
                return Err(FaceError::NotOpen);
            }
            inner.state = ReadyState::Closed;
            inner.transport.close();
            inner.pit.clear();
            inner.cst.clear();
            inner.on_close.take()
        };
        if let Some(mut cb) = cb {
            cb();
        }
        Ok(())
    }

    fn begin_host_probe(&self, deferred: DeferredSend) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.pending_after_open.push(deferred);
            if inner.probing_candidate.is_some() {
                return;
            }
            if inner.host_strategy.is_none() {
                if inner.config.candidate_hosts.is_empty() {
                    log::warn!("no host configured and no candidate hosts to probe");
                    inner.pending_after_open.clear();
                    return;
                }
                inner.host_strategy = Some(HostStrategy::new(inner.config.candidate_hosts.clone()));
            }
        }
        self.try_next_candidate();
    }

    fn try_next_candidate(&self) {
        let candidate = {
            let mut inner = self.inner.borrow_mut();
            inner.host_strategy.as_mut().and_then(|s| s.next_candidate())
        };
        let Some(candidate) = candidate else {
            log::warn!("host strategy exhausted; no forwarder answered");
            let mut inner = self.inner.borrow_mut();
            inner.probing_candidate = None;
            inner.pending_after_open.clear();
            return;
        };

        let port = self.inner.borrow().config.port.unwrap_or(6363);
        let connect_result = {
            let mut inner = self.inner.borrow_mut();
            inner.probing_candidate = Some(candidate.clone());
            inner.transport.connect(&candidate, port)
        };
        if let Err(err) = connect_result {
            log::warn!("probe connect to {candidate} failed: {err}");
            self.try_next_candidate();
            return;
        }

        {
            let mut inner = self.inner.borrow_mut();
            let now = inner.platform.now();
            inner.probe_deadline = Some(now.adding(inner.config.probe_timeout_ms));
        }

        let face = self.clone();
        let sink: ResponseSink = Box::new(move |_event| {
            face.on_probe_answered();
            ReexpressDecision::Stop
        });
        let mut probe = Interest::new(Name::new());
        probe.interest_lifetime_ms = 4000;
        let id = self.transmit_interest(probe, Some(sink));
        self.inner.borrow_mut().probing_pit_id = id;
    }

    fn on_probe_answered(&self) {
        let open_cb = {
            let mut inner = self.inner.borrow_mut();
            let Some(host) = inner.probing_candidate.take() else { return };
            let port = inner.config.port.unwrap_or(6363);
            inner.host = Some(host);
            inner.port = Some(port);
            inner.probe_deadline = None;
            inner.probing_pit_id = None;
            inner.state = ReadyState::Opened;
            inner.on_open.take()
        };
        if let Some(mut cb) = open_cb {
            cb();
            self.inner.borrow_mut().on_open = Some(cb);
        }
        self.drain_pending_after_open();
    }

    fn drain_pending_after_open(&self) {
        let pending = std::mem::take(&mut self.inner.borrow_mut().pending_after_open);
        for item in pending {
            match item {
                DeferredSend::Interest(interest, sink) => { self.send_interest_or_defer(interest, sink); },
                DeferredSend::Register(name, sink, flags) => self.register_prefix(name, sink, flags),
            }
        }
    }

    fn fire_probe_timer_if_due(&self, now: Timestamp) {
        let due = matches!(self.inner.borrow().probe_deadline, Some(d) if d <= now);
        if !due {
            return;
        }
        let pit_id = {
            let mut inner = self.inner.borrow_mut();
            inner.probe_deadline = None;
            inner.probing_pit_id.take()
        };
        if let Some(id) = pit_id {
            self.inner.borrow_mut().pit.remove(id);
        }
        self.try_next_candidate();
    }

    /// Drives PIT timers, the probe timer, and any available transport
    /// readiness once. Meant to be called from a loop (see
    /// `run_until_closed`) or directly by tests pumping a `LoopbackTransport`.
    pub fn poll_once(&self) {
        let now = self.inner.borrow().platform.now();
        self.fire_probe_timer_if_due(now);

        let expired = self.inner.borrow_mut().pit.take_expired(now);
        for (_, interest, mut sink) in expired {
            if matches!(sink(DataEvent::TimedOut), ReexpressDecision::Reexpress) {
                self.transmit_interest(interest, Some(sink));
            }
        }

        // Poll whenever the transport itself is connected, not only once
        // `state == Opened`: during host-probing (§4.8) the transport is
        // already connected to a candidate while the Face awaits the
        // probe's answer, and that answer is what flips `state` to
        // `Opened` in the first place.
        let transport_is_open = self.inner.borrow().transport.is_open();
        if !transport_is_open {
            return;
        }

        let poll_result = self.inner.borrow_mut().transport.poll();
        match poll_result {
            Ok(result) => {
                for element in &result.elements {
                    self.dispatch_element(element);
                }
                if result.closed {
                    self.handle_transport_closed();
                }
            }
            Err(err) => {
                log::warn!("transport poll error: {err}");
                self.handle_transport_closed();
            }
        }
    }

    /// The nearest upcoming PIT or probe timer deadline, used to size the
    /// event loop's wait timeout (§5.1).
    pub fn next_wakeup(&self) -> Option<Timestamp> {
        let inner = self.inner.borrow();
        match (inner.pit.next_deadline(), inner.probe_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Runs `poll_once` in a loop until the Face closes. Grounded on the
    /// teacher's `BlockingForwarder::forward` timeout-computation loop
    /// (§5.1), simplified to a plain sleep-and-poll cycle rather than the
    /// teacher's `polling`-reactor-plus-background-thread design, since a
    /// single Face has exactly one transport and no cross-face wakeup
    /// queue to overlap polling with (see DESIGN.md).
    pub fn run_until_closed(&self) {
        loop {
            if self.inner.borrow().state == ReadyState::Closed {
                break;
            }
            self.poll_once();

            let now = self.inner.borrow().platform.now();
            let sleep = self
                .next_wakeup()
                .and_then(|deadline| deadline.difference(&now))
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(50))
                .min(Duration::from_millis(250));
            std::thread::sleep(sleep.max(Duration::from_millis(1)));
        }
    }

    fn handle_transport_closed(&self) {
        let cb = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == ReadyState::Closed {
                return;
            }
            inner.state = ReadyState::Closed;
            inner.pit.clear();
            inner.cst.clear();
            inner.on_close.take()
        };
        if let Some(mut cb) = cb {
            cb();
        }
    }

    fn dispatch_element(&self, bytes: &[u8]) {
        match decode_element(bytes) {
            Ok(Element::Interest(interest)) => self.dispatch_interest(interest),
            Ok(Element::Data(data)) => self.dispatch_data(data),
            Ok(Element::Unknown(t)) => log::debug!("discarding unknown element type {t}"),
            Err(err) => log::warn!("discarding unparseable element: {err}"),
        }
    }

    /// §4.7.4: an `InterestSink` MUST NOT block and may re-enter the Face
    /// (e.g. `express_interest`, `register_prefix`, `is_open`). The sink is
    /// swapped out of its `CstEntry` for a placeholder and the borrow is
    /// dropped before it runs, then put back — the same shape
    /// `dispatch_data` uses to pull a sink out of the PIT before invoking
    /// it, adapted for a CST whose entries are append-only and can't simply
    /// be removed.
    fn dispatch_interest(&self, interest: Interest) {
        let placeholder: InterestSink = Box::new(|_: &Name| InterestAction::Ignore);
        let swapped = {
            let mut inner = self.inner.borrow_mut();
            inner.cst.swap_sink(&interest.name, placeholder)
        };
        let Some((idx, mut sink)) = swapped else { return };

        let action = sink(&interest.name);
        self.inner.borrow_mut().cst.restore_sink(idx, sink);

        if let InterestAction::Respond(data) = action {
            let bytes = encode_data(&data);
            let mut inner = self.inner.borrow_mut();
            if let Err(err) = inner.transport.send(&bytes) {
                log::warn!("failed to send response Data: {err}");
            }
        }
    }

    fn dispatch_data(&self, data: Data) {
        let matched = self.inner.borrow_mut().pit.take_matching(&data.name);
        let Some((_, mut sink)) = matched else { return };

        let decision = {
            let inner = self.inner.borrow();
            verify_flow::decide(inner.config.verify_enabled, &data, &inner.verifier, &inner.key_cache)
        };
        match decision {
            VerifyDecision::Immediate(outcome) => self.deliver(&mut sink, &data, outcome),
            VerifyDecision::NeedKey { key_name_prefix } => {
                let face = self.clone();
                let original = data;
                let cache_key_name = key_name_prefix.clone();
                let nested_sink: ResponseSink = Box::new(move |event| {
                    match event {
                        DataEvent::Content { data: key_data } | DataEvent::ContentUnverified { data: key_data } => {
                            let (outcome, key) = {
                                let inner = face.inner.borrow();
                                verify_flow::finish_after_key_fetch(&original, key_data, &inner.verifier)
                            };
                            if let Some(key) = key {
                                let now = face.inner.borrow().platform.now();
                                face.inner.borrow_mut().key_cache.insert(cache_key_name.clone(), key, now);
                            }
                            face.deliver(&mut sink, &original, outcome);
                        }
                        DataEvent::ContentBad { .. } => {
                            face.deliver(&mut sink, &original, DataOutcome::ContentBad)
                        }
                        // §4.4 / §9: a timed-out key fetch leaves the original
                        // request with no delivery at all.
                        DataEvent::TimedOut => {}
                    }
                    ReexpressDecision::Stop
                });
                self.express_interest(key_name_prefix, Some(nested_sink), None);
            }
        }
    }

    fn deliver(&self, sink: &mut ResponseSink, data: &Data, outcome: DataOutcome) {
        let event = match outcome {
            DataOutcome::Content => DataEvent::Content { data },
            DataOutcome::ContentUnverified => DataEvent::ContentUnverified { data },
            DataOutcome::ContentBad => DataEvent::ContentBad { data },
        };
        sink(event);
    }
}
