//! The embedder-facing façade (spec §2, §6): funnels every operation
//! through a `TaskQueue` and presents the W3C `RTCPeerConnection`
//! surface (create-offer/create-answer/set-*-description/
//! add-ice-candidate, plus negotiation-needed, ICE candidate, and
//! state-change events).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::configuration::{RTCConfiguration, SettingEngine};
use crate::description_applier;
use crate::description_builder;
use crate::error::{Error, Result};
use crate::negotiation::{
    is_negotiation_needed, NegotiatedDirections, NegotiationNeededState, NegotiationRole,
};
use crate::sdp::{Direction, SessionDescription};
use crate::state::{
    check_next_signaling_state, IceConnectionState, IceGatheringState, PeerConnectionState,
    SignalingState, StateChangeOp,
};
use crate::state_collator::{self, TransportSubstate};
use crate::task_queue::TaskQueue;
use crate::transceiver::{MediaKind, Transceiver, TransportId};
use crate::transport::Transport;

/// The mutable data model of §3, guarded by a single mutex and only
/// ever touched from inside a `TaskQueue` closure (spec §5: "the state
/// lock is held across every mutation ... released around
/// embedder-visible notifications").
pub(crate) struct Inner {
    pub signaling_state: SignalingState,
    pub current_local: Option<SessionDescription>,
    pub current_remote: Option<SessionDescription>,
    pub pending_local: Option<SessionDescription>,
    pub pending_remote: Option<SessionDescription>,
    pub need_negotiation: bool,
    pub negotiation_state: NegotiationNeededState,
    pub is_closed: bool,
    pub pending_ice_candidates: Vec<(usize, String)>,
    pub transceivers: Vec<Transceiver>,
    /// Parallel to `transceivers`: the last negotiated local/remote
    /// direction for each, used by the renegotiation-needed check.
    pub negotiated: Vec<NegotiatedDirections>,
    pub transports: Vec<Transport>,
    /// Which side offered in the negotiation currently in flight (or
    /// most recently completed), used to orient the direction
    /// intersection table (offer_dir, answer_declared_dir).
    pub role: Option<NegotiationRole>,
    /// Whether the local side is ICE-controller; fixed by whichever
    /// side sent the first offer (spec §4.2) and never flipped by
    /// later renegotiation.
    pub ice_controlling: Option<bool>,
    pub setting_engine: SettingEngine,
    pub mid_index: HashMap<String, usize>,
    next_mid: usize,
}

impl Inner {
    pub(crate) fn new(setting_engine: SettingEngine) -> Self {
        Inner {
            signaling_state: SignalingState::Stable,
            current_local: None,
            current_remote: None,
            pending_local: None,
            pending_remote: None,
            need_negotiation: false,
            negotiation_state: NegotiationNeededState::Empty,
            is_closed: false,
            pending_ice_candidates: Vec::new(),
            transceivers: Vec::new(),
            negotiated: Vec::new(),
            transports: Vec::new(),
            role: None,
            ice_controlling: None,
            setting_engine,
            mid_index: HashMap::new(),
            next_mid: 0,
        }
    }

    pub fn generate_mid(&mut self) -> String {
        let mid = self.next_mid.to_string();
        self.next_mid += 1;
        mid
    }

    /// Returns the (possibly freshly created) `Transport` backing
    /// transceiver `idx`, generating ICE credentials once at creation
    /// (spec §2 dataflow; §6.1 decision: one certificate per
    /// PeerConnection rather than per transport, so only the ICE
    /// credentials are transport-specific).
    pub fn ensure_transport(&mut self, idx: usize) -> TransportId {
        if let Some(id) = self.transceivers[idx].transport {
            return id;
        }
        let session_id = self.transports.len();
        let transport = Transport::new(session_id, self.setting_engine.certificate.clone());
        self.transports.push(transport);
        let id = TransportId(session_id);
        self.transceivers[idx].transport = Some(id);
        id
    }

    pub fn transport(&self, id: TransportId) -> &Transport {
        &self.transports[id.0]
    }

    pub fn transport_mut(&mut self, id: TransportId) -> &mut Transport {
        &mut self.transports[id.0]
    }

    /// Snapshot of every non-stopped transceiver's transport substates,
    /// fed to `StateCollator` (spec §4.5).
    fn transport_substates(&self) -> Vec<TransportSubstate> {
        self.transceivers
            .iter()
            .filter(|t| !t.stopped)
            .filter_map(|t| t.transport)
            .map(|id| {
                let transport = self.transport(id);
                TransportSubstate {
                    ice: transport.ice.state(),
                    dtls: transport.dtls.state(),
                    gathering: transport.ice.gathering_state(),
                }
            })
            .collect()
    }
}

/// One embedder-visible occurrence produced by a task, queued up while
/// the state lock is held and dispatched only after it is released
/// (spec §5: "released around embedder-visible notifications to
/// forbid re-entrant deadlock").
#[derive(Debug, Clone)]
pub enum Event {
    NegotiationNeeded,
    IceCandidate { mline: usize, candidate: String },
    SignalingState(SignalingState),
    IceConnectionState(IceConnectionState),
    IceGatheringState(IceGatheringState),
    ConnectionState(PeerConnectionState),
}

type Handler<T> = Box<dyn FnMut(T) + Send + 'static>;

#[derive(Default)]
struct Handlers {
    on_negotiation_needed: Option<Handler<()>>,
    on_ice_candidate: Option<Handler<(usize, String)>>,
    on_signaling_state_change: Option<Handler<SignalingState>>,
    on_ice_connection_state_change: Option<Handler<IceConnectionState>>,
    on_ice_gathering_state_change: Option<Handler<IceGatheringState>>,
    on_connection_state_change: Option<Handler<PeerConnectionState>>,
}

fn dispatch(handlers: &Arc<Mutex<Handlers>>, events: Vec<Event>) {
    for event in events {
        log::trace!("dispatching {event:?}");
        let mut h = handlers.lock().unwrap();
        match event {
            Event::NegotiationNeeded => {
                if let Some(cb) = h.on_negotiation_needed.as_mut() {
                    cb(());
                }
            }
            Event::IceCandidate { mline, candidate } => {
                if let Some(cb) = h.on_ice_candidate.as_mut() {
                    cb((mline, candidate));
                }
            }
            Event::SignalingState(s) => {
                if let Some(cb) = h.on_signaling_state_change.as_mut() {
                    cb(s);
                }
            }
            Event::IceConnectionState(s) => {
                if let Some(cb) = h.on_ice_connection_state_change.as_mut() {
                    cb(s);
                }
            }
            Event::IceGatheringState(s) => {
                if let Some(cb) = h.on_ice_gathering_state_change.as_mut() {
                    cb(s);
                }
            }
            Event::ConnectionState(s) => {
                if let Some(cb) = h.on_connection_state_change.as_mut() {
                    cb(s);
                }
            }
        }
    }
}

/// Re-evaluates the renegotiation-needed check (spec §4.4), using the
/// `NegotiationNeededState` latch to coalesce re-entrant triggers.
/// Per the W3C algorithm this mirrors, a trigger while not in the
/// `stable` signaling state is recorded but does not itself fire the
/// event; the event fires when the next stable entry re-runs this
/// check and finds it still true.
pub(crate) fn run_negotiation_check(inner: &mut Inner, events: &mut Vec<Event>) {
    if inner.signaling_state != SignalingState::Stable {
        inner.need_negotiation = true;
        return;
    }
    if !inner.negotiation_state.trigger() {
        return;
    }
    let needed = is_negotiation_needed(
        inner.current_local.is_some() || inner.current_remote.is_some(),
        inner.role,
        &inner.transceivers,
        &inner.negotiated,
    );
    inner.need_negotiation = needed;
    if needed {
        log::debug!("negotiation needed");
        events.push(Event::NegotiationNeeded);
    }
    if inner.negotiation_state.finish() {
        run_negotiation_check(inner, events);
    }
}

/// Folds every non-stopped transceiver's transport substate into the
/// three aggregated properties and appends change notifications for
/// whichever actually changed (spec §4.5).
pub(crate) fn recollate_states(
    inner: &mut Inner,
    prev_ice_gathering: IceGatheringState,
    prev_ice_connection: IceConnectionState,
    prev_connection: PeerConnectionState,
) -> (IceGatheringState, IceConnectionState, PeerConnectionState, Vec<Event>) {
    let substates = inner.transport_substates();
    let collated = state_collator::collate(inner.is_closed, &substates);
    let mut events = Vec::new();
    if collated.ice_gathering != prev_ice_gathering {
        log::debug!("ice gathering state: {prev_ice_gathering} -> {}", collated.ice_gathering);
        events.push(Event::IceGatheringState(collated.ice_gathering));
    }
    if collated.ice_connection != prev_ice_connection {
        log::debug!("ice connection state: {prev_ice_connection} -> {}", collated.ice_connection);
        events.push(Event::IceConnectionState(collated.ice_connection));
    }
    if collated.connection != prev_connection {
        log::debug!("connection state: {prev_connection} -> {}", collated.connection);
        events.push(Event::ConnectionState(collated.connection));
    }
    (
        collated.ice_gathering,
        collated.ice_connection,
        collated.connection,
        events,
    )
}

/// The WebRTC peer-connection coordinator façade (spec §2, §6). Every
/// operation is posted to a dedicated `TaskQueue` worker and completes
/// through a blocking reply channel, modeling the promise-based
/// suspension points of spec §5 without pulling in an async runtime
/// (SPEC_FULL.md §5: this core has no I/O of its own to await).
pub struct PeerConnection {
    queue: TaskQueue,
    inner: Arc<Mutex<Inner>>,
    handlers: Arc<Mutex<Handlers>>,
    ice_gathering_state: Arc<Mutex<IceGatheringState>>,
    ice_connection_state: Arc<Mutex<IceConnectionState>>,
    connection_state: Arc<Mutex<PeerConnectionState>>,
}

impl PeerConnection {
    pub fn new(configuration: RTCConfiguration) -> Result<Self> {
        let setting_engine = configuration.into_setting_engine()?;
        Ok(PeerConnection {
            queue: TaskQueue::new(),
            inner: Arc::new(Mutex::new(Inner::new(setting_engine))),
            handlers: Arc::new(Mutex::new(Handlers::default())),
            ice_gathering_state: Arc::new(Mutex::new(IceGatheringState::New)),
            ice_connection_state: Arc::new(Mutex::new(IceConnectionState::New)),
            connection_state: Arc::new(Mutex::new(PeerConnectionState::New)),
        })
    }

    pub fn on_negotiation_needed<F: FnMut() + Send + 'static>(&self, mut f: F) {
        self.handlers.lock().unwrap().on_negotiation_needed = Some(Box::new(move |()| f()));
    }

    pub fn on_ice_candidate<F: FnMut(usize, String) + Send + 'static>(&self, mut f: F) {
        self.handlers.lock().unwrap().on_ice_candidate = Some(Box::new(move |(m, c)| f(m, c)));
    }

    pub fn on_signaling_state_change<F: FnMut(SignalingState) + Send + 'static>(&self, f: F) {
        self.handlers.lock().unwrap().on_signaling_state_change = Some(Box::new(f));
    }

    pub fn on_ice_connection_state_change<F: FnMut(IceConnectionState) + Send + 'static>(
        &self,
        f: F,
    ) {
        self.handlers.lock().unwrap().on_ice_connection_state_change = Some(Box::new(f));
    }

    pub fn on_ice_gathering_state_change<F: FnMut(IceGatheringState) + Send + 'static>(&self, f: F) {
        self.handlers.lock().unwrap().on_ice_gathering_state_change = Some(Box::new(f));
    }

    pub fn on_connection_state_change<F: FnMut(PeerConnectionState) + Send + 'static>(&self, f: F) {
        self.handlers.lock().unwrap().on_connection_state_change = Some(Box::new(f));
    }

    /// Adds a transceiver declared by the embedder (spec §2: "embedder
    /// attaches an input endpoint"). Triggers the renegotiation-needed
    /// check (spec §4.4).
    pub fn add_transceiver(&self, kind: MediaKind, direction: Direction) -> usize {
        let inner = Arc::clone(&self.inner);
        let handlers = Arc::clone(&self.handlers);
        self.queue.enqueue_and_wait(move || {
            let mut guard = inner.lock().unwrap();
            if guard.is_closed {
                return 0;
            }
            log::debug!("adding {kind:?} transceiver, direction {direction}");
            guard.transceivers.push(Transceiver::new_with_kind(kind, direction, Vec::new()));
            guard.negotiated.push(NegotiatedDirections::default());
            let idx = guard.transceivers.len() - 1;
            let mut events = Vec::new();
            run_negotiation_check(&mut guard, &mut events);
            drop(guard);
            dispatch(&handlers, events);
            idx
        })
    }

    pub fn create_offer(&self) -> Result<SessionDescription> {
        let inner = Arc::clone(&self.inner);
        self.queue
            .enqueue_and_wait(move || {
                let mut guard = inner.lock().unwrap();
                if guard.is_closed {
                    return Err(Error::ErrCancelled);
                }
                description_builder::create_offer(&mut guard)
            })
    }

    pub fn create_answer(&self) -> Result<SessionDescription> {
        let inner = Arc::clone(&self.inner);
        self.queue
            .enqueue_and_wait(move || {
                let mut guard = inner.lock().unwrap();
                if guard.is_closed {
                    return Err(Error::ErrCancelled);
                }
                description_builder::create_answer(&mut guard)
            })
    }

    fn set_description(&self, op: StateChangeOp, desc: SessionDescription) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let handlers = Arc::clone(&self.handlers);
        let ice_gathering_state = Arc::clone(&self.ice_gathering_state);
        let ice_connection_state = Arc::clone(&self.ice_connection_state);
        let connection_state = Arc::clone(&self.connection_state);
        self.queue.enqueue_and_wait(move || {
            let mut guard = inner.lock().unwrap();
            if guard.is_closed {
                return Err(Error::ErrCancelled);
            }
            log::debug!("applying {op} description");
            let mut events = Vec::new();
            let result = description_applier::apply(&mut guard, op, desc, &mut events);
            let prev_gathering = *ice_gathering_state.lock().unwrap();
            let prev_connection_ice = *ice_connection_state.lock().unwrap();
            let prev_connection = *connection_state.lock().unwrap();
            let (g, i, c, mut state_events) =
                recollate_states(&mut guard, prev_gathering, prev_connection_ice, prev_connection);
            *ice_gathering_state.lock().unwrap() = g;
            *ice_connection_state.lock().unwrap() = i;
            *connection_state.lock().unwrap() = c;
            events.append(&mut state_events);
            drop(guard);
            dispatch(&handlers, events);
            result
        })
    }

    pub fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.set_description(StateChangeOp::SetLocal, desc)
    }

    pub fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.set_description(StateChangeOp::SetRemote, desc)
    }

    /// Normalizes and either forwards or buffers a trickled ICE
    /// candidate (spec §4.6). No reply: returns after enqueue.
    pub fn add_ice_candidate(&self, mline: usize, candidate_line: impl Into<String>) {
        let inner = Arc::clone(&self.inner);
        let mut line = candidate_line.into();
        if !line.starts_with("candidate:") {
            line = format!("candidate:{line}");
        }
        log::trace!("add_ice_candidate mline={mline} {line}");
        self.queue.enqueue(move || {
            let mut guard = inner.lock().unwrap();
            if guard.is_closed {
                return;
            }
            description_applier::add_ice_candidate(&mut guard, mline, line);
        });
    }

    pub fn close(&self) {
        log::debug!("closing peer connection");
        let mut guard = self.inner.lock().unwrap();
        guard.is_closed = true;
        guard.signaling_state = SignalingState::Closed;
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.inner.lock().unwrap().signaling_state
    }

    pub fn ice_connection_state(&self) -> IceConnectionState {
        *self.ice_connection_state.lock().unwrap()
    }

    pub fn ice_gathering_state(&self) -> IceGatheringState {
        *self.ice_gathering_state.lock().unwrap()
    }

    pub fn connection_state(&self) -> PeerConnectionState {
        *self.connection_state.lock().unwrap()
    }

    pub fn current_local_description(&self) -> Option<SessionDescription> {
        self.inner.lock().unwrap().current_local.clone()
    }

    pub fn current_remote_description(&self) -> Option<SessionDescription> {
        self.inner.lock().unwrap().current_remote.clone()
    }

    pub fn pending_local_description(&self) -> Option<SessionDescription> {
        self.inner.lock().unwrap().pending_local.clone()
    }

    pub fn pending_remote_description(&self) -> Option<SessionDescription> {
        self.inner.lock().unwrap().pending_remote.clone()
    }
}

fn _assert_check_next_signaling_state_used() {
    // keeps the re-export reachable from this module's doc examples
    let _ = check_next_signaling_state;
}
