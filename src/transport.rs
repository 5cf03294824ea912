use crate::fingerprint::Certificate;
use crate::ice_credentials::generate_ice_credentials;
use crate::state::{DtlsState, IceGatheringState, IceState};

/// The DTLS client/server role a Transport has been assigned, derived
/// from the answer-side `setup` attribute (spec §4.3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsRole {
    Client,
    Server,
}

/// The interface this crate needs from an external ICE agent
/// collaborator (spec §1): observable state plus credential/candidate
/// intake. The ICE agent's own gathering/connectivity-check logic is
/// out of scope; this crate only ever reads `state()` and forwards
/// credentials/candidates to it.
pub trait IceTransport: std::fmt::Debug + Send {
    fn state(&self) -> IceState;
    /// The gatherer's own New/Gathering/Complete progress (spec §4.5),
    /// a distinct axis from `state()`: it is sticky and only ever moves
    /// forward, unlike the connection substate which can regress to
    /// `Disconnected`/`Failed`. Mirrors the teacher's
    /// `RTCIceGathererState`.
    fn gathering_state(&self) -> IceGatheringState;
    fn set_local_credentials(&mut self, ufrag: &str, pwd: &str);
    fn set_remote_credentials(&mut self, ufrag: &str, pwd: &str);
    fn gather(&mut self);
    fn add_remote_candidate(&mut self, candidate_line: &str);
    /// Whether `set_remote_credentials` has been called yet, used to
    /// decide whether a trickled candidate can be forwarded immediately
    /// or must wait in the buffer (spec §4.6).
    fn has_remote_credentials(&self) -> bool;
    /// Lets tests reach into the concrete transport double; real ICE
    /// agent collaborators need not support this beyond the default.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// The interface this crate needs from an external DTLS transport
/// collaborator (spec §1): observable state plus role assignment. The
/// DTLS handshake itself is out of scope.
pub trait DtlsTransport: std::fmt::Debug + Send {
    fn state(&self) -> DtlsState;
    fn set_role(&mut self, role: DtlsRole);
    fn role(&self) -> Option<DtlsRole>;
}

/// An in-memory ICE transport double: starts `New`, exposes a setter
/// for tests and the `StateCollator` scenarios to drive its state
/// directly without a real ICE agent.
#[derive(Debug, Default)]
pub struct LoopbackIceTransport {
    state: IceState,
    gathering: IceGatheringState,
    pub local_ufrag: Option<String>,
    pub local_pwd: Option<String>,
    pub remote_ufrag: Option<String>,
    pub remote_pwd: Option<String>,
    pub remote_candidates: Vec<String>,
}

impl LoopbackIceTransport {
    pub fn set_state(&mut self, state: IceState) {
        self.state = state;
    }

    /// Drives the gatherer substate directly, for tests and the
    /// `StateCollator` scenarios that don't go through `gather()`.
    pub fn set_gathering_state(&mut self, gathering: IceGatheringState) {
        self.gathering = gathering;
    }
}

impl IceTransport for LoopbackIceTransport {
    fn state(&self) -> IceState {
        self.state
    }

    fn gathering_state(&self) -> IceGatheringState {
        self.gathering
    }

    fn set_local_credentials(&mut self, ufrag: &str, pwd: &str) {
        self.local_ufrag = Some(ufrag.to_string());
        self.local_pwd = Some(pwd.to_string());
    }

    fn set_remote_credentials(&mut self, ufrag: &str, pwd: &str) {
        self.remote_ufrag = Some(ufrag.to_string());
        self.remote_pwd = Some(pwd.to_string());
    }

    fn gather(&mut self) {
        if self.state == IceState::New {
            self.state = IceState::Checking;
        }
        if self.gathering == IceGatheringState::New {
            self.gathering = IceGatheringState::Gathering;
        }
    }

    fn add_remote_candidate(&mut self, candidate_line: &str) {
        self.remote_candidates.push(candidate_line.to_string());
    }

    fn has_remote_credentials(&self) -> bool {
        self.remote_ufrag.is_some()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// An in-memory DTLS transport double, mirroring `LoopbackIceTransport`.
#[derive(Debug, Default)]
pub struct LoopbackDtlsTransport {
    state: DtlsState,
    role: Option<DtlsRole>,
}

impl LoopbackDtlsTransport {
    pub fn set_state(&mut self, state: DtlsState) {
        self.state = state;
    }
}

impl DtlsTransport for LoopbackDtlsTransport {
    fn state(&self) -> DtlsState {
        self.state
    }

    fn set_role(&mut self, role: DtlsRole) {
        self.role = Some(role);
    }

    fn role(&self) -> Option<DtlsRole> {
        self.role
    }
}

/// Owns one ICE transport and one DTLS transport for a bundle of
/// transceivers (spec §3). RTCP-specific pairs are not modeled: RTCP
/// muxing is the only supported mode (bundling beyond rtcp-mux is a
/// Non-goal).
#[derive(Debug)]
pub struct Transport {
    pub session_id: usize,
    pub ice: Box<dyn IceTransport + Send>,
    pub dtls: Box<dyn DtlsTransport + Send>,
    pub certificate: Certificate,
    pub rtcp_mux: bool,
    /// The local ICE credentials generated for this transport, kept
    /// alongside it (rather than read back through `IceTransport`,
    /// which exposes no getter) so `DescriptionBuilder` can embed them
    /// in an offer/answer.
    pub local_ufrag: String,
    pub local_pwd: String,
}

impl Transport {
    pub fn new(session_id: usize, certificate: Certificate) -> Self {
        let (local_ufrag, local_pwd) = generate_ice_credentials();
        let mut ice: Box<dyn IceTransport + Send> = Box::new(LoopbackIceTransport::default());
        ice.set_local_credentials(&local_ufrag, &local_pwd);
        Transport {
            session_id,
            ice,
            dtls: Box::new(LoopbackDtlsTransport::default()),
            certificate,
            rtcp_mux: true,
            local_ufrag,
            local_pwd,
        }
    }
}
