use std::fmt;

/// Indicates the state of one DTLS transport, as reported by the
/// external DTLS collaborator (see `crate::transport::DtlsState`).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum DtlsState {
    #[default]
    New,
    Connecting,
    Connected,
    Closed,
    Failed,
}

/// The aggregated overall connection state exposed on `PeerConnection`,
/// folded from every transceiver's ICE and DTLS substates by
/// `StateCollator` (spec §4.5).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum PeerConnectionState {
    #[default]
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

const NEW_STR: &str = "new";
const CONNECTING_STR: &str = "connecting";
const CONNECTED_STR: &str = "connected";
const DISCONNECTED_STR: &str = "disconnected";
const FAILED_STR: &str = "failed";
const CLOSED_STR: &str = "closed";

impl fmt::Display for PeerConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeerConnectionState::New => NEW_STR,
            PeerConnectionState::Connecting => CONNECTING_STR,
            PeerConnectionState::Connected => CONNECTED_STR,
            PeerConnectionState::Disconnected => DISCONNECTED_STR,
            PeerConnectionState::Failed => FAILED_STR,
            PeerConnectionState::Closed => CLOSED_STR,
        };
        write!(f, "{s}")
    }
}

impl From<&str> for PeerConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            CONNECTING_STR => PeerConnectionState::Connecting,
            CONNECTED_STR => PeerConnectionState::Connected,
            DISCONNECTED_STR => PeerConnectionState::Disconnected,
            FAILED_STR => PeerConnectionState::Failed,
            CLOSED_STR => PeerConnectionState::Closed,
            _ => PeerConnectionState::New,
        }
    }
}
