use std::fmt;

/// Indicates the state of one ICE transport, as reported by the
/// external ICE agent collaborator (see `crate::transport::IceState`).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceState {
    #[default]
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// The aggregated ICE connectivity state exposed on `PeerConnection`,
/// folded from every non-stopped transceiver's transport by
/// `StateCollator` (spec §4.5).
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceConnectionState {
    #[default]
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

const NEW_STR: &str = "new";
const CHECKING_STR: &str = "checking";
const CONNECTED_STR: &str = "connected";
const COMPLETED_STR: &str = "completed";
const DISCONNECTED_STR: &str = "disconnected";
const FAILED_STR: &str = "failed";
const CLOSED_STR: &str = "closed";

impl fmt::Display for IceConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IceConnectionState::New => NEW_STR,
            IceConnectionState::Checking => CHECKING_STR,
            IceConnectionState::Connected => CONNECTED_STR,
            IceConnectionState::Completed => COMPLETED_STR,
            IceConnectionState::Disconnected => DISCONNECTED_STR,
            IceConnectionState::Failed => FAILED_STR,
            IceConnectionState::Closed => CLOSED_STR,
        };
        write!(f, "{s}")
    }
}

impl From<&str> for IceConnectionState {
    fn from(raw: &str) -> Self {
        match raw {
            CHECKING_STR => IceConnectionState::Checking,
            CONNECTED_STR => IceConnectionState::Connected,
            COMPLETED_STR => IceConnectionState::Completed,
            DISCONNECTED_STR => IceConnectionState::Disconnected,
            FAILED_STR => IceConnectionState::Failed,
            CLOSED_STR => IceConnectionState::Closed,
            _ => IceConnectionState::New,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_connection_state_string() {
        let tests = vec![
            (IceConnectionState::New, "new"),
            (IceConnectionState::Checking, "checking"),
            (IceConnectionState::Connected, "connected"),
            (IceConnectionState::Completed, "completed"),
            (IceConnectionState::Disconnected, "disconnected"),
            (IceConnectionState::Failed, "failed"),
            (IceConnectionState::Closed, "closed"),
        ];

        for (state, expected) in tests {
            assert_eq!(state.to_string(), expected);
            assert_eq!(IceConnectionState::from(expected), state);
        }
    }
}
