use std::fmt;

use crate::error::{Error, Result};
use crate::sdp::SdpType;

/// Which slot (local or remote description) an apply operation targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StateChangeOp {
    SetLocal,
    SetRemote,
}

impl fmt::Display for StateChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateChangeOp::SetLocal => "set-local",
            StateChangeOp::SetRemote => "set-remote",
        };
        write!(f, "{s}")
    }
}

/// The SDP offer/answer negotiation progress of a `PeerConnection`.
///
/// Mirrors the W3C `RTCSignalingState` enum. Transitions are driven
/// exclusively by `check_next_signaling_state`, never set directly.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalingState {
    /// No offer/answer exchange in progress. The default state and the
    /// only state from which a new offer may be created.
    #[default]
    Stable,
    /// A local offer has been set; waiting for a remote answer.
    HaveLocalOffer,
    /// A remote offer has been set; a local answer must be created.
    HaveRemoteOffer,
    /// A local provisional answer has been set.
    HaveLocalPranswer,
    /// A remote provisional answer has been set.
    HaveRemotePranswer,
    /// The PeerConnection has been closed; every operation is a no-op.
    Closed,
}

const STABLE_STR: &str = "stable";
const HAVE_LOCAL_OFFER_STR: &str = "have-local-offer";
const HAVE_REMOTE_OFFER_STR: &str = "have-remote-offer";
const HAVE_LOCAL_PRANSWER_STR: &str = "have-local-pranswer";
const HAVE_REMOTE_PRANSWER_STR: &str = "have-remote-pranswer";
const CLOSED_STR: &str = "closed";

impl From<&str> for SignalingState {
    fn from(raw: &str) -> Self {
        match raw {
            STABLE_STR => SignalingState::Stable,
            HAVE_LOCAL_OFFER_STR => SignalingState::HaveLocalOffer,
            HAVE_REMOTE_OFFER_STR => SignalingState::HaveRemoteOffer,
            HAVE_LOCAL_PRANSWER_STR => SignalingState::HaveLocalPranswer,
            HAVE_REMOTE_PRANSWER_STR => SignalingState::HaveRemotePranswer,
            CLOSED_STR => SignalingState::Closed,
            _ => SignalingState::Stable,
        }
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalingState::Stable => STABLE_STR,
            SignalingState::HaveLocalOffer => HAVE_LOCAL_OFFER_STR,
            SignalingState::HaveRemoteOffer => HAVE_REMOTE_OFFER_STR,
            SignalingState::HaveLocalPranswer => HAVE_LOCAL_PRANSWER_STR,
            SignalingState::HaveRemotePranswer => HAVE_REMOTE_PRANSWER_STR,
            SignalingState::Closed => CLOSED_STR,
        };
        write!(f, "{s}")
    }
}

/// Applies the transition table in spec §4.1. `rollback` always returns
/// to `Stable`; any transition absent from the table is
/// `ErrSignalingStateProposedTransitionInvalid`.
pub fn check_next_signaling_state(
    cur: SignalingState,
    op: StateChangeOp,
    sdp_type: SdpType,
) -> Result<SignalingState> {
    if sdp_type == SdpType::Rollback && cur != SignalingState::Stable {
        return Ok(SignalingState::Stable);
    }
    if sdp_type == SdpType::Rollback {
        return Err(Error::ErrSignalingStateCannotRollback);
    }

    use SdpType::*;
    use SignalingState::*;
    use StateChangeOp::*;

    let next = match (cur, op, sdp_type) {
        (Stable, SetLocal, Offer) => Some(HaveLocalOffer),
        (Stable, SetRemote, Offer) => Some(HaveRemoteOffer),

        (HaveLocalOffer, SetLocal, Offer) => Some(HaveLocalOffer),
        (HaveLocalOffer, SetRemote, Answer) => Some(Stable),
        (HaveLocalOffer, SetRemote, Pranswer) => Some(HaveRemotePranswer),

        (HaveRemoteOffer, SetRemote, Offer) => Some(HaveRemoteOffer),
        (HaveRemoteOffer, SetLocal, Answer) => Some(Stable),
        (HaveRemoteOffer, SetLocal, Pranswer) => Some(HaveLocalPranswer),

        (HaveLocalPranswer, SetLocal, Pranswer) => Some(HaveLocalPranswer),
        (HaveLocalPranswer, SetLocal, Answer) => Some(Stable),

        (HaveRemotePranswer, SetRemote, Pranswer) => Some(HaveRemotePranswer),
        (HaveRemotePranswer, SetRemote, Answer) => Some(Stable),

        _ => None,
    };

    next.ok_or(Error::ErrSignalingStateProposedTransitionInvalid {
        from: cur,
        sdp_type: sdp_type.as_str(),
    })
}
