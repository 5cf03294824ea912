//! The renegotiation-needed check and its re-entrancy latch (spec §4.4).

use crate::sdp::Direction;
use crate::transceiver::Transceiver;

/// Which side of the last negotiation produced the current stable
/// state, since the renegotiation check differs for an offerer vs an
/// answerer (spec §4.4).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NegotiationRole {
    Offerer,
    Answerer,
}

/// Tracks, for an associated transceiver, the direction each side of
/// the last negotiation carried on its m-section. `DescriptionApplier`
/// fills this in as it processes each section (spec §4.3); the
/// renegotiation check reads it back.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegotiatedDirections {
    pub local: Option<Direction>,
    pub remote: Option<Direction>,
}

/// Returns true when any transceiver's declared direction has drifted
/// from what was last negotiated, or negotiation hasn't happened yet
/// (spec §4.4).
pub fn is_negotiation_needed(
    have_current_descriptions: bool,
    role: Option<NegotiationRole>,
    transceivers: &[Transceiver],
    negotiated: &[NegotiatedDirections],
) -> bool {
    if !have_current_descriptions {
        return true;
    }
    if transceivers.iter().any(|t| !t.stopped && !t.is_associated()) {
        return true;
    }

    let Some(role) = role else {
        return false;
    };

    for (t, neg) in transceivers.iter().zip(negotiated.iter()) {
        if t.stopped || !t.is_associated() {
            continue;
        }
        match role {
            NegotiationRole::Offerer => {
                let matches_local = neg.local == Some(t.direction);
                let matches_remote = neg.remote == Some(t.direction);
                if !matches_local && !matches_remote {
                    return true;
                }
            }
            NegotiationRole::Answerer => {
                if t.current_direction != Some(t.direction) {
                    return true;
                }
            }
        }
    }
    false
}

/// The teacher's `NegotiationNeededState` tri-state latch
/// (`rtc/src/peer_connection/mod.rs::do_negotiation_needed_inner`):
/// a trigger arriving while a check is already `Run`ning is coalesced
/// into `Queue` instead of spawning a concurrent second check, and
/// draining `Queue` after the in-flight check returns re-enters `Run`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NegotiationNeededState {
    #[default]
    Empty,
    Run,
    Queue,
}

impl NegotiationNeededState {
    /// A negotiation-needed trigger fired. Returns true if the caller
    /// should actually run the check now (state was `Empty`).
    pub fn trigger(&mut self) -> bool {
        match self {
            NegotiationNeededState::Run => {
                *self = NegotiationNeededState::Queue;
                false
            }
            NegotiationNeededState::Queue => false,
            NegotiationNeededState::Empty => {
                *self = NegotiationNeededState::Run;
                true
            }
        }
    }

    /// The in-flight check completed. Returns true if another run
    /// should be performed immediately because a trigger queued up
    /// while the first was in flight.
    pub fn finish(&mut self) -> bool {
        let was_queued = *self == NegotiationNeededState::Queue;
        *self = NegotiationNeededState::Empty;
        if was_queued {
            *self = NegotiationNeededState::Run;
        }
        was_queued
    }
}
