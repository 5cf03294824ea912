//! Aggregates per-transport ICE/DTLS substates into the three
//! user-visible state properties (spec §4.5).

use crate::state::{DtlsState, IceConnectionState, IceGatheringState, IceState, PeerConnectionState};

/// One transceiver's transport substate pair, as read from its
/// `Transport` by the caller. `StateCollator` itself holds no
/// transport references; it only folds the pairs handed to it, which
/// keeps it free of the reference-cycle concern noted in spec §9.
#[derive(Debug, Copy, Clone)]
pub struct TransportSubstate {
    pub ice: IceState,
    pub dtls: DtlsState,
    /// The transport's own gatherer substate (spec §4.5), a distinct
    /// axis from `ice`: sticky, and never regresses once `Complete`.
    pub gathering: IceGatheringState,
}

fn ice_gathering_state(substates: &[TransportSubstate]) -> IceGatheringState {
    if substates.is_empty() {
        return IceGatheringState::New;
    }
    if substates.iter().all(|s| s.gathering == IceGatheringState::Complete) {
        IceGatheringState::Complete
    } else if substates.iter().any(|s| s.gathering == IceGatheringState::Gathering) {
        IceGatheringState::Gathering
    } else {
        IceGatheringState::New
    }
}

fn ice_connection_state(is_closed: bool, substates: &[TransportSubstate]) -> IceConnectionState {
    if is_closed {
        return IceConnectionState::Closed;
    }
    if substates.iter().any(|s| s.ice == IceState::Failed) {
        return IceConnectionState::Failed;
    }
    if substates.iter().any(|s| s.ice == IceState::Disconnected) {
        return IceConnectionState::Disconnected;
    }
    if substates.iter().any(|s| s.ice == IceState::Checking) {
        return IceConnectionState::Checking;
    }
    if substates.iter().any(|s| s.ice == IceState::New) || substates.iter().all(|s| s.ice == IceState::Closed) {
        return IceConnectionState::New;
    }
    let all_connected_family = substates
        .iter()
        .all(|s| matches!(s.ice, IceState::Connected | IceState::Completed | IceState::Closed));
    let any_connected = substates.iter().any(|s| s.ice == IceState::Connected);
    if all_connected_family && any_connected {
        return IceConnectionState::Connected;
    }
    let all_completed_family = substates
        .iter()
        .all(|s| matches!(s.ice, IceState::Completed | IceState::Closed));
    let any_completed = substates.iter().any(|s| s.ice == IceState::Completed);
    if all_completed_family && any_completed {
        return IceConnectionState::Connected;
    }
    IceConnectionState::New
}

fn peer_connection_state(is_closed: bool, substates: &[TransportSubstate]) -> PeerConnectionState {
    if is_closed {
        return PeerConnectionState::Closed;
    }
    if substates
        .iter()
        .any(|s| s.ice == IceState::Failed || s.dtls == DtlsState::Failed)
    {
        return PeerConnectionState::Failed;
    }
    if substates
        .iter()
        .any(|s| s.ice == IceState::Checking || s.dtls == DtlsState::Connecting)
    {
        return PeerConnectionState::Connecting;
    }
    if substates.iter().any(|s| s.ice == IceState::Disconnected) {
        return PeerConnectionState::Disconnected;
    }
    let ice_ok = substates
        .iter()
        .all(|s| matches!(s.ice, IceState::Connected | IceState::Completed | IceState::Closed));
    let dtls_ok = substates
        .iter()
        .all(|s| matches!(s.dtls, DtlsState::Connected | DtlsState::Closed));
    let any_connected = substates.iter().any(|s| s.ice == IceState::Connected || s.dtls == DtlsState::Connected);
    if ice_ok && dtls_ok && any_connected {
        return PeerConnectionState::Connected;
    }
    PeerConnectionState::New
}

/// The three collated state values, computed together from the same
/// substate snapshot (spec §4.5). Each value change is notified once
/// by the caller, outside any held lock.
#[derive(Debug, Copy, Clone)]
pub struct CollatedStates {
    pub ice_gathering: IceGatheringState,
    pub ice_connection: IceConnectionState,
    pub connection: PeerConnectionState,
}

pub fn collate(is_closed: bool, substates: &[TransportSubstate]) -> CollatedStates {
    CollatedStates {
        ice_gathering: ice_gathering_state(substates),
        ice_connection: ice_connection_state(is_closed, substates),
        connection: peer_connection_state(is_closed, substates),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn substate(ice: IceState, dtls: DtlsState, gathering: IceGatheringState) -> TransportSubstate {
        TransportSubstate { ice, dtls, gathering }
    }

    #[test]
    fn test_closed_peer_connection_wins_priority() {
        let substates = vec![substate(IceState::Connected, DtlsState::Connected, IceGatheringState::Complete)];
        let collated = collate(true, &substates);
        assert_eq!(collated.ice_connection, IceConnectionState::Closed);
        assert_eq!(collated.connection, PeerConnectionState::Closed);
    }

    #[test]
    fn test_any_failed_ice_wins_over_connected() {
        let substates = vec![
            substate(IceState::Connected, DtlsState::Connected, IceGatheringState::Complete),
            substate(IceState::Failed, DtlsState::New, IceGatheringState::Complete),
        ];
        let collated = collate(false, &substates);
        assert_eq!(collated.ice_connection, IceConnectionState::Failed);
        assert_eq!(collated.connection, PeerConnectionState::Failed);
    }

    #[test]
    fn test_all_gathering_complete() {
        let substates = vec![
            substate(IceState::Completed, DtlsState::Connected, IceGatheringState::Complete),
            substate(IceState::Connected, DtlsState::Connected, IceGatheringState::Complete),
        ];
        assert_eq!(ice_gathering_state(&substates), IceGatheringState::Complete);
    }

    #[test]
    fn test_any_checking_means_gathering_and_checking() {
        let substates = vec![
            substate(IceState::New, DtlsState::New, IceGatheringState::New),
            substate(IceState::Checking, DtlsState::New, IceGatheringState::Gathering),
        ];
        let collated = collate(false, &substates);
        assert_eq!(collated.ice_gathering, IceGatheringState::Gathering);
        assert_eq!(collated.ice_connection, IceConnectionState::Checking);
        assert_eq!(collated.connection, PeerConnectionState::Connecting);
    }

    #[test]
    fn test_all_connected_or_closed_with_one_connected_yields_connected() {
        let substates = vec![
            substate(IceState::Connected, DtlsState::Connected, IceGatheringState::Complete),
            substate(IceState::Closed, DtlsState::Closed, IceGatheringState::Complete),
        ];
        let collated = collate(false, &substates);
        assert_eq!(collated.ice_connection, IceConnectionState::Connected);
        assert_eq!(collated.connection, PeerConnectionState::Connected);
    }

    #[test]
    fn test_gathering_complete_does_not_regress_when_connection_disconnects() {
        // A transport that finished gathering and then sees a
        // transient connection blip keeps a sticky `Complete` gathering
        // state; it must not fall back to `New`.
        let substates = vec![substate(IceState::Disconnected, DtlsState::Connected, IceGatheringState::Complete)];
        let collated = collate(false, &substates);
        assert_eq!(collated.ice_gathering, IceGatheringState::Complete);
        assert_eq!(collated.ice_connection, IceConnectionState::Disconnected);
    }

    #[test]
    fn test_empty_substates_is_new() {
        let collated = collate(false, &[]);
        assert_eq!(collated.ice_gathering, IceGatheringState::New);
        assert_eq!(collated.ice_connection, IceConnectionState::New);
        assert_eq!(collated.connection, PeerConnectionState::New);
    }
}
