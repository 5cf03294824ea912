//! The independent state machines tracked by a `PeerConnection`.
//!
//! - [`SignalingState`] — SDP offer/answer negotiation progress.
//! - [`IceConnectionState`] / [`IceGatheringState`] — aggregated ICE
//!   substates, folded across transports by `StateCollator`.
//! - [`PeerConnectionState`] — the overall connection state.
//! - [`IceState`] / [`DtlsState`] — the per-transport substates the
//!   external ICE/DTLS collaborators report, which `StateCollator`
//!   folds into the three aggregates above.

mod ice_connection_state;
mod ice_gathering_state;
mod peer_connection_state;
mod signaling_state;

pub use ice_connection_state::{IceConnectionState, IceState};
pub use ice_gathering_state::IceGatheringState;
pub use peer_connection_state::{DtlsState, PeerConnectionState};
pub use signaling_state::{check_next_signaling_state, SignalingState, StateChangeOp};
