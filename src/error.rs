use thiserror::Error;

use crate::state::SignalingState;

/// The closed error taxonomy for every fallible operation this crate
/// exposes. Grouped into the six categories a `PeerConnection` operation
/// can fail with: invalid state, malformed SDP, fingerprint mismatch,
/// illegal modification, cancellation, and opaque collaborator failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operation is not permitted in the current signaling state.
    #[error("cannot apply {sdp_type} in signaling state {from}")]
    ErrInvalidState {
        from: SignalingState,
        sdp_type: &'static str,
    },

    /// A proposed signaling-state transition has no entry in the
    /// transition table.
    #[error("invalid proposed signaling state transition from {from} via {sdp_type}")]
    ErrSignalingStateProposedTransitionInvalid {
        from: SignalingState,
        sdp_type: &'static str,
    },

    /// Rollback was requested from `stable`, which has no pending
    /// description to discard.
    #[error("can't rollback from stable state")]
    ErrSignalingStateCannotRollback,

    /// A session-level `k=` (key) line is present; rejected unconditionally.
    #[error("session description contains a forbidden k= line")]
    ErrSdpKeyLinePresent,

    /// A media section is missing a mandatory attribute.
    #[error("media section {mline} is missing required attribute {attribute}")]
    ErrSdpMissingAttribute { mline: usize, attribute: &'static str },

    /// A media section's `setup` attribute is not one of actpass/active/passive.
    #[error("media section {mline} has invalid setup value {value:?}")]
    ErrSdpInvalidSetup { mline: usize, value: String },

    /// An answer attempted to answer `actpass` with `actpass`.
    #[error("cannot answer setup:actpass with setup:actpass")]
    ErrBadSdpActpassActpass,

    /// A payload-type list failed to parse.
    #[error("media section {mline} has an unparseable payload type list")]
    ErrSdpUnparseablePayloads { mline: usize },

    /// Session-level and media-level fingerprints are both present but differ.
    #[error("fingerprint mismatch in media section {mline}: session={session_fp} media={media_fp}")]
    ErrFingerprintConflict {
        mline: usize,
        session_fp: String,
        media_fp: String,
    },

    /// No fingerprint line was present anywhere in the description.
    #[error("session description has no fingerprint")]
    ErrFingerprintMissing,

    /// An attempt to change a field the specification declares stable
    /// (e.g. a transceiver's `mid` or `mline` once assigned).
    #[error("{field} cannot be modified once assigned")]
    ErrInvalidModification { field: &'static str },

    /// The PeerConnection was closed before the operation completed.
    #[error("operation cancelled: peer connection is closed")]
    ErrCancelled,

    /// A non-specific failure reported by an external collaborator
    /// (ICE agent, DTLS transport).
    #[error("collaborator failure: {0}")]
    ErrFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
