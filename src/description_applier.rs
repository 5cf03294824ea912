//! Validates and applies an incoming `SessionDescription` against an
//! `Inner`'s state (spec §4.1/§4.3).

use crate::error::{Error, Result};
use crate::negotiation::NegotiationRole;
use crate::peer_connection::{run_negotiation_check, Event, Inner};
use crate::sdp::{Direction, MediaSection, SdpType, Setup, SessionDescription};
use crate::state::{check_next_signaling_state, SignalingState, StateChangeOp};
use crate::transceiver::MediaKind;
use crate::transport::DtlsRole;

/// Structural checks that must hold before a description can be
/// applied at all, independent of the current signaling state (spec
/// §4.1 "Validation", §4.3).
pub fn validate(desc: &SessionDescription) -> Result<()> {
    if desc.has_session_key_line {
        return Err(Error::ErrSdpKeyLinePresent);
    }
    for (mline, section) in desc.media_sections.iter().enumerate() {
        if section.is_rejected() {
            continue;
        }
        if section.mid.is_none() {
            return Err(Error::ErrSdpMissingAttribute { mline, attribute: "mid" });
        }
        if section.ice_ufrag.is_none() {
            return Err(Error::ErrSdpMissingAttribute { mline, attribute: "ice-ufrag" });
        }
        if section.ice_pwd.is_none() {
            return Err(Error::ErrSdpMissingAttribute { mline, attribute: "ice-pwd" });
        }
        let setup = section
            .setup
            .ok_or(Error::ErrSdpMissingAttribute { mline, attribute: "setup" })?;
        if desc.sdp_type == SdpType::Answer && setup == Setup::Actpass {
            return Err(Error::ErrBadSdpActpassActpass);
        }
        if section.codecs.is_empty() {
            return Err(Error::ErrSdpUnparseablePayloads { mline });
        }
        match (&desc.session_fingerprint, &section.fingerprint) {
            (None, None) => return Err(Error::ErrFingerprintMissing),
            (Some(session_fp), Some(media_fp)) if session_fp != media_fp => {
                return Err(Error::ErrFingerprintConflict {
                    mline,
                    session_fp: session_fp.clone(),
                    media_fp: media_fp.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// The DTLS role a concrete (non-`actpass`) `setup` value assigns to
/// whichever side wrote it (spec §4.3): `active` means that side dials
/// out as the DTLS client, `passive` means it waits as the server.
/// `actpass` is the offer's declarative placeholder and resolves to
/// nothing until the answer supplies a concrete value.
fn resolved_role(op: StateChangeOp, setup: Option<Setup>) -> Option<DtlsRole> {
    match setup {
        Some(Setup::Active) => Some(match op {
            StateChangeOp::SetLocal => DtlsRole::Client,
            StateChangeOp::SetRemote => DtlsRole::Server,
        }),
        Some(Setup::Passive) => Some(match op {
            StateChangeOp::SetLocal => DtlsRole::Server,
            StateChangeOp::SetRemote => DtlsRole::Client,
        }),
        Some(Setup::Actpass) | None => None,
    }
}

/// Finds the transceiver already bound to this section's `mid`, or
/// binds a fresh one for it (spec §3: "an unmatched remote `m=`
/// section causes a new transceiver to be created"). Enforces the
/// association-stability invariant (P1): a transceiver's `mline` never
/// changes once assigned.
fn match_or_create_transceiver(
    inner: &mut Inner,
    op: StateChangeOp,
    mline: usize,
    section: &MediaSection,
) -> Result<usize> {
    let mid = section.mid.as_ref().expect("validate() ensures active sections carry a mid");

    if let Some(&idx) = inner.mid_index.get(mid) {
        if let Some(existing_mline) = inner.transceivers[idx].mline {
            if existing_mline != mline {
                return Err(Error::ErrInvalidModification { field: "mline" });
            }
        } else {
            inner.transceivers[idx].mline = Some(mline);
        }
        return Ok(idx);
    }

    let kind = if section.media == "video" { MediaKind::Video } else { MediaKind::Audio };

    // No mid match: fall back to an embedder-declared transceiver that
    // hasn't been bound to any mid yet, matched by kind and position
    // (spec §4.2: "identify a matching local transceiver by mid ...
    // otherwise by m-line index").
    if let Some(idx) = inner
        .transceivers
        .iter()
        .position(|t| t.mid.is_none() && t.kind == kind)
    {
        inner.transceivers[idx].mid = Some(mid.clone());
        inner.transceivers[idx].mline = Some(mline);
        inner.mid_index.insert(mid.clone(), idx);
        return Ok(idx);
    }

    // A transceiver auto-created from a remote offer reciprocates by
    // default: offering sendonly auto-accepts as recvonly.
    let declared_direction = match op {
        StateChangeOp::SetRemote => section.direction.mirror(),
        StateChangeOp::SetLocal => section.direction,
    };
    let mut transceiver = crate::transceiver::Transceiver::new_with_kind(kind, declared_direction, Vec::new());
    transceiver.mid = Some(mid.clone());
    transceiver.mline = Some(mline);
    inner.transceivers.push(transceiver);
    inner.negotiated.push(Default::default());
    let idx = inner.transceivers.len() - 1;
    inner.mid_index.insert(mid.clone(), idx);
    Ok(idx)
}

/// Applies `desc` to `inner`'s local or remote slot (per `op`),
/// advancing the signaling state machine and every per-transceiver
/// association it implies (spec §4.1, §4.3). Emitted events are
/// appended to `events`, to be dispatched once the caller has released
/// the state lock.
pub fn apply(
    inner: &mut Inner,
    op: StateChangeOp,
    desc: SessionDescription,
    events: &mut Vec<Event>,
) -> Result<()> {
    if inner.is_closed {
        return Err(Error::ErrCancelled);
    }

    validate(&desc)?;

    // P6: re-applying the current description while already stable is
    // a no-op (see DESIGN.md Open Question 1).
    if desc.sdp_type != SdpType::Rollback && inner.signaling_state == SignalingState::Stable {
        let unchanged = match op {
            StateChangeOp::SetLocal => inner.current_local.as_ref() == Some(&desc),
            StateChangeOp::SetRemote => inner.current_remote.as_ref() == Some(&desc),
        };
        if unchanged {
            return Ok(());
        }
    }

    let next_state = check_next_signaling_state(inner.signaling_state, op, desc.sdp_type)?;

    if desc.sdp_type == SdpType::Rollback {
        match op {
            StateChangeOp::SetLocal => inner.pending_local = None,
            StateChangeOp::SetRemote => inner.pending_remote = None,
        }
        inner.signaling_state = next_state;
        run_negotiation_check(inner, events);
        return Ok(());
    }

    if inner.signaling_state == SignalingState::Stable && desc.sdp_type == SdpType::Offer {
        match op {
            StateChangeOp::SetLocal => {
                inner.role = Some(NegotiationRole::Offerer);
                inner.ice_controlling.get_or_insert(true);
            }
            StateChangeOp::SetRemote => {
                inner.role = Some(NegotiationRole::Answerer);
                inner.ice_controlling.get_or_insert(false);
            }
        }
    }

    let is_answer_like = matches!(desc.sdp_type, SdpType::Answer | SdpType::Pranswer);

    for (mline, section) in desc.media_sections.iter().enumerate() {
        if section.is_rejected() {
            if let Some(mid) = &section.mid {
                if let Some(&idx) = inner.mid_index.get(mid) {
                    inner.transceivers[idx].current_direction = Some(Direction::Inactive);
                }
            }
            continue;
        }

        let idx = match_or_create_transceiver(inner, op, mline, section)?;

        match op {
            StateChangeOp::SetLocal => inner.negotiated[idx].local = Some(section.direction),
            StateChangeOp::SetRemote => inner.negotiated[idx].remote = Some(section.direction),
        }

        let transport_id = inner.ensure_transport(idx);

        if let Some(role) = resolved_role(op, section.setup) {
            inner.transport_mut(transport_id).dtls.set_role(role);
        }
        inner.transport_mut(transport_id).rtcp_mux &= section.rtcp_mux;

        match op {
            StateChangeOp::SetLocal => {
                inner.transport_mut(transport_id).ice.gather();
            }
            StateChangeOp::SetRemote => {
                if let (Some(ufrag), Some(pwd)) = (&section.ice_ufrag, &section.ice_pwd) {
                    inner
                        .transport_mut(transport_id)
                        .ice
                        .set_remote_credentials(ufrag, pwd);
                }
            }
        }

        if is_answer_like {
            let negotiated = inner.negotiated[idx];
            if let (Some(local_dir), Some(remote_dir)) = (negotiated.local, negotiated.remote) {
                let current = match inner.role {
                    Some(NegotiationRole::Answerer) => Direction::intersect(remote_dir, local_dir)?,
                    _ => Direction::intersect(local_dir, remote_dir)?,
                };
                inner.transceivers[idx].current_direction = Some(current);
            }
        }
    }

    match (next_state, op) {
        (SignalingState::Stable, StateChangeOp::SetLocal) => {
            inner.current_local = Some(desc);
            inner.pending_local = None;
            if let Some(promoted) = inner.pending_remote.take() {
                inner.current_remote = Some(promoted);
            }
        }
        (SignalingState::Stable, StateChangeOp::SetRemote) => {
            inner.current_remote = Some(desc);
            inner.pending_remote = None;
            if let Some(promoted) = inner.pending_local.take() {
                inner.current_local = Some(promoted);
            }
        }
        (_, StateChangeOp::SetLocal) => inner.pending_local = Some(desc),
        (_, StateChangeOp::SetRemote) => inner.pending_remote = Some(desc),
    }

    inner.signaling_state = next_state;
    log::debug!("signaling state now {next_state}");

    if next_state == SignalingState::Stable {
        flush_pending_ice_candidates(inner);
    }

    run_negotiation_check(inner, events);

    Ok(())
}

/// Flushes every buffered candidate whose transceiver's transport now
/// has remote credentials, in enqueue order (spec §4.6, P5). Only
/// called once both `current_local` and `current_remote` exist, which
/// is exactly when the signaling state has reached `stable`.
fn flush_pending_ice_candidates(inner: &mut Inner) {
    debug_assert!(inner.current_local.is_some() && inner.current_remote.is_some());
    let pending = std::mem::take(&mut inner.pending_ice_candidates);
    for (mline, line) in pending {
        let transport_id = inner
            .transceivers
            .iter()
            .find(|t| t.mline == Some(mline))
            .and_then(|t| t.transport);
        match transport_id {
            Some(id) if inner.transport(id).ice.has_remote_credentials() => {
                inner.transport_mut(id).ice.add_remote_candidate(&line);
            }
            _ => inner.pending_ice_candidates.push((mline, line)),
        }
    }
}

/// Normalizes and forwards (or buffers) a trickled remote ICE
/// candidate (spec §4.6, P5). Only forwarded immediately once both
/// current descriptions exist and the owning transport has remote
/// credentials; otherwise buffered. An `mline` with no bound
/// transceiver at all is logged and dropped rather than buffered
/// forever (spec §7.2); one bound to a transceiver whose negotiated
/// direction is `inactive` is logged but still buffered, since it may
/// yet become active on a future renegotiation.
pub fn add_ice_candidate(inner: &mut Inner, mline: usize, candidate_line: String) {
    let transceiver = inner.transceivers.iter().find(|t| t.mline == Some(mline));
    let Some(transceiver) = transceiver else {
        log::warn!("dropping ice candidate for mline {mline}: no transceiver is bound to it");
        return;
    };

    if transceiver.current_direction == Some(Direction::Inactive) {
        log::warn!("buffering ice candidate for mline {mline}: transceiver is inactive");
    }

    if inner.current_local.is_some() && inner.current_remote.is_some() {
        if let Some(id) = transceiver.transport {
            if inner.transport(id).ice.has_remote_credentials() {
                inner.transport_mut(id).ice.add_remote_candidate(&candidate_line);
                return;
            }
        }
    }
    inner.pending_ice_candidates.push((mline, candidate_line));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::configuration::RTCConfiguration;
    use crate::sdp::Codec;

    fn offer_section(mid: &str, codecs: Vec<Codec>) -> MediaSection {
        MediaSection {
            media: "audio".to_string(),
            port: 9,
            mid: Some(mid.to_string()),
            direction: Direction::Sendrecv,
            setup: Some(Setup::Actpass),
            ice_ufrag: Some("ufrag".to_string()),
            ice_pwd: Some("password1234567890123456789012".to_string()),
            fingerprint: Some("AA:BB".to_string()),
            rtcp_mux: true,
            codecs,
        }
    }

    fn opus() -> Codec {
        Codec::new(111, "opus", 48000).with_default_rtcp_fb()
    }

    #[test]
    fn test_validate_rejects_session_key_line() {
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.has_session_key_line = true;
        assert_eq!(validate(&desc), Err(Error::ErrSdpKeyLinePresent));
    }

    #[test]
    fn test_validate_rejects_missing_mandatory_attribute() {
        let mut desc = SessionDescription::new(SdpType::Offer);
        let mut section = offer_section("0", vec![opus()]);
        section.ice_ufrag = None;
        desc.media_sections.push(section);
        assert_eq!(
            validate(&desc),
            Err(Error::ErrSdpMissingAttribute { mline: 0, attribute: "ice-ufrag" })
        );
    }

    #[test]
    fn test_validate_rejects_answer_actpass() {
        let mut desc = SessionDescription::new(SdpType::Answer);
        let mut section = offer_section("0", vec![opus()]);
        section.setup = Some(Setup::Actpass);
        desc.media_sections.push(section);
        assert_eq!(validate(&desc), Err(Error::ErrBadSdpActpassActpass));
    }

    #[test]
    fn test_validate_rejects_fingerprint_conflict() {
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.session_fingerprint = Some("AA:AA".to_string());
        let mut section = offer_section("0", vec![opus()]);
        section.fingerprint = Some("BB:BB".to_string());
        desc.media_sections.push(section);
        match validate(&desc) {
            Err(Error::ErrFingerprintConflict { .. }) => {}
            other => panic!("expected fingerprint conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_allows_rejected_section_with_no_attributes() {
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.media_sections.push(MediaSection {
            media: "video".to_string(),
            port: 0,
            mid: Some("1".to_string()),
            direction: Direction::Inactive,
            setup: None,
            ice_ufrag: None,
            ice_pwd: None,
            fingerprint: None,
            rtcp_mux: false,
            codecs: Vec::new(),
        });
        assert!(validate(&desc).is_ok());
    }

    #[test]
    fn test_apply_rejects_when_closed() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        inner.is_closed = true;
        let mut events = Vec::new();
        let desc = SessionDescription::new(SdpType::Offer);
        assert_eq!(apply(&mut inner, StateChangeOp::SetLocal, desc, &mut events), Err(Error::ErrCancelled));
    }

    #[test]
    fn test_apply_tracks_new_remote_transceiver() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.session_fingerprint = Some("AA:BB".to_string());
        desc.media_sections.push(offer_section("0", vec![opus()]));
        let mut events = Vec::new();
        apply(&mut inner, StateChangeOp::SetRemote, desc, &mut events).unwrap();

        assert_eq!(inner.transceivers.len(), 1);
        assert_eq!(inner.transceivers[0].mline, Some(0));
        assert_eq!(inner.transceivers[0].direction, Direction::Sendrecv);
        assert_eq!(inner.signaling_state, SignalingState::HaveRemoteOffer);
    }

    #[test]
    fn test_apply_rejects_mline_change_for_existing_mid_p1() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        let mut first = SessionDescription::new(SdpType::Offer);
        first.session_fingerprint = Some("AA:BB".to_string());
        first.media_sections.push(offer_section("0", vec![opus()]));
        let mut events = Vec::new();
        apply(&mut inner, StateChangeOp::SetRemote, first, &mut events).unwrap();
        assert_eq!(inner.transceivers[0].mline, Some(0));

        // Same mid reappearing at a different m-line index must be
        // rejected (P1: a transceiver's mline never changes once set).
        let mut second = SessionDescription::new(SdpType::Offer);
        second.session_fingerprint = Some("AA:BB".to_string());
        second.media_sections.push(offer_section("other", vec![opus()]));
        second.media_sections.push(offer_section("0", vec![opus()]));
        let mut events = Vec::new();
        assert_eq!(
            apply(&mut inner, StateChangeOp::SetRemote, second, &mut events),
            Err(Error::ErrInvalidModification { field: "mline" })
        );
    }

    #[test]
    fn test_add_ice_candidate_unknown_mline_is_dropped_not_buffered() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        add_ice_candidate(&mut inner, 7, "candidate:1 1 UDP 1 127.0.0.1 1 typ host".to_string());
        assert!(inner.pending_ice_candidates.is_empty());
    }

    #[test]
    fn test_add_ice_candidate_not_forwarded_before_both_descriptions_current_p5() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.session_fingerprint = Some("AA:BB".to_string());
        desc.media_sections.push(offer_section("0", vec![opus()]));
        let mut events = Vec::new();
        apply(&mut inner, StateChangeOp::SetRemote, desc, &mut events).unwrap();
        assert_eq!(inner.signaling_state, SignalingState::HaveRemoteOffer);

        // The transport already has remote credentials (set during
        // apply), but neither current_local nor current_remote exists
        // yet, so the candidate must stay buffered, not be forwarded.
        add_ice_candidate(&mut inner, 0, "candidate:1 1 UDP 1 127.0.0.1 1 typ host".to_string());
        assert_eq!(inner.pending_ice_candidates.len(), 1);

        let transport_id = inner.transceivers[0].transport.unwrap();
        let transport = inner.transport(transport_id);
        let loopback = transport
            .ice
            .as_any()
            .downcast_ref::<crate::transport::LoopbackIceTransport>()
            .unwrap();
        assert!(loopback.remote_candidates.is_empty());
    }

    #[test]
    fn test_add_ice_candidate_buffers_for_inactive_transceiver() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.media_sections.push(MediaSection {
            media: "audio".to_string(),
            port: 0,
            mid: Some("0".to_string()),
            direction: Direction::Inactive,
            setup: None,
            ice_ufrag: None,
            ice_pwd: None,
            fingerprint: None,
            rtcp_mux: false,
            codecs: Vec::new(),
        });
        // Give the rejected section's mid a bound (but inactive)
        // transceiver to attach the candidate's mline to.
        inner.transceivers.push(crate::transceiver::Transceiver::new(Direction::Inactive, Vec::new()));
        inner.negotiated.push(Default::default());
        inner.transceivers[0].mid = Some("0".to_string());
        inner.transceivers[0].mline = Some(0);
        inner.transceivers[0].current_direction = Some(Direction::Inactive);
        inner.mid_index.insert("0".to_string(), 0);

        add_ice_candidate(&mut inner, 0, "candidate:1 1 UDP 1 127.0.0.1 1 typ host".to_string());
        assert_eq!(inner.pending_ice_candidates.len(), 1);
    }

    #[test]
    fn test_apply_rejected_section_marks_inactive_without_creating_transceiver() {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        let mut inner = Inner::new(engine);
        let mut desc = SessionDescription::new(SdpType::Offer);
        desc.media_sections.push(MediaSection {
            media: "audio".to_string(),
            port: 0,
            mid: Some("0".to_string()),
            direction: Direction::Inactive,
            setup: None,
            ice_ufrag: None,
            ice_pwd: None,
            fingerprint: None,
            rtcp_mux: false,
            codecs: Vec::new(),
        });
        let mut events = Vec::new();
        apply(&mut inner, StateChangeOp::SetRemote, desc, &mut events).unwrap();
        assert!(inner.transceivers.is_empty());
    }
}
