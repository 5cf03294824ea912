//! Builds local offers and answers from the current transceiver set
//! (spec §4.2). `create_answer` is read-only with respect to the
//! transceiver/transport model: every association it needs already
//! exists because `set_remote_description` (via
//! `description_applier::apply`) bound a transceiver to every active
//! remote section before an answer can be requested.

use crate::error::{Error, Result};
use crate::peer_connection::Inner;
use crate::sdp::{Codec, Direction, MediaSection, SdpType, Setup, SessionDescription};
use crate::transceiver::MediaKind;

fn default_codecs(kind: MediaKind) -> Vec<Codec> {
    match kind {
        MediaKind::Audio => vec![Codec::new(111, "opus", 48000).with_default_rtcp_fb()],
        MediaKind::Video => vec![Codec::new(96, "VP8", 90000).with_default_rtcp_fb()],
    }
}

fn codecs_for(inner: &Inner, idx: usize) -> Vec<Codec> {
    if inner.transceivers[idx].codec_preferences.is_empty() {
        default_codecs(inner.transceivers[idx].kind)
    } else {
        inner.transceivers[idx].codec_preferences.clone()
    }
}

/// Builds (and, if necessary, creates) the m-section for a locally
/// declared transceiver, assigning its `mid`/`mline` the first time it
/// is offered (spec §4.2, association stability P1).
fn build_offer_section(inner: &mut Inner, idx: usize, mline: usize) -> MediaSection {
    if inner.transceivers[idx].mid.is_none() {
        let mid = inner.generate_mid();
        inner.transceivers[idx].mid = Some(mid.clone());
        inner.mid_index.insert(mid, idx);
    }
    inner.transceivers[idx].mline = Some(mline);

    let transport_id = inner.ensure_transport(idx);
    let transport = inner.transport(transport_id);
    let codecs = codecs_for(inner, idx);
    let transceiver = &inner.transceivers[idx];

    MediaSection {
        media: transceiver.kind.as_str().to_string(),
        port: 9,
        mid: transceiver.mid.clone(),
        direction: transceiver.direction,
        setup: Some(Setup::Actpass),
        ice_ufrag: Some(transport.local_ufrag.clone()),
        ice_pwd: Some(transport.local_pwd.clone()),
        fingerprint: Some(transport.certificate.fingerprint_sha256()),
        rtcp_mux: transport.rtcp_mux,
        codecs,
    }
}

/// Builds an offer from every non-stopped transceiver, in the order
/// they were added (spec §4.2, S1-S3).
pub fn create_offer(inner: &mut Inner) -> Result<SessionDescription> {
    let mut desc = SessionDescription::new(SdpType::Offer);
    desc.session_fingerprint = Some(inner.setting_engine.certificate.fingerprint_sha256());

    for idx in 0..inner.transceivers.len() {
        if inner.transceivers[idx].stopped {
            continue;
        }
        let mline = desc.media_sections.len();
        desc.media_sections.push(build_offer_section(inner, idx, mline));
    }

    Ok(desc)
}

fn reject_section(remote_section: &MediaSection) -> MediaSection {
    MediaSection {
        media: remote_section.media.clone(),
        port: 0,
        mid: remote_section.mid.clone(),
        direction: Direction::Inactive,
        setup: None,
        ice_ufrag: None,
        ice_pwd: None,
        fingerprint: None,
        rtcp_mux: false,
        codecs: Vec::new(),
    }
}

/// Builds an answer to the current pending (or, for a re-ask, current)
/// remote offer, one section per remote section in the same order
/// (spec §4.2, S4-S5). A remote section whose codecs don't intersect
/// this side's supported set is rejected, even though the transceiver
/// `set_remote_description` bound for it remains associated.
pub fn create_answer(inner: &mut Inner) -> Result<SessionDescription> {
    let remote = inner
        .pending_remote
        .clone()
        .or_else(|| inner.current_remote.clone())
        .ok_or(Error::ErrInvalidState {
            from: inner.signaling_state,
            sdp_type: "answer",
        })?;

    let mut desc = SessionDescription::new(SdpType::Answer);
    desc.session_fingerprint = Some(inner.setting_engine.certificate.fingerprint_sha256());

    for (mline, remote_section) in remote.media_sections.iter().enumerate() {
        if remote_section.is_rejected() {
            desc.media_sections.push(reject_section(remote_section));
            continue;
        }

        let mid = remote_section
            .mid
            .as_ref()
            .ok_or(Error::ErrSdpMissingAttribute { mline, attribute: "mid" })?;
        let idx = *inner
            .mid_index
            .get(mid)
            .ok_or(Error::ErrSdpMissingAttribute { mline, attribute: "mid" })?;

        let local_codecs = codecs_for(inner, idx);
        let intersected: Vec<Codec> = local_codecs
            .into_iter()
            .filter(|codec| {
                remote_section
                    .codecs
                    .iter()
                    .any(|remote_codec| remote_codec.encoding_name.eq_ignore_ascii_case(&codec.encoding_name))
            })
            .collect();

        if intersected.is_empty() {
            desc.media_sections.push(reject_section(remote_section));
            continue;
        }

        let setup = Setup::answer_for(remote_section.setup)?;
        let direction = Direction::intersect(remote_section.direction, inner.transceivers[idx].direction)?;
        let transport_id = inner.transceivers[idx]
            .transport
            .ok_or_else(|| Error::ErrFailed("transceiver has no transport".to_string()))?;
        let transport = inner.transport(transport_id);

        desc.media_sections.push(MediaSection {
            media: inner.transceivers[idx].kind.as_str().to_string(),
            port: 9,
            mid: Some(mid.clone()),
            direction,
            setup: Some(setup),
            ice_ufrag: Some(transport.local_ufrag.clone()),
            ice_pwd: Some(transport.local_pwd.clone()),
            fingerprint: Some(transport.certificate.fingerprint_sha256()),
            rtcp_mux: transport.rtcp_mux,
            codecs: intersected,
        });
    }

    Ok(desc)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::configuration::RTCConfiguration;
    use crate::description_applier;
    use crate::peer_connection::Event;
    use crate::sdp::SdpType;
    use crate::state::StateChangeOp;
    use crate::transceiver::Transceiver;

    fn new_inner() -> Inner {
        let engine = RTCConfiguration::default().into_setting_engine().unwrap();
        Inner::new(engine)
    }

    #[test]
    fn test_create_offer_empty_has_no_sections() {
        let mut inner = new_inner();
        let offer = create_offer(&mut inner).unwrap();
        assert!(offer.media_sections.is_empty());
    }

    #[test]
    fn test_create_offer_skips_stopped_transceivers() {
        let mut inner = new_inner();
        inner.transceivers.push(Transceiver::new(Direction::Sendrecv, Vec::new()));
        inner.negotiated.push(Default::default());
        inner.transceivers[0].stopped = true;
        let offer = create_offer(&mut inner).unwrap();
        assert!(offer.media_sections.is_empty());
    }

    #[test]
    fn test_create_answer_rejects_section_with_no_codec_match() {
        let mut inner = new_inner();
        let mut remote_offer = SessionDescription::new(SdpType::Offer);
        remote_offer.session_fingerprint = Some("AA:BB".to_string());
        remote_offer.media_sections.push(MediaSection {
            media: "video".to_string(),
            port: 9,
            mid: Some("0".to_string()),
            direction: Direction::Sendrecv,
            setup: Some(Setup::Actpass),
            ice_ufrag: Some("ufragufragufragufrag".to_string()),
            ice_pwd: Some("passwordpasswordpasswordpass12".to_string()),
            fingerprint: Some("AA:BB".to_string()),
            rtcp_mux: true,
            codecs: vec![Codec::new(120, "H266-NOT-SUPPORTED", 90000)],
        });

        let mut events = Vec::<Event>::new();
        description_applier::apply(&mut inner, StateChangeOp::SetRemote, remote_offer, &mut events).unwrap();

        let answer = create_answer(&mut inner).unwrap();
        assert_eq!(answer.media_sections.len(), 1);
        assert!(answer.media_sections[0].is_rejected());
    }

    #[test]
    fn test_create_answer_matches_offered_codec() {
        let mut inner = new_inner();
        let mut remote_offer = SessionDescription::new(SdpType::Offer);
        remote_offer.session_fingerprint = Some("AA:BB".to_string());
        remote_offer.media_sections.push(MediaSection {
            media: "audio".to_string(),
            port: 9,
            mid: Some("0".to_string()),
            direction: Direction::Sendrecv,
            setup: Some(Setup::Actpass),
            ice_ufrag: Some("ufragufragufragufrag".to_string()),
            ice_pwd: Some("passwordpasswordpasswordpass12".to_string()),
            fingerprint: Some("AA:BB".to_string()),
            rtcp_mux: true,
            codecs: vec![Codec::new(111, "opus", 48000)],
        });

        let mut events = Vec::<Event>::new();
        description_applier::apply(&mut inner, StateChangeOp::SetRemote, remote_offer, &mut events).unwrap();

        let answer = create_answer(&mut inner).unwrap();
        assert_eq!(answer.media_sections.len(), 1);
        assert!(!answer.media_sections[0].is_rejected());
        assert_eq!(answer.media_sections[0].setup, Some(Setup::Active));
        assert_eq!(answer.media_sections[0].direction, Direction::Sendrecv);
    }
}
