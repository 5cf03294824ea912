use std::fmt;

use super::direction::{Direction, Setup};

/// The SDP offer/answer type, per RFC 3264.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl SdpType {
    pub fn as_str(self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Pranswer => "pranswer",
            SdpType::Answer => "answer",
            SdpType::Rollback => "rollback",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One RTP payload-type entry within a media section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Codec {
    pub payload_type: u8,
    pub encoding_name: String,
    pub clock_rate: u32,
    /// `rtcp-fb` feedback lines carried by this payload, e.g. `"nack"`,
    /// `"nack pli"`. `create-offer`/`create-answer` add `"nack"` and
    /// `"nack pli"` when absent (spec §4.2).
    pub rtcp_fb: Vec<String>,
}

impl Codec {
    pub fn new(payload_type: u8, encoding_name: impl Into<String>, clock_rate: u32) -> Self {
        Codec {
            payload_type,
            encoding_name: encoding_name.into(),
            clock_rate,
            rtcp_fb: Vec::new(),
        }
    }

    pub fn with_default_rtcp_fb(mut self) -> Self {
        if !self.rtcp_fb.iter().any(|fb| fb == "nack") {
            self.rtcp_fb.push("nack".to_string());
        }
        if !self.rtcp_fb.iter().any(|fb| fb == "nack pli") {
            self.rtcp_fb.push("nack pli".to_string());
        }
        self
    }
}

/// One `m=` media section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSection {
    pub media: String,
    /// Port 9 for an active section, 0 for a rejected one (spec S5).
    pub port: u16,
    pub mid: Option<String>,
    pub direction: Direction,
    pub setup: Option<Setup>,
    pub ice_ufrag: Option<String>,
    pub ice_pwd: Option<String>,
    pub fingerprint: Option<String>,
    pub rtcp_mux: bool,
    pub codecs: Vec<Codec>,
}

impl MediaSection {
    pub fn is_rejected(&self) -> bool {
        self.port == 0
    }
}

/// A structured session description: the parsed form DescriptionBuilder
/// produces and DescriptionApplier validates. See §1/§6.2: this crate
/// never parses raw SDP text, only this structured type; `Display`
/// below is a one-way, non-authoritative text rendering for logging,
/// tests, and interop with an external SDP parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub ice_options_trickle: bool,
    /// Session-level `a=fingerprint`, if present (distinct from any
    /// per-media fingerprint; both must agree when both are present).
    pub session_fingerprint: Option<String>,
    /// Session-level `k=` presence; always rejected by DescriptionApplier
    /// when true.
    pub has_session_key_line: bool,
    pub media_sections: Vec<MediaSection>,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType) -> Self {
        SessionDescription {
            sdp_type,
            ice_options_trickle: true,
            session_fingerprint: None,
            has_session_key_line: false,
            media_sections: Vec::new(),
        }
    }
}

impl fmt::Display for SessionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "v=0")?;
        writeln!(f, "o=- 0 0 IN IP4 0.0.0.0")?;
        writeln!(f, "s=-")?;
        writeln!(f, "t=0 0")?;
        if self.ice_options_trickle {
            writeln!(f, "a=ice-options:trickle")?;
        }
        if let Some(fp) = &self.session_fingerprint {
            writeln!(f, "a=fingerprint:{fp}")?;
        }
        for section in &self.media_sections {
            let pts = if section.codecs.is_empty() {
                String::new()
            } else {
                section
                    .codecs
                    .iter()
                    .map(|c| c.payload_type.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            writeln!(
                f,
                "m={} {} UDP/TLS/RTP/SAVPF {}",
                section.media, section.port, pts
            )?;
            writeln!(f, "c=IN IP4 0.0.0.0")?;
            if let Some(mid) = &section.mid {
                writeln!(f, "a=mid:{mid}")?;
            }
            if let Some(ufrag) = &section.ice_ufrag {
                writeln!(f, "a=ice-ufrag:{ufrag}")?;
            }
            if let Some(pwd) = &section.ice_pwd {
                writeln!(f, "a=ice-pwd:{pwd}")?;
            }
            if let Some(setup) = section.setup {
                writeln!(f, "a=setup:{setup}")?;
            }
            if let Some(fp) = &section.fingerprint {
                writeln!(f, "a=fingerprint:{fp}")?;
            }
            writeln!(f, "a={}", section.direction)?;
            if section.rtcp_mux {
                writeln!(f, "a=rtcp-mux")?;
            }
            for codec in &section.codecs {
                writeln!(
                    f,
                    "a=rtpmap:{} {}/{}",
                    codec.payload_type, codec.encoding_name, codec.clock_rate
                )?;
                for fb in &codec.rtcp_fb {
                    writeln!(f, "a=rtcp-fb:{} {}", codec.payload_type, fb)?;
                }
            }
        }
        Ok(())
    }
}
