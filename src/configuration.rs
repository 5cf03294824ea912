use crate::error::{Error, Result};
use crate::fingerprint::Certificate;

/// One STUN/TURN server entry, forwarded to the ICE agent unchanged
/// (spec §6): `stun://host:port` or `turn(s)://user:pass@host:port`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

impl IceServer {
    fn validate_url(url: &str) -> Result<()> {
        // STUN/TURN URLs are `scheme:host[:port]` (RFC 7064/7065), not
        // `scheme://host` like a generic URI.
        let scheme_end = url.find(':').ok_or_else(|| Error::ErrFailed(
            format!("ice server url {url:?} has no scheme"),
        ))?;
        match &url[..scheme_end] {
            "stun" | "stuns" | "turn" | "turns" => Ok(()),
            other => Err(Error::ErrFailed(format!(
                "ice server url {url:?} has unsupported scheme {other:?}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.urls.is_empty() {
            return Err(Error::ErrFailed("ice server has no urls".to_string()));
        }
        for url in &self.urls {
            Self::validate_url(url)?;
        }
        Ok(())
    }
}

/// Low-level policy knobs that are not part of the embedder-facing
/// `RTCConfiguration` surface (spec SPEC_FULL.md §2: "internal policy
/// knobs live in a separate settings type"). Presently this is just the
/// DTLS fingerprinting certificate, generated once and held for the
/// PeerConnection's lifetime.
#[derive(Debug)]
pub(crate) struct SettingEngine {
    pub certificate: Certificate,
}

impl SettingEngine {
    fn new(certificate: Option<Certificate>) -> Result<Self> {
        let certificate = match certificate {
            Some(cert) => cert,
            None => Certificate::generate().map_err(|e| Error::ErrFailed(e.to_string()))?,
        };
        Ok(SettingEngine { certificate })
    }
}

/// Embedder-facing configuration for a `PeerConnection` (spec §6,
/// mirrors the teacher's `RTCConfiguration`/`SettingEngine` split). An
/// embedder may supply a pre-generated certificate; otherwise one is
/// generated at construction time.
#[derive(Debug, Default)]
pub struct RTCConfiguration {
    pub ice_servers: Vec<IceServer>,
    pub certificate: Option<Certificate>,
}

impl RTCConfiguration {
    pub fn validate(&self) -> Result<()> {
        for server in &self.ice_servers {
            server.validate()?;
        }
        Ok(())
    }

    pub(crate) fn into_setting_engine(self) -> Result<SettingEngine> {
        self.validate()?;
        SettingEngine::new(self.certificate)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_ice_server_url_schemes() {
        for ok in ["stun:stun.example.com:19302", "turn:turn.example.com:3478", "turns:turn.example.com:5349?transport=tcp"] {
            let server = IceServer {
                urls: vec![ok.to_string()],
                ..Default::default()
            };
            assert!(server.validate().is_ok(), "{ok} should validate");
        }
    }

    #[test]
    fn test_ice_server_rejects_bad_scheme() {
        let server = IceServer {
            urls: vec!["http://example.com".to_string()],
            ..Default::default()
        };
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_ice_server_rejects_empty_urls() {
        let server = IceServer::default();
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_configuration_generates_certificate_when_absent() {
        let config = RTCConfiguration::default();
        let engine = config.into_setting_engine().expect("setting engine");
        assert!(!engine.certificate.fingerprint_sha256().is_empty());
    }
}
