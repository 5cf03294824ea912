use sha2::{Digest, Sha256};

/// A self-signed certificate generated for DTLS fingerprinting (spec
/// §6.1). Generation is the only part of "the DTLS transport
/// implementation" this crate performs itself: the core needs a stable
/// fingerprint to embed in offers/answers before any DTLS handshake
/// exists, and `rcgen` is the crate the teacher (`rtc`) uses for the
/// same purpose in `RTCPeerConnection::new`.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("fingerprint", &self.fingerprint_sha256())
            .finish()
    }
}

impl Certificate {
    /// Generates a new self-signed ECDSA P-256 certificate.
    pub fn generate() -> Result<Self, rcgen::Error> {
        let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
        let params = rcgen::CertificateParams::new(Vec::new())?;
        let cert = params.self_signed(&key_pair)?;
        Ok(Certificate {
            der: cert.der().to_vec(),
        })
    }

    /// The SHA-256 fingerprint of the certificate, formatted as pairs of
    /// uppercase hexadecimal bytes separated by `:` (spec §6), e.g.
    /// `"AB:CD:EF:...".`
    pub fn fingerprint_sha256(&self) -> String {
        let digest = Sha256::digest(&self.der);
        format_fingerprint(&digest)
    }
}

fn format_fingerprint(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
