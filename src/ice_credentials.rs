use rand::Rng;

/// Alphabet for generated ICE credentials: `A-Z a-z 0-9 + /` (spec §6).
const ICE_CREDENTIAL_CHARS: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

const ICE_UFRAG_LEN: usize = 32;
const ICE_PWD_LEN: usize = 32;

fn random_alpha(n: usize) -> String {
    let mut rng = rand::rng();
    (0..n)
        .map(|_| {
            let idx = rng.random_range(0..ICE_CREDENTIAL_CHARS.len());
            ICE_CREDENTIAL_CHARS[idx] as char
        })
        .collect()
}

/// A freshly generated `(ice-ufrag, ice-pwd)` pair, assigned once per
/// Transport by DescriptionBuilder (spec §4.2, §6).
pub fn generate_ice_credentials() -> (String, String) {
    (random_alpha(ICE_UFRAG_LEN), random_alpha(ICE_PWD_LEN))
}
