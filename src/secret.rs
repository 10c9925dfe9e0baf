use base64::{URL_SAFE_NO_PAD, encode_config};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

/// Random 256-bit trigger secret, URL-safe base64 without padding.
pub fn generate_trigger_secret() -> String {
    let mut rng = OsRng;
    generate_trigger_secret_with_rng(&mut rng)
}

pub(crate) fn generate_trigger_secret_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> String {
    let mut bytes = [0u8; 32];
    rng.fill_bytes(&mut bytes);
    encode_config(bytes, URL_SAFE_NO_PAD)
}

/// Compares without short-circuiting on the first differing byte.
pub(crate) fn secret_matches(expected: &str, provided: &str) -> bool {
    let (expected, provided) = (expected.as_bytes(), provided.as_bytes());
    if expected.len() != provided.len() {
        return false;
    }
    expected
        .iter()
        .zip(provided)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
