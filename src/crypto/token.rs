use rand::RngCore;
use rand::rngs::OsRng;
use base64::{Engine as _, engine::general_purpose};

/// The size of a session token in bytes.
const SESSION_TOKEN_SIZE: usize = 32;

/// Generates a new random session token.
///
/// # Returns
///
/// A URL-safe base64-encoded token carrying 256 bits of entropy.
pub fn generate_session_token() -> String {
    let mut token = [0u8; SESSION_TOKEN_SIZE];
    OsRng.fill_bytes(&mut token);

    general_purpose::URL_SAFE_NO_PAD.encode(token)
}

/// Returns `true` when `value` has the shape of a token produced by
/// [`generate_session_token`].
pub fn looks_like_session_token(value: &str) -> bool {
    general_purpose::URL_SAFE_NO_PAD
        .decode(value)
        .map(|bytes| bytes.len() == SESSION_TOKEN_SIZE)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_well_formed() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(looks_like_session_token(&a));
    }

    #[test]
    fn garbage_is_not_a_token() {
        assert!(!looks_like_session_token("not a token"));
        assert!(!looks_like_session_token(""));
        assert!(!looks_like_session_token("c2hvcnQ"));
    }
}
