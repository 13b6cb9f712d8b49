//! PKCE (RFC 7636) verifier generation and S256 challenge derivation
//!
//! Verifiers, `state` and `nonce` values are drawn from the unreserved URI
//! character set using the thread-local CSPRNG, so they need no further
//! encoding when placed in a query string.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Unreserved characters from RFC 3986 section 2.3
pub const UNRESERVED_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Length of the PKCE code verifier (RFC 7636 allows 43..=128)
pub const VERIFIER_LENGTH: usize = 100;

/// Length of the `state` and `nonce` values
pub const STATE_LENGTH: usize = 16;

/// The only challenge method this client sends
pub const CHALLENGE_METHOD: &str = "S256";

/// Generate a random string of `length` unreserved characters
///
/// A length of zero yields the empty string.
pub fn random_string(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| UNRESERVED_ALPHABET[rng.random_range(0..UNRESERVED_ALPHABET.len())] as char)
        .collect()
}

/// Generate a fresh code verifier
pub fn generate_verifier() -> String {
    random_string(VERIFIER_LENGTH)
}

/// Derive the S256 code challenge: `BASE64URL(SHA256(verifier))` without padding
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            derive_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_zero_length() {
        assert_eq!(random_string(0), "");
    }

    #[test]
    fn test_verifier_length() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), VERIFIER_LENGTH);
        assert!((43..=128).contains(&verifier.len()));
    }

    #[test]
    fn test_values_differ() {
        // 66^16 possibilities; a collision here means the generator is broken
        assert_ne!(random_string(STATE_LENGTH), random_string(STATE_LENGTH));
    }

    #[test]
    fn test_alphabet_is_unreserved() {
        assert_eq!(UNRESERVED_ALPHABET.len(), 66);
        for &c in UNRESERVED_ALPHABET {
            assert!(c.is_ascii_alphanumeric() || b"-._~".contains(&c));
        }
    }

    proptest! {
        #[test]
        fn prop_random_string_length_and_charset(length in 0usize..256) {
            let value = random_string(length);
            prop_assert_eq!(value.len(), length);
            prop_assert!(value.bytes().all(|b| UNRESERVED_ALPHABET.contains(&b)));
        }

        #[test]
        fn prop_challenge_is_43_url_safe_chars(verifier in "[A-Za-z0-9._~-]{43,128}") {
            let challenge = derive_challenge(&verifier);
            prop_assert_eq!(challenge.len(), 43);
            prop_assert!(!challenge.contains('='));
            prop_assert!(challenge.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
            prop_assert_eq!(derive_challenge(&verifier), challenge);
        }
    }
}
