//! Key hashing
//!
//! External keys are arbitrary strings. On disk every entry is named by the
//! hex-encoded SHA-256 of its external key, which is always a valid
//! journal key and a valid file name.

use sha2::{Digest, Sha256};

/// Longest key accepted in a journal record
pub const MAX_KEY_LEN: usize = 120;

/// Map an external key to its internal, filesystem-safe form
pub fn internal_key(external: &str) -> String {
    let digest = Sha256::digest(external.as_bytes());
    hex::encode(digest)
}

/// Byte allowed in an internal key (`[a-z0-9_-]`)
pub(crate) fn is_key_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-'
}

/// Check that a journal key is well-formed
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_LEN && key.bytes().all(is_key_byte)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_key_is_deterministic() {
        assert_eq!(internal_key("user:42"), internal_key("user:42"));
        assert_ne!(internal_key("user:42"), internal_key("user:43"));
    }

    #[test]
    fn test_internal_key_shape() {
        let key = internal_key("Ünïcødé key / with spaces");
        assert_eq!(key.len(), 64);
        assert!(is_valid_key(&key));
    }

    #[test]
    fn test_internal_key_known_digest() {
        assert_eq!(
            internal_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("abc_123-x"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("Upper"));
        assert!(!is_valid_key("has space"));
        assert!(!is_valid_key(&"a".repeat(MAX_KEY_LEN + 1)));
    }
}
