//! Content hashing for repeatable scripts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// SHA-256 over the UTF-8 bytes of `content`, base64 encoded (standard alphabet, padded).
pub fn content_hash(content: &str) -> String {
    STANDARD.encode(Sha256::digest(content.as_bytes()))
}

/// Compare a recorded hash with a freshly computed one.
///
/// ASCII case-insensitive. Two absent hashes are equal; one absent hash never
/// matches a present one.
pub fn hashes_match(recorded: Option<&str>, current: Option<&str>) -> bool {
    match (recorded, current) {
        (None, None) => true,
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_of_empty_string() {
        assert_eq!(
            content_hash(""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_hash_is_padded_standard_base64() {
        let hash = content_hash("select 1;");
        assert_eq!(hash.len(), 44);
        assert!(hash.ends_with('='));
        assert!(!hash.contains('-') && !hash.contains('_'));
    }

    #[test]
    fn test_hash_differs_per_content() {
        assert_ne!(content_hash("v1"), content_hash("v2"));
        assert_eq!(content_hash("v1"), content_hash("v1"));
    }

    #[test]
    fn test_hashes_match_ignores_ascii_case() {
        let h = content_hash("v1");
        assert!(hashes_match(Some(&h), Some(&h.to_ascii_lowercase())));
        assert!(hashes_match(None, None));
        assert!(!hashes_match(Some(&h), None));
        assert!(!hashes_match(None, Some(&h)));
        assert!(!hashes_match(Some(&h), Some(&content_hash("v2"))));
    }
}
