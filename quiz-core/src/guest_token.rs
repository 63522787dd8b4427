use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A freshly minted guest credential. Only the hash is persisted.
#[derive(Debug, Clone)]
pub struct IssuedGuestToken {
    pub token: String,
    pub hash: String,
}

pub fn issue_guest_token() -> IssuedGuestToken {
    let token = format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    let hash = hash_guest_token(&token);
    IssuedGuestToken { token, hash }
}

pub fn hash_guest_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_distinct() {
        assert_eq!(hash_guest_token("abc"), hash_guest_token("abc"));
        assert_ne!(hash_guest_token("abc"), hash_guest_token("abd"));
        // 32 byte digest -> 43 base64 chars without padding
        assert_eq!(hash_guest_token("abc").len(), 43);
    }

    #[test]
    fn test_issued_tokens_are_unique() {
        let a = issue_guest_token();
        let b = issue_guest_token();
        assert_ne!(a.token, b.token);
        assert_eq!(a.hash, hash_guest_token(&a.token));
    }
}
