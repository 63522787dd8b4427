use uuid::Uuid;

pub const SESSION_CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a join code such as `K7Q2ZD`.
pub fn generate_session_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    bytes
        .iter()
        .take(SESSION_CODE_LEN)
        .map(|b| CODE_ALPHABET[usize::from(*b) % CODE_ALPHABET.len()] as char)
        .collect()
}

/// Canonical form used for storage and lookup; codes are case-insensitive.
pub fn normalize_session_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
