use quiz_types::UserId;

use crate::hash_guest_token;

/// Identity of whoever triggered an operation: an authenticated user, a
/// guest holding a per-session token, or nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<UserId>,
    pub guest_token: Option<String>,
}

impl Caller {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            guest_token: None,
        }
    }

    pub fn guest(token: impl Into<String>) -> Self {
        Self {
            user_id: None,
            guest_token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_user(&self, user_id: UserId) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn guest_token_hash(&self) -> Option<String> {
        self.guest_token.as_deref().map(hash_guest_token)
    }

    /// Whether this caller is the owner of a participant row with the given
    /// user id and guest token hash.
    pub fn owns(&self, participant_user_id: Option<UserId>, token_hash: Option<&str>) -> bool {
        if let (Some(caller), Some(owner)) = (self.user_id, participant_user_id) {
            return caller == owner;
        }
        match (self.guest_token_hash(), token_hash) {
            (Some(caller_hash), Some(stored)) => caller_hash == stored,
            _ => false,
        }
    }
}
