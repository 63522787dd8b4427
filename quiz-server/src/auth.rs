use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use quiz_core::Caller;
use quiz_types::UserId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizJwtClaims {
    pub sub: String, // Numeric user id
    pub exp: u64,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub display_name: String,
}

pub struct AuthService {
    decoding_key: Option<DecodingKey>,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: Some(DecodingKey::from_secret(secret.as_bytes())),
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            decoding_key: None,
            dev_mode: true,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let key = self.decoding_key.as_ref().ok_or(AuthError::InvalidToken)?;
        let validation = Validation::new(Algorithm::HS256);

        let token_data = decode::<QuizJwtClaims>(token, key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::warn!("JWT token validation failed: {:?}", e);
                    AuthError::InvalidToken
                }
            }
        })?;

        let claims = token_data.claims;
        let user_id = claims.sub.parse::<UserId>().map_err(|_| {
            tracing::warn!("JWT subject is not a numeric user id: {}", claims.sub);
            AuthError::InvalidSubject
        })?;

        Ok(AuthenticatedUser {
            user_id,
            display_name: claims.name.unwrap_or_else(|| format!("user-{}", user_id)),
        })
    }

    // Dev tokens look like "42:Alice"; the name part is optional.
    fn validate_dev_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let (id, name) = match token.split_once(':') {
            Some((id, name)) => (id, Some(name)),
            None => (token, None),
        };
        let user_id = id.trim().parse::<UserId>().map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthenticatedUser {
            user_id,
            display_name: name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from)
                .unwrap_or_else(|| format!("dev-user-{}", user_id)),
        })
    }

    /// Resolves request headers into a caller. Both headers are optional;
    /// a present but invalid bearer token is an error rather than anonymous.
    pub fn caller_from_headers(
        &self,
        authorization: Option<&str>,
        guest_token: Option<&str>,
    ) -> Result<Caller, AuthError> {
        let user_id = match authorization {
            Some(header) => {
                let token = header
                    .strip_prefix("Bearer ")
                    .ok_or(AuthError::MalformedHeader)?
                    .trim();
                Some(self.validate_token(token)?.user_id)
            }
            None => None,
        };

        let guest_token = guest_token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from);

        Ok(Caller {
            user_id,
            guest_token,
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a user id")]
    InvalidSubject,
    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,
}
