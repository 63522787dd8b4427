use quiz_core::LifecycleError;
use quiz_types::DomainReason;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

const TRANSIENT_MARKERS: &[&str] = &[
    "database is locked",
    "database table is locked",
    "deadlock",
    "could not serialize",
    "lock timeout",
];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("{0}")]
    Domain(DomainReason),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl SessionError {
    pub fn not_found(what: impl Into<String>) -> Self {
        SessionError::NotFound(what.into())
    }

    pub fn reason(&self) -> Option<DomainReason> {
        match self {
            SessionError::Domain(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Lock waits, deadlocks and serialization failures clear up on their own
    /// and are worth another attempt.
    pub fn is_transient(&self) -> bool {
        let SessionError::Database(err) = self else {
            return false;
        };
        let message = err.to_string().to_lowercase();
        TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker))
    }
}

impl From<LifecycleError> for SessionError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotHost => SessionError::Unauthorized(err.to_string()),
            LifecycleError::InvalidTransition { .. } | LifecycleError::NoQuestions => {
                SessionError::InvalidState(err.to_string())
            }
            LifecycleError::NicknameTaken => SessionError::Conflict(err.to_string()),
            LifecycleError::InvalidNickname(message) | LifecycleError::InvalidConfig(message) => {
                SessionError::InvalidInput(message)
            }
            LifecycleError::Domain(reason) => SessionError::Domain(reason),
        }
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
