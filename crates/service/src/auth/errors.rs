use thiserror::Error;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("no account for this email")]
    UnknownEmail,
    #[error("invalid credentials")]
    Unauthorized,
    #[error("email not confirmed")]
    NotConfirmed,
    #[error("confirmation not found")]
    ConfirmationNotFound,
    #[error("confirmation expired")]
    ConfirmationExpired,
    #[error("already confirmed")]
    AlreadyConfirmed,
    #[error("session expired")]
    SessionExpired,
    #[error("mail error: {0}")]
    Mail(String),
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1001,
            AuthError::Conflict => 1002,
            AuthError::NotFound => 1003,
            AuthError::UnknownEmail => 1011,
            AuthError::Unauthorized => 1004,
            AuthError::NotConfirmed => 1005,
            AuthError::ConfirmationNotFound => 1006,
            AuthError::ConfirmationExpired => 1007,
            AuthError::AlreadyConfirmed => 1008,
            AuthError::SessionExpired => 1009,
            AuthError::Mail(_) => 1010,
            AuthError::HashError(_) => 1101,
            AuthError::TokenError(_) => 1102,
            AuthError::Repository(_) => 1200,
        }
    }
}

impl From<AuthError> for crate::errors::ServiceError {
    fn from(e: AuthError) -> Self {
        use crate::errors::ServiceError as S;
        use common::messages::text;
        match e {
            AuthError::Validation(m) => S::Validation(m),
            AuthError::Conflict => S::conflict("user_already_exists"),
            AuthError::NotFound => S::not_found("user_not_found"),
            AuthError::UnknownEmail => S::Unauthorized(text("user_not_found").into()),
            AuthError::Unauthorized => S::Unauthorized(text("user_invalid_credentials").into()),
            AuthError::NotConfirmed => S::validation("user_not_confirmed"),
            AuthError::ConfirmationNotFound => S::not_found("confirmation_not_found"),
            AuthError::ConfirmationExpired => S::validation("confirmation_expired"),
            AuthError::AlreadyConfirmed => S::conflict("confirmation_already_confirmed"),
            AuthError::SessionExpired => S::SessionExpired(text("session_expired").into()),
            AuthError::Mail(m) => S::Mail(m),
            AuthError::TokenError(_) => S::Unauthorized(text("token_invalid").into()),
            AuthError::HashError(m) | AuthError::Repository(m) => S::Db(m),
        }
    }
}
