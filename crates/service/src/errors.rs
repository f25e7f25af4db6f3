use thiserror::Error;

use common::messages;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("session expired: {0}")]
    SessionExpired(String),
    /// Gateway-supplied status and body, passed through to the client.
    #[error("payment error ({status}): {body}")]
    Payment { status: u16, body: serde_json::Value },
    #[error("mail error: {0}")]
    Mail(String),
    #[error("database error: {0}")]
    Db(String),
    #[error("model error: {0}")]
    Model(#[from] models::errors::ModelError),
}

impl From<sea_orm::DbErr> for ServiceError {
    fn from(e: sea_orm::DbErr) -> Self {
        ServiceError::Db(e.to_string())
    }
}

impl ServiceError {
    /// `key` is a message-catalog key, e.g. `cart_not_found`.
    pub fn not_found(key: &str) -> Self { Self::NotFound(messages::text(key).to_string()) }
    pub fn conflict(key: &str) -> Self { Self::Conflict(messages::text(key).to_string()) }
    pub fn validation(key: &str) -> Self { Self::Validation(messages::text(key).to_string()) }
    pub fn forbidden() -> Self { Self::Forbidden(messages::text("forbidden").to_string()) }

    /// Message safe to show to API clients.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Validation(m)
            | ServiceError::NotFound(m)
            | ServiceError::Conflict(m)
            | ServiceError::Unauthorized(m)
            | ServiceError::Forbidden(m)
            | ServiceError::SessionExpired(m)
            | ServiceError::Mail(m) => m.clone(),
            ServiceError::Model(models::errors::ModelError::Validation(m)) => m.clone(),
            ServiceError::Payment { body, .. } => body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_else(|| messages::text("payment_gateway_unavailable"))
                .to_string(),
            ServiceError::Db(_) | ServiceError::Model(_) => messages::text("internal_server_error").to_string(),
        }
    }
}
