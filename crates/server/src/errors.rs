use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};
use validator::Validate;

use common::messages;
use models::errors::ModelError;
use service::errors::ServiceError;

/// Error body returned by every handler: `{"error": <title>, "message": <detail>}`.
#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: String,
    /// Replaces the default body; used for payment gateway errors.
    pub body: Option<Value>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let error = status.canonical_reason().unwrap_or("Error").to_string();
        Self { status, error, message: message.into(), body: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, message) }

    pub fn unauthorized(key: &str) -> Self { Self::new(StatusCode::UNAUTHORIZED, messages::text(key)) }

    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, messages::text("rate_limit_exceeded"))
    }
}

/// 440 is not a registered status code; it signals an expired login session.
pub fn session_expired_status() -> StatusCode {
    StatusCode::from_u16(440).unwrap_or(StatusCode::UNAUTHORIZED)
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        let message = e.public_message();
        match e {
            ServiceError::Validation(_) | ServiceError::Model(ModelError::Validation(_)) => {
                Self::new(StatusCode::BAD_REQUEST, message)
            }
            ServiceError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, message),
            ServiceError::Conflict(_) => Self::new(StatusCode::CONFLICT, message),
            ServiceError::Unauthorized(_) => Self::new(StatusCode::UNAUTHORIZED, message),
            ServiceError::Forbidden(_) => Self::new(StatusCode::FORBIDDEN, message),
            ServiceError::SessionExpired(_) => Self::new(session_expired_status(), message),
            ServiceError::Payment { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                warn!(%status, %body, "payment gateway error");
                let mut err = Self::new(status, message);
                err.body = Some(body);
                err
            }
            ServiceError::Mail(ref detail) => {
                error!(error = %detail, "mail delivery failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ServiceError::Db(ref detail) => {
                error!(error = %detail, "database error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            ServiceError::Model(ref detail) => {
                error!(error = %detail, "model error");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl From<service::auth::errors::AuthError> for JsonApiError {
    fn from(e: service::auth::errors::AuthError) -> Self {
        ServiceError::from(e).into()
    }
}

impl From<JsonRejection> for JsonApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        Self::bad_request(format!("{} {}", messages::text("invalid_request"), rejection.body_text()))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        let body = self.body.unwrap_or_else(|| json!({"error": self.error, "message": self.message}));
        (self.status, Json(body)).into_response()
    }
}

/// JSON body whose parse failures answer 400 instead of axum's 415/422.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = JsonApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// `JsonBody` plus `validator` field rules.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = JsonApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate().map_err(|e| JsonApiError::bad_request(e.to_string()))?;
        Ok(Self(value))
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_service_errors_to_status() {
        let cases = [
            (ServiceError::not_found("cart_not_found"), StatusCode::NOT_FOUND),
            (ServiceError::conflict("coupon_already_exists"), StatusCode::CONFLICT),
            (ServiceError::validation("cart_empty"), StatusCode::BAD_REQUEST),
            (ServiceError::Model(ModelError::Validation("bad phone".into())), StatusCode::BAD_REQUEST),
            (ServiceError::forbidden(), StatusCode::FORBIDDEN),
            (ServiceError::Db("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(JsonApiError::from(err).status, status);
        }
    }

    #[test]
    fn session_expired_is_440() {
        let err = JsonApiError::from(ServiceError::SessionExpired("gone".into()));
        assert_eq!(err.status.as_u16(), 440);
    }

    #[test]
    fn payment_body_passes_through() {
        let body = json!({"error": {"type": "card_error"}, "message": "Your card was declined."});
        let err = JsonApiError::from(ServiceError::Payment { status: 402, body: body.clone() });
        assert_eq!(err.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.body, Some(body));
    }
}
