//! Payment gateways.
//!
//! `PaymentGateway` charges an order. Gateway failures carry the HTTP status
//! and JSON body that the API hands back to the client unchanged.

mod http;
mod test_gateway;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use common::messages;

use crate::errors::ServiceError;

pub use http::HttpGateway;
pub use test_gateway::TestGateway;

#[derive(Clone, Debug, Serialize)]
pub struct ChargeRequest {
    pub order_id: Uuid,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    /// Card or payment-method token supplied by the client.
    pub token: String,
    /// Same key for the same attempt; the gateway must not charge it twice.
    pub idempotency_key: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChargeReceipt {
    pub reference: String,
}

#[derive(Debug, Error)]
#[error("payment failed ({status}): {body}")]
pub struct PaymentError {
    pub status: u16,
    pub body: Value,
}

impl PaymentError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { status, body: json!({ "message": message.into() }) }
    }

    /// Gateway unreachable or timed out.
    pub fn unavailable() -> Self {
        Self::new(502, messages::text("payment_gateway_unavailable"))
    }

    /// Map a vendor error class to the status returned to the client.
    pub fn from_vendor(error_type: &str, body: Value) -> Self {
        Self { status: status_for_error_type(error_type), body }
    }
}

pub fn status_for_error_type(error_type: &str) -> u16 {
    match error_type {
        "card_error" => 402,
        "invalid_request_error" => 400,
        "authentication_error" => 401,
        "rate_limit_error" => 429,
        "api_connection_error" => 502,
        _ => 500,
    }
}

impl From<PaymentError> for ServiceError {
    fn from(e: PaymentError) -> Self {
        ServiceError::Payment { status: e.status, body: e.body }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;
    async fn charge(&self, req: &ChargeRequest) -> Result<ChargeReceipt, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_classes_map_to_statuses() {
        assert_eq!(status_for_error_type("card_error"), 402);
        assert_eq!(status_for_error_type("invalid_request_error"), 400);
        assert_eq!(status_for_error_type("authentication_error"), 401);
        assert_eq!(status_for_error_type("rate_limit_error"), 429);
        assert_eq!(status_for_error_type("api_error"), 500);
    }

    #[test]
    fn converts_into_service_error_with_body() {
        let body = json!({"error": {"type": "card_error", "message": "declined"}});
        let e: ServiceError = PaymentError::from_vendor("card_error", body.clone()).into();
        match e {
            ServiceError::Payment { status, body: b } => {
                assert_eq!(status, 402);
                assert_eq!(b, body);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
